use super::geometry::Rect;

/// Edge slack for the strict fullscreen test. Covers off-by-a-pixel
/// window rects some drivers report for true fullscreen surfaces.
const STRICT_EDGE_TOLERANCE: i32 = 2;
/// Edge slack for the loose test that catches borderless-windowed modes.
const LOOSE_EDGE_TOLERANCE: i32 = 16;
/// Fraction of the monitor a loosely-matching window must cover.
const MIN_FULLSCREEN_COVERAGE: f64 = 0.97;

/// Whether `window` occupies essentially the whole of `monitor`.
///
/// A window passing the strict edge test is fullscreen outright. One that
/// only passes the loose test must additionally cover at least 97% of the
/// monitor area, so small tool windows hugging a corner are not promoted.
pub fn is_fullscreen(window: Rect, monitor: Rect) -> bool {
    if window.is_empty() || monitor.is_empty() {
        return false;
    }

    if edges_within(window, monitor, STRICT_EDGE_TOLERANCE) {
        return true;
    }
    if !edges_within(window, monitor, LOOSE_EDGE_TOLERANCE) {
        return false;
    }

    let monitor_area = i64::from(monitor.width) * i64::from(monitor.height);
    let visible_area = intersection_area(window, monitor);
    monitor_area > 0 && visible_area as f64 >= monitor_area as f64 * MIN_FULLSCREEN_COVERAGE
}

fn edges_within(window: Rect, monitor: Rect, tolerance: i32) -> bool {
    window.left() <= monitor.left() + tolerance
        && window.top() <= monitor.top() + tolerance
        && window.right() >= monitor.right() - tolerance
        && window.bottom() >= monitor.bottom() - tolerance
}

fn intersection_area(a: Rect, b: Rect) -> i64 {
    let left = a.left().max(b.left());
    let top = a.top().max(b.top());
    let right = a.right().min(b.right());
    let bottom = a.bottom().min(b.bottom());
    let width = i64::from((right - left).max(0));
    let height = i64::from((bottom - top).max(0));
    width * height
}

/// Shell windows that host the desktop wallpaper. The overlay stays
/// visible when one of these takes the foreground.
pub fn is_desktop_class(class_name: &str) -> bool {
    class_name.eq_ignore_ascii_case("Progman") || class_name.eq_ignore_ascii_case("WorkerW")
}
