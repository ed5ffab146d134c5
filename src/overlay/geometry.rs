use crate::settings::PositionPreset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_point_size(position: Point, size: Size) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Corner placement of the overlay inside `bounds`, offset by the edge
/// paddings.
pub fn preset_position(
    preset: PositionPreset,
    overlay: Size,
    bounds: Rect,
    horizontal_padding: i32,
    vertical_padding: i32,
) -> Point {
    match preset {
        PositionPreset::TopLeft => Point::new(
            bounds.left() + horizontal_padding,
            bounds.top() + vertical_padding,
        ),
        PositionPreset::BottomRight => Point::new(
            bounds.right() - overlay.width - horizontal_padding,
            bounds.bottom() - overlay.height - vertical_padding,
        ),
        PositionPreset::BottomLeft => Point::new(
            bounds.left() + horizontal_padding,
            bounds.bottom() - overlay.height - vertical_padding,
        ),
        PositionPreset::TopRight => Point::new(
            bounds.right() - overlay.width - horizontal_padding,
            bounds.top() + vertical_padding,
        ),
    }
}

/// Clamp the overlay's top-left corner so the whole window stays inside
/// `bounds`. When the overlay is larger than the bounds the right/bottom
/// edge wins, matching the order of the min/max below.
pub fn clamp_to_bounds(position: Point, overlay: Size, bounds: Rect) -> Point {
    let max_left = bounds.right() - overlay.width;
    let max_top = bounds.bottom() - overlay.height;
    Point::new(
        position.x.max(bounds.left()).min(max_left),
        position.y.max(bounds.top()).min(max_top),
    )
}

/// Monitor arrangement as the overlay sees it. The production
/// implementation queries the OS; tests substitute a fixed layout.
pub trait MonitorLayout {
    fn primary(&self) -> Rect;
    /// Bounds of the monitor nearest to `rect`.
    fn containing(&self, rect: Rect) -> Rect;
}

#[cfg(windows)]
pub use platform::WindowsMonitors;

#[cfg(windows)]
pub(crate) mod platform {
    use super::{MonitorLayout, Rect};
    use windows::Win32::Foundation::{POINT, RECT};
    use windows::Win32::Graphics::Gdi::{
        GetMonitorInfoW, MonitorFromPoint, MonitorFromRect, MONITORINFO,
        MONITOR_DEFAULTTONEAREST, MONITOR_DEFAULTTOPRIMARY,
    };

    pub(crate) fn rect_from_win32(rect: RECT) -> Rect {
        Rect::new(
            rect.left,
            rect.top,
            rect.right - rect.left,
            rect.bottom - rect.top,
        )
    }

    pub(crate) fn rect_to_win32(rect: Rect) -> RECT {
        RECT {
            left: rect.left(),
            top: rect.top(),
            right: rect.right(),
            bottom: rect.bottom(),
        }
    }

    fn monitor_bounds(monitor: windows::Win32::Graphics::Gdi::HMONITOR) -> Rect {
        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
            rect_from_win32(info.rcMonitor)
        } else {
            Rect::EMPTY
        }
    }

    /// Live monitor arrangement backed by the Win32 monitor APIs.
    #[derive(Debug, Default)]
    pub struct WindowsMonitors;

    impl MonitorLayout for WindowsMonitors {
        fn primary(&self) -> Rect {
            let monitor =
                unsafe { MonitorFromPoint(POINT { x: 0, y: 0 }, MONITOR_DEFAULTTOPRIMARY) };
            monitor_bounds(monitor)
        }

        fn containing(&self, rect: Rect) -> Rect {
            let win32 = rect_to_win32(rect);
            let monitor = unsafe { MonitorFromRect(&win32, MONITOR_DEFAULTTONEAREST) };
            monitor_bounds(monitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PositionPreset;

    #[test]
    fn preset_positions_hit_all_four_corners() {
        let bounds = Rect::new(0, 0, 1920, 1080);
        let overlay = Size::new(100, 40);

        assert_eq!(
            preset_position(PositionPreset::TopLeft, overlay, bounds, 20, 10),
            Point::new(20, 10)
        );
        assert_eq!(
            preset_position(PositionPreset::TopRight, overlay, bounds, 20, 10),
            Point::new(1800, 10)
        );
        assert_eq!(
            preset_position(PositionPreset::BottomLeft, overlay, bounds, 20, 10),
            Point::new(20, 1030)
        );
        assert_eq!(
            preset_position(PositionPreset::BottomRight, overlay, bounds, 20, 10),
            Point::new(1800, 1030)
        );
    }

    #[test]
    fn preset_respects_monitor_origin_offset() {
        let bounds = Rect::new(-1920, 200, 1920, 1080);
        let overlay = Size::new(100, 40);
        assert_eq!(
            preset_position(PositionPreset::TopRight, overlay, bounds, 20, 20),
            Point::new(-120, 220)
        );
    }

    #[test]
    fn clamp_keeps_overlay_inside_bounds() {
        let bounds = Rect::new(0, 0, 800, 600);
        let overlay = Size::new(100, 40);
        assert_eq!(
            clamp_to_bounds(Point::new(-50, -50), overlay, bounds),
            Point::new(0, 0)
        );
        assert_eq!(
            clamp_to_bounds(Point::new(790, 590), overlay, bounds),
            Point::new(700, 560)
        );
        assert_eq!(
            clamp_to_bounds(Point::new(350, 280), overlay, bounds),
            Point::new(350, 280)
        );
    }

    #[test]
    fn oversized_overlay_pins_to_right_bottom_edge() {
        let bounds = Rect::new(0, 0, 80, 60);
        let overlay = Size::new(100, 90);
        assert_eq!(
            clamp_to_bounds(Point::new(0, 0), overlay, bounds),
            Point::new(-20, -30)
        );
    }

    #[test]
    fn contains_excludes_right_and_bottom_edges() {
        let rect = Rect::new(10, 10, 20, 20);
        assert!(rect.contains(Point::new(10, 10)));
        assert!(rect.contains(Point::new(29, 29)));
        assert!(!rect.contains(Point::new(30, 10)));
        assert!(!rect.contains(Point::new(10, 30)));
    }
}
