use super::geometry::{Point, Rect};

/// Side length of the square close-button window.
pub const CLOSE_BUTTON_SIZE: i32 = 14;
/// Gap between the overlay edge and the button.
pub const CLOSE_BUTTON_GAP: i32 = 5;

/// Pick where the close button sits relative to the overlay.
///
/// Six candidates are tried in order: above-right, above-left, then the
/// four corners ordered by which side of the screen the overlay leans
/// toward, so the button lands between the overlay and screen center
/// where it has room. The first candidate fully inside `screen` wins;
/// when none fits the first candidate is clamped into the screen.
pub fn place_close_button(overlay: Rect, screen: Rect) -> Rect {
    let prefer_right = overlay.center().x >= screen.center().x;
    let prefer_top = overlay.center().y < screen.center().y;

    let build = |top: bool, right: bool| -> Rect {
        let x = if right {
            overlay.right() + CLOSE_BUTTON_GAP
        } else {
            overlay.left() - CLOSE_BUTTON_SIZE - CLOSE_BUTTON_GAP
        };
        let y = if top {
            overlay.top() - CLOSE_BUTTON_SIZE - CLOSE_BUTTON_GAP
        } else {
            overlay.bottom() + CLOSE_BUTTON_GAP
        };
        Rect::new(x, y, CLOSE_BUTTON_SIZE, CLOSE_BUTTON_SIZE)
    };

    let candidates = [
        build(true, true),
        build(true, false),
        build(prefer_top, prefer_right),
        build(prefer_top, !prefer_right),
        build(!prefer_top, prefer_right),
        build(!prefer_top, !prefer_right),
    ];

    for candidate in &candidates {
        if screen.contains_rect(candidate) {
            return *candidate;
        }
    }

    let fallback = candidates[0];
    let clamped = Point::new(
        fallback
            .left()
            .max(screen.left())
            .min(screen.right() - CLOSE_BUTTON_SIZE),
        fallback
            .top()
            .max(screen.top())
            .min(screen.bottom() - CLOSE_BUTTON_SIZE),
    );
    Rect::new(clamped.x, clamped.y, CLOSE_BUTTON_SIZE, CLOSE_BUTTON_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };

    #[test]
    fn top_right_overlay_gets_above_right_button() {
        let overlay = Rect::new(1700, 40, 120, 50);
        let button = place_close_button(overlay, SCREEN);
        assert_eq!(
            button,
            Rect::new(
                overlay.right() + CLOSE_BUTTON_GAP,
                overlay.top() - CLOSE_BUTTON_SIZE - CLOSE_BUTTON_GAP,
                CLOSE_BUTTON_SIZE,
                CLOSE_BUTTON_SIZE
            )
        );
        assert!(SCREEN.contains_rect(&button));
    }

    #[test]
    fn overlay_hugging_top_right_corner_falls_through_to_below_left() {
        let overlay = Rect::new(1820, 0, 100, 40);
        let button = place_close_button(overlay, SCREEN);
        assert_eq!(
            button,
            Rect::new(
                overlay.left() - CLOSE_BUTTON_SIZE - CLOSE_BUTTON_GAP,
                overlay.bottom() + CLOSE_BUTTON_GAP,
                CLOSE_BUTTON_SIZE,
                CLOSE_BUTTON_SIZE
            )
        );
        assert!(SCREEN.contains_rect(&button));
    }

    #[test]
    fn above_left_is_second_choice() {
        // Overlay flush with the right edge but below the top band, so
        // above-right overflows while above-left fits.
        let overlay = Rect::new(1820, 100, 100, 40);
        let button = place_close_button(overlay, SCREEN);
        assert_eq!(
            button,
            Rect::new(
                overlay.left() - CLOSE_BUTTON_SIZE - CLOSE_BUTTON_GAP,
                overlay.top() - CLOSE_BUTTON_SIZE - CLOSE_BUTTON_GAP,
                CLOSE_BUTTON_SIZE,
                CLOSE_BUTTON_SIZE
            )
        );
    }

    #[test]
    fn screen_filling_overlay_clamps_first_candidate() {
        let button = place_close_button(SCREEN, SCREEN);
        assert_eq!(
            button,
            Rect::new(
                SCREEN.right() - CLOSE_BUTTON_SIZE,
                SCREEN.top(),
                CLOSE_BUTTON_SIZE,
                CLOSE_BUTTON_SIZE
            )
        );
        assert!(SCREEN.contains_rect(&button));
    }

    #[test]
    fn placement_respects_monitor_origin_offset() {
        let screen = Rect::new(-1920, 0, 1920, 1080);
        let overlay = Rect::new(-200, 40, 120, 50);
        let button = place_close_button(overlay, screen);
        assert!(screen.contains_rect(&button));
    }
}
