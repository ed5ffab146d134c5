use std::cell::RefCell;
use std::rc::Rc;

use tempfile::tempdir;

use temp_hud::overlay::compositor::{BlockGlyphRasterizer, FrameBuffer};
use temp_hud::overlay::context::{ForegroundProbe, ProbedWindow};
use temp_hud::overlay::controller::{ControllerEvent, OverlayController};
use temp_hud::overlay::geometry::{MonitorLayout, Point, Rect};
use temp_hud::overlay::identity::build_identity;
use temp_hud::overlay::interaction::{AWAY_LOCK_DELAY_MS, HOVER_UNLOCK_DELAY_MS};
use temp_hud::overlay::window::{OverlayView, PointerEvent, SatelliteView};
use temp_hud::sensors::TemperatureSnapshot;
use temp_hud::settings::{OverlaySettings, OverlayTheme, PositionPreset};

const MONITOR: Rect = Rect {
    x: 0,
    y: 0,
    width: 1920,
    height: 1080,
};

// Block-rasterized overlay dimensions at the default medium font: two
// value lines over a 12-character template column.
const OVERLAY_W: i32 = 98;
const OVERLAY_H: i32 = 46;

const GAME_KEY: &str = "C:\\Games\\rocket.exe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverlayEvent {
    Frame { rect: Rect, hit_filled: bool },
    MovedTo(Point),
    InputTransparent(bool),
    Shown,
    Hidden,
    Topmost,
    MoveCursor(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SatelliteEvent {
    ShownAt(Rect),
    Hidden,
    Topmost,
}

type OverlayLog = Rc<RefCell<Vec<OverlayEvent>>>;
type SatelliteLog = Rc<RefCell<Vec<SatelliteEvent>>>;

struct RecordingOverlay {
    log: OverlayLog,
}

impl OverlayView for RecordingOverlay {
    fn set_frame(&mut self, frame: &FrameBuffer, rect: Rect) {
        // The corner pixel carries the drag-hit fill while interactive.
        let hit_filled = frame.pixel(0, 0) != 0;
        self.log
            .borrow_mut()
            .push(OverlayEvent::Frame { rect, hit_filled });
    }

    fn move_to(&mut self, position: Point) {
        self.log.borrow_mut().push(OverlayEvent::MovedTo(position));
    }

    fn set_input_transparent(&mut self, transparent: bool) {
        self.log
            .borrow_mut()
            .push(OverlayEvent::InputTransparent(transparent));
    }

    fn show(&mut self) {
        self.log.borrow_mut().push(OverlayEvent::Shown);
    }

    fn hide(&mut self) {
        self.log.borrow_mut().push(OverlayEvent::Hidden);
    }

    fn ensure_topmost(&mut self) {
        self.log.borrow_mut().push(OverlayEvent::Topmost);
    }

    fn set_move_cursor(&mut self, enabled: bool) {
        self.log.borrow_mut().push(OverlayEvent::MoveCursor(enabled));
    }

    fn drain_pointer_events(&mut self) -> Vec<PointerEvent> {
        Vec::new()
    }
}

struct RecordingSatellite {
    log: SatelliteLog,
}

impl SatelliteView for RecordingSatellite {
    fn show_at(&mut self, rect: Rect) {
        self.log.borrow_mut().push(SatelliteEvent::ShownAt(rect));
    }

    fn hide(&mut self) {
        self.log.borrow_mut().push(SatelliteEvent::Hidden);
    }

    fn ensure_topmost(&mut self) {
        self.log.borrow_mut().push(SatelliteEvent::Topmost);
    }

    fn take_clicked(&mut self) -> bool {
        false
    }
}

struct FixedMonitors;

impl MonitorLayout for FixedMonitors {
    fn primary(&self) -> Rect {
        MONITOR
    }

    fn containing(&self, _rect: Rect) -> Rect {
        MONITOR
    }
}

type TestController = OverlayController<RecordingOverlay, RecordingSatellite, BlockGlyphRasterizer>;

fn controller_with(
    settings: OverlaySettings,
    path: Option<String>,
) -> (TestController, OverlayLog, SatelliteLog) {
    let log = OverlayLog::default();
    let sat_log = SatelliteLog::default();
    let controller = OverlayController::new(
        settings,
        path,
        RecordingOverlay { log: log.clone() },
        RecordingSatellite {
            log: sat_log.clone(),
        },
        Box::new(FixedMonitors),
        BlockGlyphRasterizer,
    );
    (controller, log, sat_log)
}

fn controller() -> (TestController, OverlayLog, SatelliteLog) {
    controller_with(OverlaySettings::default(), None)
}

fn snapshot() -> TemperatureSnapshot {
    TemperatureSnapshot {
        cpu: Some(55.5),
        gpu: Some(61.0),
        error: None,
    }
}

fn probe(key: &str, pid: u32, window_rect: Rect, class_name: &str) -> ForegroundProbe {
    ForegroundProbe::of(ProbedWindow {
        window_rect,
        monitor_rect: MONITOR,
        class_name: class_name.into(),
        identity: build_identity(Some(key), None, pid, 700),
    })
}

fn game(pid: u32) -> ForegroundProbe {
    probe(GAME_KEY, pid, MONITOR, "GameWindow")
}

fn windowed() -> ForegroundProbe {
    probe("C:\\apps\\editor.exe", 3, Rect::new(100, 100, 800, 600), "EditorFrame")
}

fn desktop() -> ForegroundProbe {
    probe(
        "C:\\Windows\\explorer.exe",
        4,
        Rect::new(0, 0, 1920, 1040),
        "Progman",
    )
}

fn far_away() -> Point {
    Point::new(400, 700)
}

fn last_frame(log: &OverlayLog) -> (Rect, bool) {
    log.borrow()
        .iter()
        .rev()
        .find_map(|event| match event {
            OverlayEvent::Frame { rect, hit_filled } => Some((*rect, *hit_filled)),
            _ => None,
        })
        .expect("no frame was pushed")
}

fn saw(log: &OverlayLog, needle: OverlayEvent) -> bool {
    log.borrow().contains(&needle)
}

fn sat_saw(log: &SatelliteLog, needle: SatelliteEvent) -> bool {
    log.borrow().contains(&needle)
}

/// Dwell over the overlay until it unlocks, the way the poll loop would.
fn unlock(controller: &mut TestController, probe: &ForegroundProbe, start_ms: u64) -> u64 {
    let inside = Point::new(controller.position().x + 1, controller.position().y + 1);
    controller.on_interaction_tick(start_ms, probe, inside, false);
    let unlocked_at = start_ms + HOVER_UNLOCK_DELAY_MS;
    controller.on_interaction_tick(unlocked_at, probe, inside, false);
    assert!(controller.is_interactive());
    unlocked_at
}

#[test]
fn startup_places_the_overlay_at_the_preset_corner() {
    let (mut controller, log, _sat) = controller();
    controller.startup(&desktop(), &snapshot());

    assert!(controller.is_visible());
    assert!(saw(&log, OverlayEvent::Shown));
    assert!(saw(&log, OverlayEvent::Topmost));

    // Default preset is top-right with 20 px edge paddings.
    let (rect, hit_filled) = last_frame(&log);
    assert_eq!(rect, Rect::new(1920 - OVERLAY_W - 20, 20, OVERLAY_W, OVERLAY_H));
    assert!(!hit_filled);
}

#[test]
fn ordinary_window_hides_and_desktop_restores() {
    let (mut controller, log, sat) = controller();
    controller.startup(&desktop(), &snapshot());
    assert!(controller.is_visible());

    controller.on_interaction_tick(40, &windowed(), far_away(), false);
    assert!(!controller.is_visible());
    assert!(saw(&log, OverlayEvent::Hidden));
    assert!(sat_saw(&sat, SatelliteEvent::Hidden));

    controller.on_interaction_tick(80, &desktop(), far_away(), false);
    assert!(controller.is_visible());
}

#[test]
fn close_button_stays_hidden_while_click_through() {
    let (mut controller, _log, sat) = controller();
    controller.startup(&game(10), &snapshot());

    assert!(controller.is_visible());
    assert!(!controller.is_interactive());
    let shown = sat
        .borrow()
        .iter()
        .any(|event| matches!(event, SatelliteEvent::ShownAt(_)));
    assert!(!shown);
}

#[test]
fn hover_unlock_enables_input_and_places_the_close_button() {
    let (mut controller, log, sat) = controller();
    controller.startup(&game(10), &snapshot());

    unlock(&mut controller, &game(10), 40);

    assert!(saw(&log, OverlayEvent::InputTransparent(false)));
    assert!(saw(&log, OverlayEvent::MoveCursor(true)));
    let (_, hit_filled) = last_frame(&log);
    assert!(hit_filled);

    // Overlay sits at (1802, 20): the button lands above-right of it.
    assert!(sat_saw(&sat, SatelliteEvent::ShownAt(Rect::new(1905, 1, 14, 14))));
}

#[test]
fn away_dwell_locks_the_overlay_again() {
    let (mut controller, log, sat) = controller();
    controller.startup(&game(10), &snapshot());
    let unlocked_at = unlock(&mut controller, &game(10), 40);

    let away_start = unlocked_at + 40;
    controller.on_interaction_tick(away_start, &game(10), far_away(), false);
    controller.on_interaction_tick(
        away_start + AWAY_LOCK_DELAY_MS - 1,
        &game(10),
        far_away(),
        false,
    );
    assert!(controller.is_interactive());

    controller.on_interaction_tick(away_start + AWAY_LOCK_DELAY_MS, &game(10), far_away(), false);
    assert!(!controller.is_interactive());
    assert!(saw(&log, OverlayEvent::InputTransparent(true)));
    assert!(saw(&log, OverlayEvent::MoveCursor(false)));
    let (_, hit_filled) = last_frame(&log);
    assert!(!hit_filled);
    assert!(sat_saw(&sat, SatelliteEvent::Hidden));
}

#[test]
fn drag_moves_clamps_and_saves_the_position() {
    let (mut controller, log, _sat) = controller();
    controller.startup(&game(10), &snapshot());
    unlock(&mut controller, &game(10), 40);
    let origin = controller.position();
    assert_eq!(origin, Point::new(1802, 20));

    controller.on_pointer(PointerEvent::LeftDown {
        cursor: Point::new(origin.x + 3, origin.y + 4),
    });

    controller.on_pointer(PointerEvent::Move {
        cursor: Point::new(905, 524),
    });
    assert_eq!(controller.position(), Point::new(902, 520));
    assert!(saw(&log, OverlayEvent::MovedTo(Point::new(902, 520))));

    // Past the top-left corner: the window pins to the monitor edge.
    controller.on_pointer(PointerEvent::Move {
        cursor: Point::new(1, 2),
    });
    assert_eq!(controller.position(), Point::new(0, 0));

    // Past the bottom-right corner: pinned fully inside again.
    controller.on_pointer(PointerEvent::Move {
        cursor: Point::new(5000, 2000),
    });
    let pinned = Point::new(1920 - OVERLAY_W, 1080 - OVERLAY_H);
    assert_eq!(controller.position(), pinned);

    controller.on_pointer(PointerEvent::LeftUp {
        cursor: Point::new(5000, 2000),
    });
    assert_eq!(
        controller.settings().fullscreen_app_positions.get(GAME_KEY),
        Some(&(pinned.x, pinned.y))
    );
}

#[test]
fn saved_position_is_restored_and_clamped() {
    let mut settings = OverlaySettings::default();
    settings
        .fullscreen_app_positions
        .insert(GAME_KEY.to_string(), (333, 222));
    let (mut controller, _log, _sat) = controller_with(settings, None);
    controller.startup(&game(10), &snapshot());
    assert_eq!(controller.position(), Point::new(333, 222));

    let mut settings = OverlaySettings::default();
    settings
        .fullscreen_app_positions
        .insert(GAME_KEY.to_string(), (5000, -50));
    let (mut controller, _log, _sat) = controller_with(settings, None);
    controller.startup(&game(10), &snapshot());
    assert_eq!(controller.position(), Point::new(1920 - OVERLAY_W, 0));
}

#[test]
fn close_click_dismisses_until_the_app_relaunches() {
    let (mut controller, log, _sat) = controller();
    controller.startup(&game(10), &snapshot());

    controller.on_close_clicked();
    assert!(!controller.is_visible());
    assert!(saw(&log, OverlayEvent::Hidden));

    // Same instance stays dismissed.
    controller.on_interaction_tick(40, &game(10), far_away(), false);
    assert!(!controller.is_visible());

    // A new pid is a new instance: the overlay returns.
    controller.on_interaction_tick(80, &game(11), far_away(), false);
    assert!(controller.is_visible());
}

#[test]
fn foreground_event_hides_then_settle_reveals() {
    let (mut controller, _log, _sat) = controller();
    controller.startup(&desktop(), &snapshot());

    controller.on_foreground_event(1_000, &windowed());
    assert!(!controller.is_visible());
    assert!(controller.settle_probe_running());

    // The new app reaches fullscreen while the probe is still live.
    controller.on_settle_tick(1_016, &game(10));
    assert!(controller.is_visible());
    assert!(controller.settle_probe_running());

    // Past the probe window the probe retires itself.
    controller.on_settle_tick(1_916, &game(10));
    assert!(!controller.settle_probe_running());
}

#[test]
fn foreground_event_during_a_drag_leaves_the_overlay_alone() {
    let (mut controller, log, _sat) = controller();
    controller.startup(&game(10), &snapshot());
    unlock(&mut controller, &game(10), 40);
    let origin = controller.position();
    controller.on_pointer(PointerEvent::LeftDown {
        cursor: Point::new(origin.x + 1, origin.y + 1),
    });

    controller.on_foreground_event(5_000, &game(10));
    assert!(controller.is_visible());
    assert!(controller.is_interactive());
    assert!(!saw(&log, OverlayEvent::Hidden));
}

#[test]
fn context_switch_drops_interactive_mode() {
    let (mut controller, log, _sat) = controller();
    controller.startup(&game(10), &snapshot());
    unlock(&mut controller, &game(10), 40);

    controller.on_interaction_tick(3_000, &game(20), far_away(), false);
    assert!(!controller.is_interactive());
    assert!(saw(&log, OverlayEvent::InputTransparent(true)));
    assert!(controller.is_visible());
}

#[test]
fn sensor_tick_keeps_the_anchor_while_interactive() {
    let (mut controller, log, _sat) = controller();
    controller.startup(&game(10), &snapshot());
    unlock(&mut controller, &game(10), 40);
    let origin = controller.position();
    controller.on_pointer(PointerEvent::LeftDown {
        cursor: Point::new(origin.x + 3, origin.y + 4),
    });
    controller.on_pointer(PointerEvent::Move {
        cursor: Point::new(905, 524),
    });
    controller.on_pointer(PointerEvent::LeftUp {
        cursor: Point::new(905, 524),
    });
    assert_eq!(controller.position(), Point::new(902, 520));

    controller.on_sensor_tick(&game(10), &snapshot());
    assert_eq!(controller.position(), Point::new(902, 520));

    // A sensor fault swaps both lines for one status line; the window
    // resizes in place instead of snapping back to the preset corner.
    let failed = TemperatureSnapshot {
        cpu: None,
        gpu: None,
        error: Some("sensor bus unavailable".into()),
    };
    controller.on_sensor_tick(&game(10), &failed);
    assert_eq!(controller.position(), Point::new(902, 520));
    let (rect, _) = last_frame(&log);
    assert_eq!(rect, Rect::new(902, 520, 118, 18));
}

#[test]
fn preview_pins_the_overlay_visible_and_uses_presets() {
    let mut settings = OverlaySettings::default();
    settings
        .fullscreen_app_positions
        .insert(GAME_KEY.to_string(), (333, 222));
    let original = settings.clone();
    let (mut controller, log, _sat) = controller_with(settings, None);
    controller.startup(&game(10), &snapshot());
    assert_eq!(controller.position(), Point::new(333, 222));

    controller.on_event(ControllerEvent::OpenSettingsRequested);
    assert!(controller.is_visible());

    // Hide logic and the hook are both suspended for the session.
    controller.on_interaction_tick(4_000, &windowed(), far_away(), false);
    assert!(controller.is_visible());
    controller.on_foreground_event(5_000, &windowed());
    assert!(!controller.settle_probe_running());
    assert!(!saw(&log, OverlayEvent::Hidden));

    // Transient settings place by preset, ignoring the saved position.
    let mut preview = original.clone();
    preview.position = PositionPreset::TopLeft;
    controller.on_event(ControllerEvent::SettingsPreviewed(preview));
    assert_eq!(controller.position(), Point::new(20, 20));

    // Cancelling restores the snapshot and the saved placement.
    controller.on_event(ControllerEvent::PreviewEnded {
        restore: Some(original.clone()),
    });
    assert_eq!(controller.settings().position, original.position);
    assert_eq!(controller.position(), Point::new(333, 222));
}

#[test]
fn applied_settings_persist_and_move_the_overlay() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let path_str = path.to_string_lossy().into_owned();

    let (mut controller, log, _sat) =
        controller_with(OverlaySettings::default(), Some(path_str.clone()));
    controller.startup(&desktop(), &snapshot());

    let mut updated = OverlaySettings::default();
    updated.position = PositionPreset::BottomLeft;
    updated.theme = OverlayTheme::Ember;
    controller.on_event(ControllerEvent::SettingsApplied(updated));

    let reloaded = OverlaySettings::load(&path_str);
    assert_eq!(reloaded.position, PositionPreset::BottomLeft);
    assert_eq!(reloaded.theme, OverlayTheme::Ember);

    let (rect, _) = last_frame(&log);
    assert_eq!(rect, Rect::new(20, 1080 - OVERLAY_H - 20, OVERLAY_W, OVERLAY_H));
}

#[test]
fn exit_request_is_reported() {
    let (mut controller, _log, _sat) = controller();
    assert!(!controller.exit_requested());
    controller.on_event(ControllerEvent::CloseRequested);
    assert!(controller.exit_requested());
}

struct TeardownOverlay {
    order: Rc<RefCell<Vec<&'static str>>>,
}

impl Drop for TeardownOverlay {
    fn drop(&mut self) {
        self.order.borrow_mut().push("overlay");
    }
}

impl OverlayView for TeardownOverlay {
    fn set_frame(&mut self, _frame: &FrameBuffer, _rect: Rect) {}
    fn move_to(&mut self, _position: Point) {}
    fn set_input_transparent(&mut self, _transparent: bool) {}
    fn show(&mut self) {}
    fn hide(&mut self) {}
    fn ensure_topmost(&mut self) {}
    fn set_move_cursor(&mut self, _enabled: bool) {}
    fn drain_pointer_events(&mut self) -> Vec<PointerEvent> {
        Vec::new()
    }
}

struct TeardownSatellite {
    order: Rc<RefCell<Vec<&'static str>>>,
}

impl Drop for TeardownSatellite {
    fn drop(&mut self) {
        self.order.borrow_mut().push("close button");
    }
}

impl SatelliteView for TeardownSatellite {
    fn show_at(&mut self, _rect: Rect) {}
    fn hide(&mut self) {}
    fn ensure_topmost(&mut self) {}
    fn take_clicked(&mut self) -> bool {
        false
    }
}

#[test]
fn teardown_releases_the_close_button_before_the_overlay() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let controller = OverlayController::new(
        OverlaySettings::default(),
        None,
        TeardownOverlay {
            order: order.clone(),
        },
        TeardownSatellite {
            order: order.clone(),
        },
        Box::new(FixedMonitors),
        BlockGlyphRasterizer,
    );
    drop(controller);
    assert_eq!(*order.borrow(), ["close button", "overlay"]);
}
