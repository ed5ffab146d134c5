#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    app::run()
}

#[cfg(not(windows))]
fn main() {
    eprintln!("temp_hud is a Windows desktop overlay; this platform is unsupported.");
}

#[cfg(windows)]
mod app {
    use std::time::{Duration, Instant};

    use anyhow::Result;
    use windows::Win32::Foundation::POINT;
    use windows::Win32::UI::HiDpi::{
        SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    };
    use windows::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, VK_LBUTTON};
    use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

    use temp_hud::logging;
    use temp_hud::overlay::compositor::GdiGlyphRasterizer;
    use temp_hud::overlay::geometry::{Point, WindowsMonitors};
    use temp_hud::overlay::hook::SETTLE_PROBE_INTERVAL_MS;
    use temp_hud::overlay::interaction::POLL_INTERVAL_MS as INTERACTION_INTERVAL_MS;
    use temp_hud::overlay::{
        capture_probe, pump_messages, CloseButtonWindow, ForegroundHook, OverlayController,
        OverlayWindow,
    };
    use temp_hud::sensors::{
        SensorSource, UnavailableSensors, POLL_INTERVAL_MS as SENSOR_INTERVAL_MS,
    };
    use temp_hud::settings::{self, OverlaySettings};
    use temp_hud::single_instance::SingleInstance;

    pub fn run() -> Result<()> {
        let settings_path = settings::settings_path();
        let settings = OverlaySettings::load(&settings_path.to_string_lossy());

        let log_dir = settings.debug_logging.then(settings::log_dir);
        let _log_guard = logging::init(settings.debug_logging, log_dir.as_deref());

        let _instance = match SingleInstance::acquire()? {
            Some(instance) => instance,
            None => {
                tracing::info!("another instance is already running, exiting");
                return Ok(());
            }
        };

        tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting overlay");

        if let Err(error) =
            unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) }
        {
            tracing::warn!(%error, "per-monitor dpi awareness not applied");
        }

        let overlay = OverlayWindow::create()?;
        let close_button = CloseButtonWindow::create()?;
        let own_windows = [overlay.hwnd(), close_button.hwnd()];

        let mut controller = OverlayController::new(
            settings,
            Some(settings_path.to_string_lossy().into_owned()),
            overlay,
            close_button,
            Box::new(WindowsMonitors),
            GdiGlyphRasterizer::default(),
        );
        let mut sensors = UnavailableSensors;

        let snapshot = sensors.read();
        controller.startup(&capture_probe(&own_windows), &snapshot);

        let foreground = match ForegroundHook::install() {
            Ok(pair) => Some(pair),
            Err(error) => {
                tracing::warn!(%error, "foreground hook unavailable, relying on polling");
                None
            }
        };

        let started = Instant::now();
        let mut next_sensor_ms = SENSOR_INTERVAL_MS;
        let mut next_interaction_ms = INTERACTION_INTERVAL_MS;
        let mut next_settle_ms = 0u64;

        loop {
            if !pump_messages() {
                break;
            }
            controller.pump_input();
            if controller.exit_requested() {
                break;
            }

            let now_ms = started.elapsed().as_millis() as u64;

            if let Some((_hook, rx)) = &foreground {
                let mut changed = false;
                while rx.try_recv().is_ok() {
                    changed = true;
                }
                if changed {
                    controller.on_foreground_event(now_ms, &capture_probe(&own_windows));
                }
            }

            if now_ms >= next_sensor_ms {
                next_sensor_ms = now_ms + SENSOR_INTERVAL_MS;
                let snapshot = sensors.read();
                controller.on_sensor_tick(&capture_probe(&own_windows), &snapshot);
            }

            if now_ms >= next_interaction_ms {
                next_interaction_ms = now_ms + INTERACTION_INTERVAL_MS;
                let primary_down = unsafe { GetAsyncKeyState(VK_LBUTTON.0 as i32) } < 0;
                controller.on_interaction_tick(
                    now_ms,
                    &capture_probe(&own_windows),
                    cursor_position(),
                    primary_down,
                );
            }

            if controller.settle_probe_running() && now_ms >= next_settle_ms {
                next_settle_ms = now_ms + SETTLE_PROBE_INTERVAL_MS;
                controller.on_settle_tick(now_ms, &capture_probe(&own_windows));
            }

            std::thread::sleep(Duration::from_millis(10));
        }

        tracing::info!("overlay shut down");
        Ok(())
    }

    fn cursor_position() -> Point {
        let mut point = POINT::default();
        if unsafe { GetCursorPos(&mut point) }.is_ok() {
            Point::new(point.x, point.y)
        } else {
            Point::default()
        }
    }
}
