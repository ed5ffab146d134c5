use super::classifier::{is_desktop_class, is_fullscreen};
use super::geometry::Rect;
use super::identity::{is_suppressed, AppIdentity};

/// Snapshot of the foreground window taken in one scheduling turn. All OS
/// queries happen while capturing; the tracker itself never touches the OS.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForegroundProbe {
    /// `None` when there is no usable foreground window: nothing is
    /// foreground, the overlay itself is, or the window is invisible or
    /// unmeasurable.
    pub window: Option<ProbedWindow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbedWindow {
    pub window_rect: Rect,
    pub monitor_rect: Rect,
    pub class_name: String,
    /// `None` when the owning process could not be identified.
    pub identity: Option<AppIdentity>,
}

impl ForegroundProbe {
    pub fn of(window: ProbedWindow) -> Self {
        Self {
            window: Some(window),
        }
    }
}

/// What a refresh changed, as far as the caller must react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextDelta {
    /// The context deactivated or switched to a different app instance.
    /// The caller resets interaction state and repositions the overlay.
    pub reset_needed: bool,
}

/// Tracks which application currently owns the screen.
///
/// "Active" means the foreground window was resolved to a process
/// identity; whether the overlay should actually show on top of it is the
/// visibility rule's concern.
#[derive(Debug, Clone, Default)]
pub struct ContextTracker {
    active: bool,
    suppressed: bool,
    app_key: String,
    instance_id: String,
    monitor_bounds: Rect,
    foreground_fullscreen: bool,
    desktop_foreground: bool,
}

impl ContextTracker {
    pub fn refresh(&mut self, probe: &ForegroundProbe) -> ContextDelta {
        let was_active = self.active;
        let previous_instance = self.instance_id.clone();

        self.suppressed = false;
        match &probe.window {
            None => {
                self.clear();
                self.monitor_bounds = Rect::EMPTY;
            }
            Some(window) => {
                // The monitor sticks around even when identity fails so
                // drag clamping keeps working mid-transition.
                self.monitor_bounds = window.monitor_rect;
                match &window.identity {
                    None => self.clear(),
                    Some(identity) if is_suppressed(&identity.app_key) => {
                        self.clear();
                        self.suppressed = true;
                    }
                    Some(identity) => {
                        self.active = true;
                        self.app_key = identity.app_key.clone();
                        self.instance_id = identity.instance_id.clone();
                        self.foreground_fullscreen =
                            is_fullscreen(window.window_rect, window.monitor_rect);
                        self.desktop_foreground = is_desktop_class(&window.class_name);
                    }
                }
            }
        }

        let app_changed =
            self.active && !previous_instance.eq_ignore_ascii_case(&self.instance_id);
        ContextDelta {
            reset_needed: (!self.active && was_active) || app_changed,
        }
    }

    fn clear(&mut self) {
        self.active = false;
        self.app_key.clear();
        self.instance_id.clear();
        self.foreground_fullscreen = false;
        self.desktop_foreground = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn monitor_bounds(&self) -> Rect {
        self.monitor_bounds
    }

    pub fn is_foreground_fullscreen(&self) -> bool {
        self.foreground_fullscreen
    }

    pub fn is_desktop_foreground(&self) -> bool {
        self.desktop_foreground
    }
}

#[cfg(windows)]
pub use platform::capture_probe;

#[cfg(windows)]
mod platform {
    use super::{ForegroundProbe, ProbedWindow};
    use crate::overlay::geometry::platform::rect_from_win32;
    use crate::overlay::identity::identity_for_window;
    use windows::Win32::Foundation::{HWND, RECT};
    use windows::Win32::Graphics::Gdi::{
        GetMonitorInfoW, MonitorFromWindow, MONITORINFO, MONITOR_DEFAULTTONEAREST,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetClassNameW, GetForegroundWindow, GetWindowRect, IsWindowVisible,
    };

    /// Probe the current foreground window, skipping the overlay's own
    /// windows. Any failed query collapses to an empty probe, which the
    /// tracker treats as "no context".
    pub fn capture_probe(own_windows: &[HWND]) -> ForegroundProbe {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_invalid() || own_windows.contains(&hwnd) {
            return ForegroundProbe::default();
        }
        if !unsafe { IsWindowVisible(hwnd) }.as_bool() {
            return ForegroundProbe::default();
        }

        let mut rect = RECT::default();
        if unsafe { GetWindowRect(hwnd, &mut rect) }.is_err() {
            return ForegroundProbe::default();
        }

        let monitor = unsafe { MonitorFromWindow(hwnd, MONITOR_DEFAULTTONEAREST) };
        if monitor.is_invalid() {
            return ForegroundProbe::default();
        }
        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
            return ForegroundProbe::default();
        }

        let mut class_buf = [0u16; 256];
        let class_len = unsafe { GetClassNameW(hwnd, &mut class_buf) };
        let class_name = if class_len > 0 {
            String::from_utf16_lossy(&class_buf[..class_len as usize])
        } else {
            String::new()
        };

        ForegroundProbe::of(ProbedWindow {
            window_rect: rect_from_win32(rect),
            monitor_rect: rect_from_win32(info.rcMonitor),
            class_name,
            identity: identity_for_window(hwnd),
        })
    }
}
