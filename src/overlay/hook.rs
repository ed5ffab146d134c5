/// Cadence of the settle probe after a foreground change.
pub const SETTLE_PROBE_INTERVAL_MS: u64 = 16;
/// How long the probe keeps re-evaluating. Covers fullscreen enter/exit
/// animations during which window rects are still moving.
pub const SETTLE_PROBE_WINDOW_MS: u64 = 900;

/// Marker for one foreground-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForegroundChanged;

/// Short burst of context re-evaluation after a foreground change.
///
/// A single probe right at the notification often sees a half-animated
/// window, so the bridge keeps probing on a fast cadence for a fixed
/// window and then stops itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettleProbe {
    deadline_ms: Option<u64>,
}

impl SettleProbe {
    pub fn start(&mut self, now_ms: u64) {
        self.deadline_ms = Some(now_ms + SETTLE_PROBE_WINDOW_MS);
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Whether a re-evaluation should run this tick. Stops itself once
    /// the deadline has passed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            None => false,
            Some(deadline) if now_ms > deadline => {
                self.deadline_ms = None;
                false
            }
            Some(_) => true,
        }
    }
}

#[cfg(windows)]
pub use platform::ForegroundHook;

#[cfg(windows)]
mod platform {
    use super::ForegroundChanged;
    use anyhow::{bail, Result};
    use once_cell::sync::Lazy;
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::Mutex;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent, HWINEVENTHOOK};
    use windows::Win32::UI::WindowsAndMessaging::{
        EVENT_SYSTEM_FOREGROUND, OBJID_WINDOW, WINEVENT_OUTOFCONTEXT, WINEVENT_SKIPOWNPROCESS,
    };

    // The OS invokes the callback on an arbitrary thread; it only ever
    // forwards into this channel, never touches overlay state.
    static EVENT_SENDER: Lazy<Mutex<Option<Sender<ForegroundChanged>>>> =
        Lazy::new(|| Mutex::new(None));

    /// Installed foreground-change hook. Dropping it unhooks and closes
    /// the channel.
    #[derive(Debug)]
    pub struct ForegroundHook {
        hook: HWINEVENTHOOK,
    }

    impl ForegroundHook {
        pub fn install() -> Result<(Self, Receiver<ForegroundChanged>)> {
            let (tx, rx) = mpsc::channel();
            match EVENT_SENDER.lock() {
                Ok(mut sender) => *sender = Some(tx),
                Err(_) => bail!("foreground event channel poisoned"),
            }

            let hook = unsafe {
                SetWinEventHook(
                    EVENT_SYSTEM_FOREGROUND,
                    EVENT_SYSTEM_FOREGROUND,
                    None,
                    Some(on_foreground_event),
                    0,
                    0,
                    WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS,
                )
            };
            if hook.is_invalid() {
                if let Ok(mut sender) = EVENT_SENDER.lock() {
                    *sender = None;
                }
                bail!("SetWinEventHook for foreground changes failed");
            }
            tracing::debug!("foreground event hook installed");
            Ok((Self { hook }, rx))
        }
    }

    impl Drop for ForegroundHook {
        fn drop(&mut self) {
            if !unsafe { UnhookWinEvent(self.hook) }.as_bool() {
                tracing::warn!("failed to remove foreground event hook");
            }
            if let Ok(mut sender) = EVENT_SENDER.lock() {
                *sender = None;
            }
        }
    }

    unsafe extern "system" fn on_foreground_event(
        _hook: HWINEVENTHOOK,
        event: u32,
        hwnd: HWND,
        id_object: i32,
        _id_child: i32,
        _id_event_thread: u32,
        _time_ms: u32,
    ) {
        if event != EVENT_SYSTEM_FOREGROUND || id_object != OBJID_WINDOW.0 || hwnd.is_invalid() {
            return;
        }
        // Never unwind across the FFI boundary.
        let sent = std::panic::catch_unwind(|| {
            if let Ok(sender) = EVENT_SENDER.lock() {
                if let Some(sender) = sender.as_ref() {
                    let _ = sender.send(ForegroundChanged);
                }
            }
        });
        if sent.is_err() {
            tracing::error!("panic in foreground event callback");
        }
    }
}
