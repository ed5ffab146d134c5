#[cfg(windows)]
pub use platform::SingleInstance;

#[cfg(windows)]
mod platform {
    use anyhow::{Context, Result};
    use windows::core::w;
    use windows::Win32::Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE};
    use windows::Win32::System::Threading::CreateMutexW;

    /// Holds a named mutex for the lifetime of the process so only one
    /// overlay runs per session. Session-local on purpose: separate
    /// desktops get their own overlay.
    pub struct SingleInstance {
        handle: HANDLE,
    }

    impl SingleInstance {
        /// Returns `None` when another instance already owns the mutex.
        pub fn acquire() -> Result<Option<Self>> {
            let handle = unsafe { CreateMutexW(None, true, w!("Local\\temp_hud.single_instance")) }
                .context("create single-instance mutex")?;
            if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
                unsafe {
                    let _ = CloseHandle(handle);
                }
                return Ok(None);
            }
            Ok(Some(Self { handle }))
        }
    }

    impl Drop for SingleInstance {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.handle);
            }
        }
    }
}
