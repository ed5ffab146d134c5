/// Screen-capture and snip tools the overlay must never sit on top of.
/// Matched case-insensitively against the app key's file stem.
const SUPPRESSED_PROCESSES: [&str; 7] = [
    "SnippingTool",
    "ScreenClippingHost",
    "GameBar",
    "XboxGameBar",
    "NVIDIA Share",
    "Lightshot",
    "ShareX",
];

/// Identity of the process owning a foreground window.
///
/// `app_key` identifies the executable across launches and keys the saved
/// per-app positions. `instance_id` additionally folds in the pid and
/// process start time, so a relaunch of the same executable counts as a
/// fresh instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub app_key: String,
    pub instance_id: String,
}

/// Build an identity from probed process facts. The executable path wins
/// when available; the bare process name is only a fallback for processes
/// whose image path cannot be queried.
pub fn build_identity(
    path: Option<&str>,
    name: Option<&str>,
    pid: u32,
    start_ticks: u64,
) -> Option<AppIdentity> {
    let key = path
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .or_else(|| name.map(str::trim).filter(|name| !name.is_empty()))?;
    Some(AppIdentity {
        app_key: key.to_string(),
        instance_id: format!("{key}|pid:{pid}|start:{start_ticks}"),
    })
}

/// Whether `app_key` belongs to a suppressed capture tool.
pub fn is_suppressed(app_key: &str) -> bool {
    let key = app_key.trim();
    if key.is_empty() {
        return false;
    }
    let stem = process_stem(key);
    SUPPRESSED_PROCESSES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(stem))
}

/// File stem of an app key that may be a full path, a bare executable
/// name, or a process name without extension. Separators are handled
/// manually so keys captured on one platform classify the same everywhere.
fn process_stem(app_key: &str) -> &str {
    let base = app_key
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(app_key);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    }
}

#[cfg(windows)]
pub use platform::identity_for_window;

#[cfg(windows)]
mod platform {
    use super::{build_identity, AppIdentity};
    use windows::core::PWSTR;
    use windows::Win32::Foundation::{CloseHandle, FILETIME, HANDLE, HWND};
    use windows::Win32::System::ProcessStatus::K32GetProcessImageFileNameW;
    use windows::Win32::System::Threading::{
        GetProcessTimes, OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };
    use windows::Win32::UI::WindowsAndMessaging::GetWindowThreadProcessId;

    struct ProcessHandle(HANDLE);

    impl Drop for ProcessHandle {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }

    /// Resolve the identity of the process owning `hwnd`. Returns `None`
    /// when the pid cannot be read, the process cannot be opened, or no
    /// usable key can be derived.
    pub fn identity_for_window(hwnd: HWND) -> Option<AppIdentity> {
        let mut pid = 0u32;
        unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
        if pid == 0 {
            return None;
        }
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }.ok()?;
        let handle = ProcessHandle(handle);

        let path = query_image_path(&handle);
        let name = if path.is_none() {
            image_file_name(&handle)
        } else {
            None
        };
        let start_ticks = process_start_ticks(&handle).unwrap_or_else(|| {
            // Restricted processes refuse the times query; two such
            // launches of one executable then share an instance id.
            tracing::debug!(pid, "process start time unavailable, using 0");
            0
        });
        build_identity(path.as_deref(), name.as_deref(), pid, start_ticks)
    }

    fn query_image_path(handle: &ProcessHandle) -> Option<String> {
        let mut buf = [0u16; 1024];
        let mut len = buf.len() as u32;
        unsafe {
            QueryFullProcessImageNameW(
                handle.0,
                PROCESS_NAME_WIN32,
                PWSTR(buf.as_mut_ptr()),
                &mut len,
            )
        }
        .ok()?;
        if len == 0 {
            return None;
        }
        Some(String::from_utf16_lossy(&buf[..len as usize]))
    }

    fn image_file_name(handle: &ProcessHandle) -> Option<String> {
        let mut buf = [0u16; 1024];
        let len = unsafe { K32GetProcessImageFileNameW(handle.0, &mut buf) } as usize;
        if len == 0 {
            return None;
        }
        // Device-form path; keep the basename as a process-name fallback.
        let full = String::from_utf16_lossy(&buf[..len]);
        full.rsplit('\\').next().map(str::to_string)
    }

    fn process_start_ticks(handle: &ProcessHandle) -> Option<u64> {
        let mut creation = FILETIME::default();
        let mut exit = FILETIME::default();
        let mut kernel = FILETIME::default();
        let mut user = FILETIME::default();
        unsafe { GetProcessTimes(handle.0, &mut creation, &mut exit, &mut kernel, &mut user) }
            .ok()?;
        Some((u64::from(creation.dwHighDateTime) << 32) | u64::from(creation.dwLowDateTime))
    }
}
