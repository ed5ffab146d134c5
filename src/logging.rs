use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialise logging. In debug builds the default level is `debug` while in
/// release builds it falls back to `info`. The level can be overridden via the
/// `RUST_LOG` environment variable.
/// `debug` level can be explicitly enabled via the settings file.
///
/// When `log_dir` is given, output goes to a daily-rolled file inside it
/// instead of stderr. The returned guard must be kept alive for the duration
/// of the process or buffered lines are lost.
pub fn init(debug: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // When debug logging is disabled we force `info` level regardless of the
    // `RUST_LOG` environment variable. This prevents accidental verbose output
    // if the variable happens to be set in the user's environment.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        // Allow `RUST_LOG` to override the level when debug logging is enabled.
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "temp_hud.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init();
            None
        }
    }
}
