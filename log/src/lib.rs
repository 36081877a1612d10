//! Logging setup for Code Awareness with file output and optional stdout.
//!
//! Logs always go to a file at `warn` level (or higher if `CAW_LOG` is set).
//! Stdout logging is enabled when `CAW_LOG` or `RUST_LOG` is set, or in debug builds.
//!
//! ## Environment Variables
//!
//! 1. **`CAW_LOG`** (highest priority) - Code Awareness logging control
//! 2. **`RUST_LOG`** - Standard tracing environment variable
//! 3. **Default** - `warn` globally, `info` for caw crates
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/caw/logs/caw-<pid>.log`
//! - macOS: `~/Library/Application Support/caw/logs/caw-12345.log`
//! - Linux: `~/.local/share/caw/logs/caw-12345.log`
//!
//! Override with `--log-file <path>` or `CAW_LOG_FILE`.

use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Crates whose log level follows a bare `CAW_LOG=<level>`.
const CAW_CRATES: &[&str] = &["caw_tracker", "caw_session", "caw_bin", "caw"];

/// Returned from [`init`]; must be held alive to ensure log file flushing.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub log_file_path: Option<PathBuf>,
}

impl LogConfig {
    /// Use `cli_override` if given, otherwise `CAW_LOG_FILE`.
    pub fn from_env(cli_override: Option<PathBuf>) -> Self {
        let log_file_path = cli_override.or_else(|| env::var_os("CAW_LOG_FILE").map(PathBuf::from));
        Self { log_file_path }
    }
}

/// Initialize logging.
///
/// Respects the environment variable priority described in the module docs:
/// `CAW_LOG` > `RUST_LOG` > default settings.
///
/// The returned [`LogGuard`] must be held for the lifetime of the program --
/// dropping it flushes and stops the background file writer.
pub fn init(config: LogConfig) -> Result<LogGuard, BoxError> {
    let (log_dir, filename) = resolve_log_path(config.log_file_path);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(create_file_filter());

    let stdout_enabled = env_filter_requested() || cfg!(debug_assertions);
    let stdout_layer = stdout_enabled.then(|| fmt::layer().with_filter(create_filter()));

    Registry::default()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(filename),
    })
}

/// Initialize logging for tests.
///
/// Stdout-only (no file output). Will not crash if called multiple times or if
/// logging is already initialized by another test.
pub fn test() {
    let _ = fmt()
        .with_env_filter(create_filter())
        .with_test_writer()
        .try_init();
}

fn env_filter_requested() -> bool {
    env::var("CAW_LOG").is_ok() || env::var("RUST_LOG").is_ok()
}

/// Split an optional override into the directory and file name to log to.
///
/// An override with an extension names the file itself; anything else is
/// treated as the directory for the default `caw-<pid>.log`.
fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("caw-{}.log", std::process::id());

    match override_path {
        Some(path) if path.extension().is_some() => {
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);
            (dir, name)
        },
        Some(dir) => (dir, filename),
        None => {
            let dir = dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("caw")
                .join("logs");
            (dir, filename)
        },
    }
}

/// File filter: uses user-specified level if set, otherwise defaults to `warn`.
fn create_file_filter() -> EnvFilter {
    if env_filter_requested() {
        return create_filter();
    }
    EnvFilter::new("warn")
}

/// Create the [`EnvFilter`] for the current environment: `CAW_LOG` > `RUST_LOG` > defaults.
fn create_filter() -> EnvFilter {
    if let Ok(caw_log) = env::var("CAW_LOG") {
        return EnvFilter::new(expand_caw_log(&caw_log));
    }

    if let Ok(rust_log) = env::var("RUST_LOG") {
        return EnvFilter::new(rust_log);
    }

    EnvFilter::new(expand_caw_log("info"))
}

/// Expand `CAW_LOG` values into full tracing filter directives.
///
/// - `CAW_LOG=debug` becomes `warn,caw_tracker=debug,caw_session=debug,...`
/// - `CAW_LOG=caw_tracker=trace,caw_session=debug` is used as-is
fn expand_caw_log(caw_log: &str) -> String {
    if caw_log.contains('=') || caw_log.contains(':') || caw_log.contains(',') {
        return caw_log.to_string();
    }

    let mut directives = String::from("warn");
    for krate in CAW_CRATES {
        directives.push_str(&format!(",{krate}={caw_log}"));
    }
    directives
}
