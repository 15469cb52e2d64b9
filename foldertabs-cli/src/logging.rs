use std::env;
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where the rolling log files go. `FOLDERTABS_LOG_DIR` wins over the
/// platform data directory.
pub fn log_dir() -> PathBuf {
    if let Ok(custom_dir) = env::var("FOLDERTABS_LOG_DIR") {
        return PathBuf::from(custom_dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(env::temp_dir)
        .join("foldertabs")
        .join("logs")
}

fn level_from_env() -> Level {
    env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        })
        .unwrap_or(Level::WARN)
}

/// stderr for the user, plus a daily file with everything at the same level
/// for bug reports. `verbose` raises the default to debug.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { level_from_env() };

    let log_dir = log_dir();
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = rolling::daily(&log_dir, "foldertabs.log");

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init();
}
