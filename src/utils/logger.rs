use std::env;
use std::sync::Once;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

/// Installs the global `tracing` subscriber once per process.
///
/// The level comes from `LOGLEVEL` (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`), `INFO` otherwise.
pub fn setup_logger() {
    INIT.call_once(|| {
        let log_level = env::var("LOGLEVEL")
            .unwrap_or_else(|_| "INFO".to_string())
            .to_uppercase();

        let level = match log_level.as_str() {
            "TRACE" => Level::TRACE,
            "DEBUG" => Level::DEBUG,
            "WARN" => Level::WARN,
            "ERROR" => Level::ERROR,
            _ => Level::INFO,
        };

        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            debug!("Log level set to: {}", level);
        }
    });
}
