use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const DEFAULT_DIRECTIVES: &str = "flight_etl=debug,info";

/// Console logging plus a daily-rotated JSON log file under `logs/`.
///
/// `RUST_LOG` overrides the default filter. The appender guard is leaked on
/// purpose so buffered lines are flushed for the lifetime of the process.
pub fn init_logging() {
    let _ = fs::create_dir_all(LOG_DIR);

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, "flight-etl.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().with_target(true).with_writer(std::io::stdout))
        .init();

    std::mem::forget(guard);
}
