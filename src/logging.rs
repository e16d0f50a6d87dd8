use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Config;

/// Installs the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured log level. Production
/// deployments log JSON lines.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true);

    if config.is_production() {
        builder.json().init();
    } else {
        builder.with_ansi(true).init();
    }

    info!(level = %config.log_level, env = %config.app_env, "logging initialized");
}
