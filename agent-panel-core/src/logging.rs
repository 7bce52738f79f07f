use tracing_subscriber::EnvFilter;

use crate::config::schema::LoggingConfig;

/// Installs the stderr subscriber. `RUST_LOG` wins over `logging.level`.
///
/// Returns `false` when a subscriber was already installed, in which case
/// the existing one stays in place.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(panel_directives(&config.level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// `level` applies to the panel crates only; dependencies stay at `warn`.
fn panel_directives(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    format!("warn,agent_panel_core={level},agent_panel={level}")
}
