use std::path::Path;

use crate::config::schema::PanelConfig;
use crate::error::{Error, Result};

pub const ENV_BASE_URL: &str = "AGENT_PANEL_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "AGENT_PANEL_TIMEOUT_MS";

/// Loads the panel config. A path that does not exist yields the defaults;
/// environment overrides are applied last.
pub fn load(path: Option<&Path>) -> Result<PanelConfig> {
    let mut config = match path {
        Some(path) if path.exists() => load_from_file(path)?,
        Some(path) => {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            PanelConfig::default()
        }
        None => PanelConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

pub fn load_from_file(path: &Path) -> Result<PanelConfig> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("failed to read config '{}': {err}", path.display()))
    })?;

    toml::from_str(&content).map_err(|err| {
        Error::Config(format!(
            "failed to parse config '{}': {err}",
            path.display()
        ))
    })
}

pub fn apply_env_overrides<F>(config: &mut PanelConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup(ENV_BASE_URL) {
        let trimmed = base_url.trim();
        if !trimmed.is_empty() {
            config.backend.base_url = trimmed.to_owned();
        }
    }

    if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
        config.backend.timeout_ms = timeout.trim().parse().map_err(|err| {
            Error::Config(format!("invalid {ENV_TIMEOUT_MS} value '{timeout}': {err}"))
        })?;
    }

    Ok(())
}
