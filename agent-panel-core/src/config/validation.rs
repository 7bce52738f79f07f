use crate::config::schema::PanelConfig;
use crate::error::{Error, Result};

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

pub fn validate_config(config: &PanelConfig) -> Result<()> {
    let base_url = config.backend.base_url.trim();
    if base_url.is_empty() {
        return Err(Error::Validation(
            "backend.base_url cannot be empty".to_owned(),
        ));
    }

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(Error::Validation(format!(
            "backend.base_url '{base_url}' must start with http:// or https://"
        )));
    }

    for (name, _) in &config.backend.extra_headers {
        if name.trim().is_empty() {
            return Err(Error::Validation(
                "backend.extra_headers entry has an empty name".to_owned(),
            ));
        }
    }

    if config.catalog.fallback_agent.trim().is_empty() {
        return Err(Error::Validation(
            "catalog.fallback_agent cannot be empty".to_owned(),
        ));
    }

    if config.notices.dismiss_after_secs == 0 {
        return Err(Error::Validation(
            "notices.dismiss_after_secs must be at least 1".to_owned(),
        ));
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(Error::Validation(format!(
            "logging.level '{}' must be one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    Ok(())
}
