use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_NOTICE_DISMISS_SECS: u64 = 5;
pub const DEFAULT_FALLBACK_AGENT: &str = "wally";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub backend: BackendConfig,
    pub notices: NoticeConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Request timeout; `0` selects the default.
    pub timeout_ms: u64,
    pub extra_headers: Vec<(String, String)>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            extra_headers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeConfig {
    pub dismiss_after_secs: u64,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            dismiss_after_secs: DEFAULT_NOTICE_DISMISS_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Agent whose defaults are used when an id is unknown to the catalog.
    pub fallback_agent: String,
    /// Optional TOML file replacing the built-in default table.
    pub path: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            fallback_agent: DEFAULT_FALLBACK_AGENT.to_owned(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
        }
    }
}
