pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load, load_from_file, ENV_BASE_URL, ENV_TIMEOUT_MS};
pub use schema::PanelConfig;
pub use validation::validate_config;
