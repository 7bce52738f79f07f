pub mod agents;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod panel;

pub use agents::{AgentCatalog, AgentConfig, KnowledgeSource};
pub use backend::{ConfigBackend, HttpConfigBackend};
pub use config::PanelConfig;
pub use error::{Error, Result};
pub use events::{EventBus, PanelEvent};
pub use panel::ConfigurationPanel;
