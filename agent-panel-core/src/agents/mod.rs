pub mod registry;
pub mod types;

pub use registry::AgentCatalog;
pub use types::{AgentConfig, KnowledgeKind, KnowledgeSource, ModelSettings};
