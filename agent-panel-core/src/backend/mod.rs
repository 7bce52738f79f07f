pub mod http;
pub mod types;

pub use http::HttpConfigBackend;
pub use types::{AgentUpdate, BackendAck, BackendResponse, ConfigBackend, FileUpload};
