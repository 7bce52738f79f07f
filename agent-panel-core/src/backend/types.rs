use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agents::types::{AgentConfig, ModelSettings};
use crate::error::{Error, Result};

/// Remote store of agent configurations.
///
/// Implementations report an error payload as [`Error::Remote`] and any
/// failure to obtain a decodable answer as [`Error::Connectivity`].
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_config(&self, agent_id: &str) -> Result<AgentConfig>;

    async fn upload_file(
        &self,
        agent_id: &str,
        upload: &FileUpload,
        display_name: &str,
    ) -> Result<BackendAck>;

    async fn add_url(&self, agent_id: &str, name: &str, url: &str) -> Result<BackendAck>;

    async fn remove_knowledge(&self, agent_id: &str, source_id: &str) -> Result<()>;

    async fn refresh_url(&self, url: &str) -> Result<()>;

    async fn update(&self, agent_id: &str, update: &AgentUpdate) -> Result<()>;
}

/// Accepted write; carries the id the backend assigned, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendAck {
    pub knowledge_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BackendResponse {
    pub success: bool,
    pub error: Option<String>,
    pub knowledge_id: Option<Value>,
}

impl BackendResponse {
    /// Writes must be acknowledged with `success: true`.
    pub fn into_ack(self) -> Result<BackendAck> {
        if let Some(error) = self.error {
            return Err(Error::Remote(error));
        }
        if !self.success {
            return Err(Error::Remote("request was not accepted".to_owned()));
        }

        let knowledge_id = self.knowledge_id.and_then(|value| match value {
            Value::String(id) if !id.is_empty() => Some(id),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        });
        Ok(BackendAck { knowledge_id })
    }

    /// Fire-and-forget calls only fail on an explicit error payload.
    pub fn check_error(self) -> Result<()> {
        match self.error {
            Some(error) => Err(Error::Remote(error)),
            None => Ok(()),
        }
    }
}

/// Body of `POST /api/agents/{id}/update`; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_settings: Option<ModelSettings>,
}

impl AgentUpdate {
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    pub fn model_settings(settings: ModelSettings) -> Self {
        Self {
            model_settings: Some(settings),
            ..Self::default()
        }
    }

    pub fn all(config: &AgentConfig) -> Self {
        Self {
            name: Some(config.name.clone()),
            title: Some(config.title.clone()),
            description: Some(config.description.clone()),
            capabilities: Some(config.capabilities.clone()),
            prompt: Some(config.prompt.clone()),
            model_settings: Some(config.model_settings()),
        }
    }
}

/// A file selected for upload as a knowledge document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::Validation(format!("'{}' does not name a file", path.display()))
            })?;
        let bytes = std::fs::read(path)?;
        Ok(Self { file_name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
