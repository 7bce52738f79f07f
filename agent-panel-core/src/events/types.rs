use std::time::Duration;

use serde::Serialize;

use crate::agents::types::KnowledgeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    /// The change only exists locally (demo mode).
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(rename = "dismiss_after_secs", serialize_with = "as_secs")]
    pub dismiss_after: Duration,
}

fn as_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_secs())
}

/// Everything the presentation layer needs to mirror the panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelEvent {
    ModalShown { agent_id: String },
    ModalHidden,
    LoadingChanged { loading: bool },
    ConfigPopulated { agent_id: String, name: String },
    CapabilitiesChanged { capabilities: Vec<String> },
    KnowledgeSourcesChanged { sources: Vec<KnowledgeSource> },
    Notice(Notice),
}

impl PanelEvent {
    /// Tag used on the wire and in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModalShown { .. } => "modal_shown",
            Self::ModalHidden => "modal_hidden",
            Self::LoadingChanged { .. } => "loading_changed",
            Self::ConfigPopulated { .. } => "config_populated",
            Self::CapabilitiesChanged { .. } => "capabilities_changed",
            Self::KnowledgeSourcesChanged { .. } => "knowledge_sources_changed",
            Self::Notice(_) => "notice",
        }
    }
}
