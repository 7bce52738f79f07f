use serde::{Deserialize, Serialize};

pub const DEFAULT_AVATAR: &str = "🤖";
pub const DEFAULT_COLOR: &str = "#0071ce";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Editable configuration of one agent, as exchanged with the backend.
///
/// Decoding is lenient: missing or `null` fields take their defaults and
/// knowledge sources of an unknown type are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireAgentConfig")]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub avatar: String,
    pub color: String,
    pub capabilities: Vec<String>,
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub knowledge_sources: Vec<KnowledgeSource>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            title: String::new(),
            description: String::new(),
            avatar: DEFAULT_AVATAR.to_owned(),
            color: DEFAULT_COLOR.to_owned(),
            capabilities: Vec::new(),
            prompt: String::new(),
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            knowledge_sources: Vec::new(),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireAgentConfig {
    id: Option<String>,
    name: Option<String>,
    title: Option<String>,
    description: Option<String>,
    avatar: Option<String>,
    color: Option<String>,
    capabilities: Option<Vec<Option<String>>>,
    prompt: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    knowledge_sources: Option<Vec<WireKnowledgeSource>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireKnowledgeSource {
    Known(KnowledgeSource),
    Unrecognised(serde::de::IgnoredAny),
}

impl From<WireAgentConfig> for AgentConfig {
    fn from(wire: WireAgentConfig) -> Self {
        let defaults = Self::default();
        let knowledge_sources = wire
            .knowledge_sources
            .unwrap_or_default()
            .into_iter()
            .filter_map(|source| match source {
                WireKnowledgeSource::Known(source) => Some(source),
                WireKnowledgeSource::Unrecognised(_) => {
                    tracing::warn!("skipping knowledge source with unrecognised shape");
                    None
                }
            })
            .collect();

        Self {
            id: wire.id.unwrap_or(defaults.id),
            name: wire.name.unwrap_or(defaults.name),
            title: wire.title.unwrap_or(defaults.title),
            description: wire.description.unwrap_or(defaults.description),
            avatar: wire.avatar.unwrap_or(defaults.avatar),
            color: wire.color.unwrap_or(defaults.color),
            capabilities: wire
                .capabilities
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .collect(),
            prompt: wire.prompt.unwrap_or(defaults.prompt),
            model: wire.model.unwrap_or(defaults.model),
            max_tokens: wire.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: wire.temperature.unwrap_or(defaults.temperature),
            knowledge_sources,
        }
    }
}

impl AgentConfig {
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Appends a trimmed capability unless it is empty or already present.
    pub fn add_capability(&mut self, capability: &str) -> bool {
        let capability = capability.trim();
        if capability.is_empty() || self.capabilities.iter().any(|cap| cap == capability) {
            return false;
        }
        self.capabilities.push(capability.to_owned());
        true
    }

    pub fn remove_capability(&mut self, capability: &str) -> bool {
        match self.capabilities.iter().position(|cap| cap == capability) {
            Some(index) => {
                self.capabilities.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn find_source(&self, source_id: &str) -> Option<&KnowledgeSource> {
        self.knowledge_sources
            .iter()
            .find(|source| source.id == source_id)
    }

    pub fn remove_source(&mut self, source_id: &str) -> Option<KnowledgeSource> {
        let index = self
            .knowledge_sources
            .iter()
            .position(|source| source.id == source_id)?;
        Some(self.knowledge_sources.remove(index))
    }

    /// Id for a source created without the backend: the timestamp in
    /// milliseconds, bumped past any id already in the list.
    pub fn next_local_source_id(&self, now_millis: i64) -> String {
        let mut candidate = now_millis;
        loop {
            let id = candidate.to_string();
            if self.find_source(&id).is_none() {
                return id;
            }
            candidate = candidate.saturating_add(1);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    #[serde(deserialize_with = "text_or_integer")]
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: KnowledgeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KnowledgeKind {
    Document {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
    },
    Url {
        url: String,
    },
}

impl KnowledgeSource {
    pub fn document(id: impl Into<String>, name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: KnowledgeKind::Document {
                size: Some(format_size_mb(size_bytes)),
            },
        }
    }

    pub fn url(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: KnowledgeKind::Url { url: url.into() },
        }
    }

    pub fn type_label(&self) -> &'static str {
        match self.kind {
            KnowledgeKind::Document { .. } => "document",
            KnowledgeKind::Url { .. } => "url",
        }
    }

    /// Size for documents, address for urls.
    pub fn detail(&self) -> &str {
        match &self.kind {
            KnowledgeKind::Document { size } => size.as_deref().unwrap_or("Unknown size"),
            KnowledgeKind::Url { url } => url,
        }
    }
}

/// Backends may number their sources.
fn text_or_integer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Integer(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Integer(number) => number.to_string(),
    })
}

pub fn format_size_mb(size_bytes: u64) -> String {
    format!("{:.2} MB", size_bytes as f64 / 1024.0 / 1024.0)
}
