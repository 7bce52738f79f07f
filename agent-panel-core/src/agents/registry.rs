use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::agents::types::AgentConfig;
use crate::config::schema::CatalogConfig;
use crate::error::{Error, Result};

const BUILTIN_CATALOG: &str = include_str!("../../defaults/agents.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    agents: Vec<AgentConfig>,
}

/// Default agent configurations, keyed by agent id.
///
/// Both a full agent reset and a prompt-only reset read from here, so each
/// default prompt exists exactly once.
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents: Vec<AgentConfig>,
    index: HashMap<String, usize>,
    fallback_index: usize,
}

impl AgentCatalog {
    pub fn builtin(fallback_agent: &str) -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG, fallback_agent)
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        match config.path.as_deref() {
            Some(path) => Self::from_file(Path::new(path), &config.fallback_agent),
            None => Self::builtin(&config.fallback_agent),
        }
    }

    pub fn from_file(path: &Path, fallback_agent: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!(
                "failed to read agent catalog '{}': {err}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content, fallback_agent)
    }

    pub fn from_toml_str(content: &str, fallback_agent: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|err| Error::Config(format!("failed to parse agent catalog: {err}")))?;
        Self::from_agents(file.agents, fallback_agent)
    }

    pub fn from_agents(agents: Vec<AgentConfig>, fallback_agent: &str) -> Result<Self> {
        let mut index = HashMap::new();
        for (position, agent) in agents.iter().enumerate() {
            let id = agent.id.trim();
            if id.is_empty() {
                return Err(Error::Validation(
                    "catalog agent id cannot be empty".to_owned(),
                ));
            }
            if index.insert(id.to_owned(), position).is_some() {
                return Err(Error::Validation(format!(
                    "duplicate catalog agent id '{id}'"
                )));
            }
        }

        let fallback_index = *index.get(fallback_agent.trim()).ok_or_else(|| {
            Error::NotFound(format!(
                "fallback agent '{fallback_agent}' is not in the catalog"
            ))
        })?;

        Ok(Self {
            agents,
            index,
            fallback_index,
        })
    }

    pub fn get_config(&self, agent_id: &str) -> Option<&AgentConfig> {
        self.index.get(agent_id).map(|&position| &self.agents[position])
    }

    /// Agent ids in catalog order.
    pub fn list_agents(&self) -> Vec<String> {
        self.agents.iter().map(|agent| agent.id.clone()).collect()
    }

    pub fn fallback(&self) -> &AgentConfig {
        &self.agents[self.fallback_index]
    }

    /// Defaults for `agent_id`, or the fallback agent's when unknown.
    pub fn resolve(&self, agent_id: &str) -> &AgentConfig {
        self.get_config(agent_id).unwrap_or_else(|| self.fallback())
    }

    pub fn default_prompt(&self, agent_id: &str) -> &str {
        &self.resolve(agent_id).prompt
    }
}
