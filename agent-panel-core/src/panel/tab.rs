use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigTab {
    #[default]
    General,
    Prompt,
    Model,
    Knowledge,
}

impl FromStr for ConfigTab {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "prompt" => Ok(Self::Prompt),
            "model" => Ok(Self::Model),
            "knowledge" => Ok(Self::Knowledge),
            other => Err(Error::Validation(format!("unknown tab '{other}'"))),
        }
    }
}

impl std::fmt::Display for ConfigTab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Prompt => write!(f, "prompt"),
            Self::Model => write!(f, "model"),
            Self::Knowledge => write!(f, "knowledge"),
        }
    }
}
