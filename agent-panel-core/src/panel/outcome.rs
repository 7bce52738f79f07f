use serde::Serialize;

use crate::agents::types::KnowledgeSource;
use crate::error::Error;

/// How a change reached the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Saved,
    /// Backend unreachable; the change exists only in the panel (demo mode).
    SavedLocallyOnly { reason: String },
    /// Backend rejected the change.
    Failed { reason: String },
}

impl SyncOutcome {
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::Connectivity(reason) => Self::SavedLocallyOnly {
                reason: reason.clone(),
            },
            Error::Remote(reason) => Self::Failed {
                reason: reason.clone(),
            },
            other => Self::Failed {
                reason: other.to_string(),
            },
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }

    pub fn is_local_only(&self) -> bool {
        matches!(self, Self::SavedLocallyOnly { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LoadOutcome {
    Remote,
    DefaultsAfterRemoteError { error: String },
    DefaultsAfterConnectivityError { error: String },
    /// A newer load or a close superseded this one; nothing was applied.
    Stale,
}

/// Result of adding one knowledge source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeChange {
    /// The appended source; `None` when the backend rejected it.
    pub source: Option<KnowledgeSource>,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoveOutcome {
    Cancelled,
    NotFound,
    /// Removed locally; `backend` tells whether the backend followed.
    Removed {
        source: KnowledgeSource,
        backend: SyncOutcome,
    },
}

/// Identifies one in-flight configuration load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub agent_id: String,
    pub generation: u64,
}
