//! Error types for the synchronization core.
//!
//! Every failure is local to one sync cycle: the frame loop logs it, keeps
//! the previous state, and carries on.

use std::time::Duration;

use city_events::{AgentId, AgentKind};

/// A fetch from the remote simulation did not produce a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not a valid snapshot.
    #[error("malformed snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    /// No answer within the request deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}

/// Create/update protocol violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// An update referenced an id that was never created.
    #[error("no {kind} with id {id} in the registry")]
    UnknownId { kind: AgentKind, id: AgentId },

    /// A create reused an id that already exists.
    #[error("{kind} with id {id} already exists")]
    DuplicateId { kind: AgentKind, id: AgentId },
}

/// Anything that can go wrong in one sync cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// `initialize` was called after the init fetch was already issued.
    #[error("sync manager is already initialized")]
    AlreadyInitialized,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing TOML config
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Error writing TOML config
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
