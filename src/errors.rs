//! Typed error hierarchy for the taskboard client.
//!
//! Three top-level enums cover the three external seams:
//! - `RemoteError`: data API calls (select/insert/update/delete/upsert)
//! - `AuthError`: session retrieval, sign-in, sign-up, sign-out
//! - `ConfigError`: missing or malformed startup configuration

use thiserror::Error;

use crate::remote::Table;

/// Errors from the remote data API.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Request to data API failed: {0}")]
    Transport(String),

    #[error("Failed to decode {table} row: {message}")]
    Decode { table: Table, message: String },

    #[error("Failed to encode {table} payload: {message}")]
    Encode { table: Table, message: String },

    #[error("No {table} row matched id {id}")]
    NotFound { table: Table, id: String },

    #[error("Not signed in")]
    Unauthenticated,

    #[error("No position left at the end of {table}; reorder items to lower positions first")]
    PositionExhausted { table: Table },
}

impl RemoteError {
    pub fn decode(table: Table, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            table,
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Errors from the auth API and session handling.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Request to auth API failed: {0}")]
    Transport(String),

    #[error("Failed to decode auth response: {0}")]
    Decode(String),

    #[error("No active session")]
    NoSession,

    #[error("Failed to access session file at {path}: {source}")]
    SessionFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Errors raised while loading startup configuration. These are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {name}")]
    Missing { name: &'static str },

    #[error("Invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}
