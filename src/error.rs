//! Error types for configuration, the GitHub API, and feed generation.

use std::path::PathBuf;

/// The configuration is unusable. Raised before any network access.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("missing configuration")]
    Absent,

    #[error("missing api_token (set it in the configuration or GITHUB_TOKEN)")]
    MissingToken,

    #[error("`{0}` must not be empty when present")]
    EmptyList(&'static str),

    #[error("invalid repository `{0}`, expected `owner/name`")]
    InvalidRepository(String),

    #[error("label names must not be empty")]
    EmptyLabel,

    #[error("invalid priority {priority} for label `{label}`, expected 1 to 9")]
    InvalidPriority { label: String, priority: u8 },

    #[error("cannot bind to {address}:{port}: {reason}")]
    BindAddress {
        address: String,
        port: u16,
        reason: String,
    },
}

/// Failure of a single GitHub API operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The named repository or label does not exist, or is not visible to
    /// the token.
    #[error("{0} not found")]
    NotFound(String),

    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: hyper::StatusCode,
        body: String,
    },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("could not parse response from {url}: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },

    #[error("API token is not a valid header value")]
    Token,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// An issue record could not be mapped to a to-do entry.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("issue #{number} has no {field}")]
    MissingField { number: u64, field: &'static str },

    #[error("issue #{number} has an invalid {field} timestamp `{value}`: {source}")]
    Timestamp {
        number: u64,
        field: &'static str,
        value: String,
        source: chrono::ParseError,
    },
}

/// Feed generation failed. No partial feed is produced.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("repository {0} not found")]
    UnknownRepository(String),

    #[error("error fetching GitHub data for {context}: {source}")]
    Fetch { context: String, source: ApiError },

    #[error("error parsing GitHub data for {context}: {source}")]
    Build { context: String, source: BuildError },
}

pub type Result<T, E = FeedError> = std::result::Result<T, E>;
