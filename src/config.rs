//! Feed configuration.
//!
//! The configuration is a YAML document:
//!
//! ```yaml
//! api_token: ghp_xxx
//! repositories:
//!   - repository: acme/widgets
//! labels:
//!   - label: bug
//! filter: all
//! bind_address: 127.0.0.1
//! bind_port: 5000
//! ```
//!
//! Which of `repositories` and `labels` are present selects how issues are
//! fetched, see [`Config::strategy`].

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.github.com";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_BIND_PORT: u16 = 5000;
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryEntry {
    /// `owner/name`
    pub repository: String,
}

impl RepositoryEntry {
    /// The repository name without the owning account.
    pub fn short_name(&self) -> &str {
        self.repository
            .split_once('/')
            .map_or(self.repository.as_str(), |(_, name)| name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelEntry {
    pub label: String,
}

/// Extra calendar properties for to-dos carrying a given label.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelRule {
    pub label: String,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Scope of the unfiltered query, as understood by GitHub's `/issues`
/// endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueFilter {
    Assigned,
    Created,
    Mentioned,
    Subscribed,
    Repos,
    #[default]
    All,
}

impl fmt::Display for IssueFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IssueFilter::Assigned => write!(f, "assigned"),
            IssueFilter::Created => write!(f, "created"),
            IssueFilter::Mentioned => write!(f, "mentioned"),
            IssueFilter::Subscribed => write!(f, "subscribed"),
            IssueFilter::Repos => write!(f, "repos"),
            IssueFilter::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    #[serde(default)]
    pub repositories: Option<Vec<RepositoryEntry>>,
    #[serde(default)]
    pub labels: Option<Vec<LabelEntry>>,
    #[serde(default)]
    pub filter: IssueFilter,
    #[serde(default)]
    pub calendar_name: Option<String>,
    #[serde(default)]
    pub label_rules: Vec<LabelRule>,
    #[serde(default)]
    pub bind_address: Option<String>,
    #[serde(default)]
    pub bind_port: Option<u16>,
}

fn default_api_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

/// The fetch strategy selected by the shape of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy<'a> {
    /// Issues with any of `labels`, within `repositories` only.
    LabelsInRepositories {
        repositories: &'a [RepositoryEntry],
        labels: &'a [LabelEntry],
    },
    /// Issues with any of `labels`, in every accessible repository.
    Labels { labels: &'a [LabelEntry] },
    /// All open issues of `repositories`.
    Repositories { repositories: &'a [RepositoryEntry] },
    /// All open issues selected by `filter` for the authenticated user.
    Unfiltered { filter: IssueFilter },
}

impl Config {
    /// Reads and validates the configuration at `path`.
    ///
    /// A missing `api_token` is taken from `GITHUB_TOKEN`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&text)?;
        if config.api_token.is_none() {
            config.api_token = std::env::var(TOKEN_ENV_VAR).ok();
        }
        config.validate()?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parses a YAML document without validating it.
    ///
    /// An empty document yields [`ConfigError::Absent`].
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Option<Config> = serde_yaml::from_str(text)?;
        config.ok_or(ConfigError::Absent)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.api_token.as_deref() {
            Some(token) if !token.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingToken),
        }

        if let Some(repositories) = &self.repositories {
            if repositories.is_empty() {
                return Err(ConfigError::EmptyList("repositories"));
            }
            for entry in repositories {
                match entry.repository.split_once('/') {
                    Some((owner, name))
                        if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {}
                    _ => return Err(ConfigError::InvalidRepository(entry.repository.clone())),
                }
            }
        }

        if let Some(labels) = &self.labels {
            if labels.is_empty() {
                return Err(ConfigError::EmptyList("labels"));
            }
            if labels.iter().any(|entry| entry.label.is_empty()) {
                return Err(ConfigError::EmptyLabel);
            }
        }

        for rule in &self.label_rules {
            if rule.label.is_empty() {
                return Err(ConfigError::EmptyLabel);
            }
            if let Some(priority) = rule.priority {
                if !(1..=9).contains(&priority) {
                    return Err(ConfigError::InvalidPriority {
                        label: rule.label.clone(),
                        priority,
                    });
                }
            }
        }

        Ok(())
    }

    pub fn api_token(&self) -> Result<&str, ConfigError> {
        self.api_token.as_deref().ok_or(ConfigError::MissingToken)
    }

    pub fn strategy(&self) -> Strategy<'_> {
        match (self.labels.as_deref(), self.repositories.as_deref()) {
            (Some(labels), Some(repositories)) => Strategy::LabelsInRepositories {
                repositories,
                labels,
            },
            (Some(labels), None) => Strategy::Labels { labels },
            (None, Some(repositories)) => Strategy::Repositories { repositories },
            (None, None) => Strategy::Unfiltered {
                filter: self.filter,
            },
        }
    }

    /// The address to listen on in served mode.
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let address = self
            .bind_address
            .clone()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let port = self.bind_port.unwrap_or(DEFAULT_BIND_PORT);
        let error = |reason: String| ConfigError::BindAddress {
            address: address.clone(),
            port,
            reason,
        };
        (address.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| error(e.to_string()))?
            .next()
            .ok_or_else(|| error("address did not resolve".to_string()))
    }
}
