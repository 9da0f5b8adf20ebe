use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    /// Short name, without the owner prefix.
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    #[serde(default = "default_has_issues")]
    pub has_issues: bool,
}

fn default_has_issues() -> bool {
    true
}

/// An issue as returned by the GitHub issues endpoints.
///
/// Fields the builder needs but the API may leave out or null are optional
/// here, so that a malformed record surfaces as a build error for that one
/// issue instead of a decoding error for the whole page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub html_url: String,
    pub state: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
    /// Only present on the `/issues` endpoint.
    #[serde(default)]
    pub repository: Option<Repository>,
}

impl Issue {
    /// Name of the repository the issue lives in, without the owner.
    pub fn repository_name(&self) -> Option<&str> {
        if let Some(repo) = &self.repository {
            return Some(repo.name.as_str());
        }
        self.repository_url
            .as_deref()
            .and_then(|url| url.trim_end_matches('/').rsplit('/').next())
            .filter(|name| !name.is_empty())
    }

    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|label| label.name.clone()).collect()
    }
}
