//! In-memory issue tracker shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::{self, BoxFuture, FutureExt};

use crate::config::IssueFilter;
use crate::error::ApiError;
use crate::github::IssueSource;
use crate::model::{Issue, Label, Repository};

/// An open issue of `full_name` shaped like the `/repos/{repo}/issues`
/// endpoint returns it.
pub(crate) fn issue(full_name: &str, id: u64, number: u64, labels: &[&str]) -> Issue {
    let labels: Vec<_> = labels
        .iter()
        .map(|name| serde_json::json!({ "name": name, "color": "ededed" }))
        .collect();
    serde_json::from_value(serde_json::json!({
        "id": id,
        "number": number,
        "html_url": format!("https://github.com/{}/issues/{}", full_name, number),
        "state": "open",
        "title": format!("Issue {}", number),
        "body": format!("Body of issue {}", number),
        "user": { "login": "reporter", "id": 42 },
        "labels": labels,
        "created_at": "2015-06-01T10:00:00Z",
        "updated_at": "2015-06-02T11:30:00Z",
        "repository_url": format!("https://api.github.com/repos/{}", full_name),
    }))
    .expect("valid issue fixture")
}

pub(crate) fn repository(full_name: &str, id: u64) -> Repository {
    let name = full_name.split_once('/').map_or(full_name, |(_, name)| name);
    Repository {
        id,
        name: name.to_string(),
        full_name: full_name.to_string(),
        has_issues: true,
    }
}

#[derive(Default)]
pub(crate) struct FakeSource {
    repositories: Vec<Repository>,
    labels: HashMap<String, Vec<String>>,
    issues: HashMap<String, Vec<Issue>>,
    user_issues: Vec<Issue>,
    failing: Option<String>,
    requests: Mutex<Vec<String>>,
}

impl FakeSource {
    /// Adds an accessible repository defining `labels`, holding `issues`.
    pub(crate) fn with_repository(mut self, full_name: &str, labels: &[&str], issues: Vec<Issue>) -> Self {
        let id = self.repositories.len() as u64 + 1;
        self.repositories.push(repository(full_name, id));
        self.labels.insert(
            full_name.to_string(),
            labels.iter().map(|label| label.to_string()).collect(),
        );
        self.issues.insert(full_name.to_string(), issues);
        self
    }

    pub(crate) fn without_issue_tracking(mut self, full_name: &str) -> Self {
        for repo in &mut self.repositories {
            if repo.full_name == full_name {
                repo.has_issues = false;
            }
        }
        self
    }

    pub(crate) fn with_user_issues(mut self, issues: Vec<Issue>) -> Self {
        self.user_issues = issues;
        self
    }

    /// Makes every request whose description starts with `request` fail
    /// with a server error.
    pub(crate) fn failing_on(mut self, request: &str) -> Self {
        self.failing = Some(request.to_string());
        self
    }

    /// Descriptions of the requests made so far, in order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn record(&self, request: String) -> Result<(), ApiError> {
        self.requests.lock().expect("requests lock").push(request.clone());
        match &self.failing {
            Some(prefix) if request.starts_with(prefix.as_str()) => Err(ApiError::Status {
                url: request,
                status: hyper::StatusCode::BAD_GATEWAY,
                body: "upstream unavailable".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn find(&self, full_name: &str) -> Result<Repository, ApiError> {
        self.repositories
            .iter()
            .find(|repo| repo.full_name == full_name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("repository {}", full_name)))
    }
}

impl IssueSource for FakeSource {
    fn repository<'a>(&'a self, full_name: &'a str) -> BoxFuture<'a, Result<Repository, ApiError>> {
        let result = self
            .record(format!("repository {}", full_name))
            .and_then(|()| self.find(full_name));
        future::ready(result).boxed()
    }

    fn label<'a>(
        &'a self,
        repository: &'a Repository,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Label, ApiError>> {
        let result = self
            .record(format!("label {} {}", repository.full_name, name))
            .and_then(|()| {
                let defined = self
                    .labels
                    .get(&repository.full_name)
                    .is_some_and(|labels| labels.iter().any(|label| label == name));
                if defined {
                    Ok(Label {
                        name: name.to_string(),
                        color: None,
                    })
                } else {
                    Err(ApiError::NotFound(format!(
                        "label {} in {}",
                        name, repository.full_name
                    )))
                }
            });
        future::ready(result).boxed()
    }

    fn repository_issues<'a>(
        &'a self,
        repository: &'a Repository,
        label: Option<&'a Label>,
    ) -> BoxFuture<'a, Result<Vec<Issue>, ApiError>> {
        let request = match label {
            Some(label) => format!("issues {} {}", repository.full_name, label.name),
            None => format!("issues {}", repository.full_name),
        };
        let result = self.record(request).map(|()| {
            self.issues
                .get(&repository.full_name)
                .into_iter()
                .flatten()
                .filter(|issue| {
                    label.map_or(true, |label| {
                        issue.labels.iter().any(|carried| carried.name == label.name)
                    })
                })
                .cloned()
                .collect::<Vec<_>>()
        });
        future::ready(result).boxed()
    }

    fn user_repositories(&self) -> BoxFuture<'_, Result<Vec<Repository>, ApiError>> {
        let result = self
            .record("user_repositories".to_string())
            .map(|()| self.repositories.clone());
        future::ready(result).boxed()
    }

    fn user_issues(&self, filter: IssueFilter) -> BoxFuture<'_, Result<Vec<Issue>, ApiError>> {
        let result = self
            .record(format!("user_issues {}", filter))
            .map(|()| self.user_issues.clone());
        future::ready(result).boxed()
    }
}
