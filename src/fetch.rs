//! Issue fetching strategies.
//!
//! Each strategy yields to-dos in the order GitHub returns the issues and
//! fails as a whole if any lookup or any single issue fails.

use std::slice;

use tracing::{debug, warn};

use crate::config::{IssueFilter, LabelEntry, RepositoryEntry};
use crate::error::{ApiError, FeedError, Result};
use crate::github::IssueSource;
use crate::model::{Issue, Label, Repository};
use crate::todo::{build_todo, TodoEntry};

/// Outcome of looking up an object that is allowed to be absent.
enum Lookup<T> {
    Found(T),
    Missing,
}

async fn lookup_label(
    source: &dyn IssueSource,
    repository: &Repository,
    name: &str,
) -> Result<Lookup<Label>, ApiError> {
    match source.label(repository, name).await {
        Ok(label) => Ok(Lookup::Found(label)),
        Err(err) if err.is_not_found() => Ok(Lookup::Missing),
        Err(err) => Err(err),
    }
}

/// Resolves a configured repository. Unlike labels, a configured repository
/// has to exist.
async fn resolve_repository(source: &dyn IssueSource, full_name: &str) -> Result<Repository> {
    match source.repository(full_name).await {
        Ok(repository) => Ok(repository),
        Err(err) if err.is_not_found() => Err(FeedError::UnknownRepository(full_name.to_string())),
        Err(source) => Err(FeedError::Fetch {
            context: full_name.to_string(),
            source,
        }),
    }
}

fn build_all(issues: &[Issue], repo_title: Option<&str>, context: &str) -> Result<Vec<TodoEntry>> {
    issues
        .iter()
        .map(|issue| {
            build_todo(issue, repo_title).map_err(|source| FeedError::Build {
                context: context.to_string(),
                source,
            })
        })
        .collect()
}

/// Issues carrying `label_name` in each of `repositories` that tracks issues
/// and defines the label. Repositories without the label are skipped.
pub async fn fetch_issues_by_label(
    source: &dyn IssueSource,
    label_name: &str,
    repositories: &[Repository],
) -> Result<Vec<TodoEntry>> {
    let mut items = Vec::new();
    for repository in repositories {
        if !repository.has_issues {
            debug!(repository = %repository.full_name, "issues disabled, skipping");
            continue;
        }
        let context = || format!("{} in {}", label_name, repository.full_name);
        let label = match lookup_label(source, repository, label_name).await {
            Ok(Lookup::Found(label)) => label,
            Ok(Lookup::Missing) => continue,
            Err(source) => {
                return Err(FeedError::Fetch {
                    context: context(),
                    source,
                })
            }
        };
        let issues = source
            .repository_issues(repository, Some(&label))
            .await
            .map_err(|source| FeedError::Fetch {
                context: context(),
                source,
            })?;
        items.extend(build_all(&issues, None, &context())?);
    }
    debug!(label = label_name, "Found {} items", items.len());
    Ok(items)
}

/// Issues carrying any of `labels`, across every repository the token can
/// access. The repository list is fetched once and reused for every label.
pub async fn fetch_issues_by_labels(
    source: &dyn IssueSource,
    labels: &[LabelEntry],
) -> Result<Vec<TodoEntry>> {
    let repositories = source
        .user_repositories()
        .await
        .map_err(|source| FeedError::Fetch {
            context: "accessible repositories".to_string(),
            source,
        })?;
    let mut items = Vec::new();
    for label in labels {
        debug!(label = %label.label, "trying label");
        items.extend(fetch_issues_by_label(source, &label.label, &repositories).await?);
    }
    Ok(items)
}

/// Issues carrying any of `labels` within the configured repositories only.
/// Every repository is queried once per label.
pub async fn fetch_issues_by_labels_in(
    source: &dyn IssueSource,
    repositories: &[RepositoryEntry],
    labels: &[LabelEntry],
) -> Result<Vec<TodoEntry>> {
    let mut items = Vec::new();
    for entry in repositories {
        debug!(repository = %entry.repository, "trying repository");
        let repository = resolve_repository(source, &entry.repository).await?;
        for label in labels {
            debug!(label = %label.label, "trying label");
            items.extend(
                fetch_issues_by_label(source, &label.label, slice::from_ref(&repository)).await?,
            );
        }
    }
    Ok(items)
}

/// All open issues of one configured repository, titled with its short name.
pub async fn fetch_issues_by_repo(
    source: &dyn IssueSource,
    entry: &RepositoryEntry,
) -> Result<Vec<TodoEntry>> {
    let repository = resolve_repository(source, &entry.repository).await?;
    if !repository.has_issues {
        warn!(repository = %entry.repository, "issues are disabled for this repository");
        return Ok(Vec::new());
    }
    let issues = source
        .repository_issues(&repository, None)
        .await
        .map_err(|source| FeedError::Fetch {
            context: entry.repository.clone(),
            source,
        })?;
    let items = build_all(&issues, Some(entry.short_name()), &entry.repository)?;
    debug!(repository = %entry.repository, "Found {} items", items.len());
    Ok(items)
}

pub async fn fetch_issues_by_repos(
    source: &dyn IssueSource,
    repositories: &[RepositoryEntry],
) -> Result<Vec<TodoEntry>> {
    let mut items = Vec::new();
    for entry in repositories {
        debug!(repository = %entry.repository, "trying repository");
        items.extend(fetch_issues_by_repo(source, entry).await?);
    }
    Ok(items)
}

/// All open issues `filter` selects for the authenticated user.
pub async fn fetch_issues(source: &dyn IssueSource, filter: IssueFilter) -> Result<Vec<TodoEntry>> {
    let context = format!("issues of the authenticated user (filter {})", filter);
    let issues = source
        .user_issues(filter)
        .await
        .map_err(|source| FeedError::Fetch {
            context: context.clone(),
            source,
        })?;
    let items = build_all(&issues, None, &context)?;
    debug!(%filter, "Found {} items", items.len());
    Ok(items)
}
