//! Mapping of GitHub issues to calendar to-dos.

use chrono::{DateTime, Utc};
use icalendar::{Component, Property, TodoStatus};

use crate::config::LabelRule;
use crate::error::BuildError;
use crate::model::Issue;

/// Namespace of the synthetic identifiers derived from issues and users.
pub const TRACKER_DOMAIN: &str = "github.com";

const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Only open issues are fetched, so every to-do still needs action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NeedsAction,
}

impl From<Status> for TodoStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::NeedsAction => TodoStatus::NeedsAction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoEntry {
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    pub url: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub status: Status,
    pub organizer: String,
    pub labels: Vec<String>,
    pub priority: Option<u8>,
    pub categories: Vec<String>,
}

/// Issue numbers are only unique within a repository, ids are global.
pub fn make_uid(issue: &Issue) -> String {
    format!("{}-{}.issue.{}", issue.number, issue.id, TRACKER_DOMAIN)
}

pub fn make_title(repo_title: &str, issue: &Issue) -> String {
    format!(
        "{} #{}: {}",
        repo_title,
        issue.number,
        normalize_newlines(&issue.title)
    )
}

/// GitHub stores text with CRLF line breaks. A CR left in a TEXT value ends
/// up as a raw control byte in the content line, so only LF is kept.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn make_reporter(login: &str) -> String {
    format!("{}@users.{}", login, TRACKER_DOMAIN)
}

fn parse_timestamp(
    issue: &Issue,
    field: &'static str,
    value: Option<&str>,
) -> Result<DateTime<Utc>, BuildError> {
    let value = value.ok_or(BuildError::MissingField {
        number: issue.number,
        field,
    })?;
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|source| BuildError::Timestamp {
            number: issue.number,
            field,
            value: value.to_string(),
            source,
        })
}

/// Builds the to-do for `issue`.
///
/// `repo_title` prefixes the summary; without it the name of the issue's own
/// repository is used.
pub fn build_todo(issue: &Issue, repo_title: Option<&str>) -> Result<TodoEntry, BuildError> {
    let missing = |field| BuildError::MissingField {
        number: issue.number,
        field,
    };
    let repo_title = match repo_title {
        Some(title) => title,
        None => issue.repository_name().ok_or_else(|| missing("repository"))?,
    };
    let user = issue.user.as_ref().ok_or_else(|| missing("user"))?;

    Ok(TodoEntry {
        uid: make_uid(issue),
        summary: make_title(repo_title, issue),
        description: issue.body.as_deref().map(normalize_newlines),
        url: issue.html_url.clone(),
        created: parse_timestamp(issue, "created_at", issue.created_at.as_deref())?,
        last_modified: parse_timestamp(issue, "updated_at", issue.updated_at.as_deref())?,
        status: Status::NeedsAction,
        organizer: make_reporter(&user.login),
        labels: issue.label_names(),
        priority: None,
        categories: Vec::new(),
    })
}

impl TodoEntry {
    /// Applies the rules whose label the to-do carries, in rule order. The
    /// first matching priority wins; categories accumulate without repeats.
    pub fn with_label_rules(mut self, rules: &[LabelRule]) -> Self {
        for rule in rules.iter().filter(|rule| self.labels.contains(&rule.label)) {
            if self.priority.is_none() {
                self.priority = rule.priority;
            }
            if let Some(category) = &rule.category {
                if !self.categories.contains(category) {
                    self.categories.push(category.clone());
                }
            }
        }
        self
    }

    pub fn to_icalendar(&self) -> icalendar::Todo {
        let mut todo = icalendar::Todo::new();
        todo.uid(&self.uid);
        // DTSTAMP is required; the last update keeps the feed reproducible.
        todo.add_property("DTSTAMP", self.last_modified.format(DATE_TIME_FORMAT).to_string());
        todo.summary(&self.summary);
        if let Some(description) = &self.description {
            todo.description(description);
        }
        todo.add_property("URL", &self.url);
        todo.add_property("CREATED", self.created.format(DATE_TIME_FORMAT).to_string());
        todo.add_property(
            "LAST-MODIFIED",
            self.last_modified.format(DATE_TIME_FORMAT).to_string(),
        );
        todo.status(self.status.into());
        todo.add_property("ORGANIZER", format!("mailto:{}", self.organizer));
        if let Some(priority) = self.priority {
            todo.add_property("PRIORITY", priority.to_string());
        }
        for category in self.labels.iter().chain(&self.categories) {
            todo.append_multi_property(Property::new("CATEGORIES", category));
        }
        todo.done()
    }
}
