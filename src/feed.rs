//! Assembly of the iCalendar feed.

use std::collections::HashSet;

use icalendar::{Calendar, Property};
use tracing::debug;

use crate::config::{Config, Strategy};
use crate::error::Result;
use crate::fetch;
use crate::github::IssueSource;
use crate::todo::TodoEntry;

pub const PRODUCT_ID: &str = "-//github-icalendar//GithubIssueFeed//EN";

/// The to-dos of one generation run.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub name: Option<String>,
    pub entries: Vec<TodoEntry>,
}

impl Feed {
    /// Fetches the issues `config` selects. The configuration is validated
    /// before the first request.
    pub async fn fetch(config: &Config, source: &dyn IssueSource) -> Result<Self> {
        config.validate()?;

        let entries = match config.strategy() {
            Strategy::LabelsInRepositories {
                repositories,
                labels,
            } => {
                debug!("Using configured repository and labels list");
                fetch::fetch_issues_by_labels_in(source, repositories, labels).await?
            }
            Strategy::Labels { labels } => {
                debug!("Using configured labels list");
                fetch::fetch_issues_by_labels(source, labels).await?
            }
            Strategy::Repositories { repositories } => {
                debug!("Using configured repository list");
                fetch::fetch_issues_by_repos(source, repositories).await?
            }
            Strategy::Unfiltered { filter } => {
                debug!("Fetching issues for all of the repositories and all labels");
                fetch::fetch_issues(source, filter).await?
            }
        };

        // An issue carrying several configured labels is found once per label.
        let mut seen = HashSet::new();
        Ok(Self {
            name: config.calendar_name.clone(),
            entries: entries
                .into_iter()
                .filter(|entry| seen.insert(entry.uid.clone()))
                .map(|entry| entry.with_label_rules(&config.label_rules))
                .collect(),
        })
    }

    pub fn to_calendar(&self) -> Calendar {
        let mut calendar = Calendar::new();
        if let Some(name) = &self.name {
            calendar.append_property(Property::new("X-WR-CALNAME", name));
        }
        for entry in &self.entries {
            calendar.push(entry.to_icalendar());
        }
        calendar.done()
    }

    /// Serializes the feed with `\n` line endings and no surrounding
    /// whitespace.
    pub fn render(&self) -> String {
        let ics = self.to_calendar().to_string();
        let mut output = String::with_capacity(ics.len());
        for line in ics.lines() {
            if line.starts_with("PRODID:") {
                output.push_str("PRODID:");
                output.push_str(PRODUCT_ID);
            } else {
                output.push_str(line);
            }
            output.push('\n');
        }
        output.trim().to_string()
    }
}

/// Runs one full generation: fetch, assemble, serialize.
pub async fn generate(config: &Config, source: &dyn IssueSource) -> Result<String> {
    let feed = Feed::fetch(config, source).await?;
    debug!(entries = feed.entries.len(), "feed assembled");
    Ok(feed.render())
}
