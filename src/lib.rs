//! Render GitHub issues as an iCalendar feed of to-do items.
//!
//! Which issues end up in the feed depends on the shape of the
//! [`Config`](config::Config):
//!
//! | `labels` | `repositories` | issues                                            |
//! |----------|----------------|---------------------------------------------------|
//! | yes      | yes            | carrying a label, in the listed repositories      |
//! | yes      | no             | carrying a label, in every accessible repository  |
//! | no       | yes            | all open issues of the listed repositories        |
//! | no       | no             | all open issues selected by `filter`              |
//!
//! ```no_run
//! use github_icalendar::{config::Config, feed, github::Github};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load("github-icalendar.yaml")?;
//! let github = Github::new(&config.api_endpoint, config.api_token()?)?;
//! println!("{}", feed::generate(&config, &github).await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod github;
pub mod model;
pub mod server;
pub mod todo;

#[cfg(test)]
pub(crate) mod test_utils;
