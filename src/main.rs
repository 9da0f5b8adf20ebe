use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use github_icalendar::config::Config;
use github_icalendar::feed;
use github_icalendar::github::Github;
use github_icalendar::server::{self, Feeds};

#[derive(FromArgs)]
/// Render GitHub issues as an iCalendar feed of to-do items.
///
/// The API token is read from the configuration file or from the
/// GITHUB_TOKEN environment variable (a .env file is honored).
struct Args {
    /// path to the YAML configuration file
    #[argh(positional)]
    config: Option<PathBuf>,

    /// serve the feed over HTTP instead of printing it once
    #[argh(switch)]
    web: bool,

    /// enable verbose diagnostic logging
    #[argh(switch)]
    debug: bool,

    /// show version
    #[argh(switch)]
    version: bool,
}

fn setup_logging(debug: bool) {
    let default = if debug {
        "info,github_icalendar=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "cannot listen for Ctrl-C");
        return;
    }
    info!("shutting down");
}

fn run(args: Args) -> Result<()> {
    dotenv::dotenv().ok();

    let path = args
        .config
        .context("missing configuration file argument, see --help")?;
    let config = Config::load(&path)
        .with_context(|| format!("could not load configuration from {}", path.display()))?;
    info!("Config loaded");

    let github = Github::new(&config.api_endpoint, config.api_token()?)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    if args.web {
        let addr = config.bind_address()?;
        let feeds = Feeds::new(config, Arc::new(github));
        runtime.block_on(server::serve(addr, feeds, shutdown_signal()))?;
    } else {
        let ics = runtime
            .block_on(feed::generate(&config, &github))
            .context("feed generation failed")?;
        println!("{}", ics);
    }

    Ok(())
}

fn main() {
    let args: Args = argh::from_env();
    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return;
    }
    setup_logging(args.debug);

    if let Err(ref e) = run(args) {
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("Caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
