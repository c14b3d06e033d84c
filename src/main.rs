//! apodcache - mirror NASA's Astronomy Picture of the Day locally
//!
//! Fetches one record per day into a flat-file store, generates thumbnails
//! for image entries, and prints pages of the stored days.

use std::process::ExitCode;

use clap::Parser;
use futures::{pin_mut, StreamExt};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use apodcache::cli::{resolve_config, Cli, CliError, Command};
use apodcache::data::Picture;
use apodcache::store::{PictureStore, SyncSummary};

/// One entry of `page --json` output
#[derive(Serialize)]
struct PageEntry<'a> {
    date: String,
    picture: &'a Picture,
}

/// Installs the tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `-v` switches from info to debug.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "apodcache=debug"
    } else {
        "apodcache=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints one page of stored pictures
fn print_page(
    store: &PictureStore,
    page: usize,
    per_page: usize,
    json: bool,
) -> Result<(), CliError> {
    let pictures = store.paginate(page, per_page)?;

    if json {
        let entries: Vec<_> = pictures
            .iter()
            .map(|(date, picture)| PageEntry {
                date: date.to_string(),
                picture,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for (date, picture) in &pictures {
        println!(
            "{}  {:<6} {}",
            date,
            picture.media_type,
            picture.title().unwrap_or("(untitled)")
        );
        if let Some(thumbnail_url) = &picture.thumbnail_url {
            println!("            {}", thumbnail_url);
        }
    }

    Ok(())
}

/// Drives a full synchronization and prints the tally
async fn run_sync(store: &PictureStore, limit: Option<usize>) {
    let outcomes = store.synchronize(limit);
    pin_mut!(outcomes);

    let mut summary = SyncSummary::default();
    while let Some(outcome) = outcomes.next().await {
        summary.record(&outcome);
    }

    println!(
        "{} fetched, {} already stored, {} failed",
        summary.fetched, summary.skipped, summary.failed
    );
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = resolve_config(&cli)?;
    let store = PictureStore::from_config(config);

    match cli.command {
        Command::Page {
            page,
            per_page,
            json,
        } => print_page(&store, page, per_page, json)?,
        Command::Sync { limit } => run_sync(&store, limit).await,
        Command::Clear => {
            let removed = store.clear()?;
            println!("Removed {} files", removed);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("apodcache: {}", err);
            ExitCode::FAILURE
        }
    }
}
