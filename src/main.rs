use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use steep::{Aggregator, ChangeKind, Config, Poller};
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(name = "steep", about = "In-memory feed aggregator: subscribe, poll, reconcile")]
struct Args {
    /// Feed URLs to subscribe to at startup
    urls: Vec<String>,

    /// Path to a TOML config file (default: ~/.config/steep/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the polling interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("steep")
            .join("config.toml"),
    )
}

/// Log every change notification with enough context to follow along.
///
/// Stands in for the presentation layer: a real consumer would re-render
/// the facet named by the notification from a fresh snapshot.
async fn watch_changes(aggregator: Aggregator) {
    let mut rx = aggregator.subscribe_changes();
    loop {
        match rx.recv().await {
            Ok(change) => {
                let snapshot = aggregator.snapshot();
                match change {
                    ChangeKind::Form => {
                        tracing::info!(status = ?snapshot.form.status, "Form changed");
                    }
                    ChangeKind::Subscriptions => {
                        tracing::info!(count = snapshot.subscriptions.len(), "Subscriptions changed");
                    }
                    ChangeKind::Feeds => {
                        tracing::info!(count = snapshot.feeds.len(), "Feeds changed");
                    }
                    ChangeKind::Entries => {
                        let unread = snapshot
                            .entries
                            .iter()
                            .filter(|e| !snapshot.read_links.contains(&e.link))
                            .count();
                        if let Some(latest) = snapshot.entries.first() {
                            tracing::info!(
                                total = snapshot.entries.len(),
                                unread,
                                latest = %latest.title,
                                "Entries changed"
                            );
                        }
                    }
                    ChangeKind::ReadLinks => {
                        tracing::info!(read = snapshot.read_links.len(), "Read set changed");
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "Change stream lagged, re-snapshotting");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steep=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match args.config.clone().or_else(default_config_path) {
        Some(path) => Config::load(&path).context("Failed to load configuration")?,
        None => Config::default(),
    };
    if let Some(interval_ms) = args.interval_ms {
        config.poll_interval_ms = interval_ms;
    }

    let aggregator = Aggregator::new(&config).context("Failed to create aggregator")?;

    let _watcher = tokio::spawn(watch_changes(aggregator.clone()));

    for url in &args.urls {
        match aggregator.submit_new_subscription(url).await {
            Ok(feed) => println!("Subscribed: {} ({})", feed.title, url),
            Err(e) => eprintln!("Skipping {url}: {e}"),
        }
    }

    let (poller, shutdown) = Poller::new(
        aggregator.store().clone(),
        aggregator.client().clone(),
        &config,
    );
    let poller_task = tokio::spawn(poller.run());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");
    shutdown.shutdown();
    poller_task.await.context("Poller task panicked")?;

    Ok(())
}
