//! The polling scheduler: periodically re-fetches every subscribed source
//! and feeds the results to the reconciliation engine.
//!
//! One tick is: read the current subscription list, fetch and parse all
//! sources in parallel, wait for every outcome (a join barrier), reconcile
//! the successes, log and skip the failures. After the tick the scheduler
//! unconditionally re-arms for the configured interval; errors never stop
//! the loop. The only way out is the [`Shutdown`] handle.

use crate::config::Config;
use crate::error::FeedError;
use crate::feed::{fetch_document, parse_feed};
use crate::reconcile::SourceBatch;
use crate::state::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Handle that stops a running [`Poller`].
///
/// Dropping the handle does not stop the loop; call [`Shutdown::shutdown`].
#[derive(Clone)]
pub struct Shutdown(watch::Sender<bool>);

impl Shutdown {
    /// Request the poller to stop after its current tick.
    pub fn shutdown(&self) {
        let _ = self.0.send(true);
    }
}

/// Summary of one polling tick, mostly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Sources whose fetch+parse succeeded.
    pub succeeded: usize,
    /// Sources skipped this tick because fetch or parse failed.
    pub failed: usize,
    /// Entries newly merged by this tick.
    pub new_entries: usize,
}

/// The repeating fetch-all → reconcile → re-arm task.
pub struct Poller {
    store: Store,
    client: reqwest::Client,
    interval: Duration,
    request_timeout: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl Poller {
    /// Create a poller over `store` together with its [`Shutdown`] handle.
    pub fn new(store: Store, client: reqwest::Client, config: &Config) -> (Self, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                store,
                client,
                interval: config.poll_interval(),
                request_timeout: config.request_timeout(),
                shutdown_rx: rx,
            },
            Shutdown(tx),
        )
    }

    /// Run the polling loop until shutdown is requested.
    ///
    /// The first tick runs immediately; each subsequent tick starts one
    /// interval after the previous tick finished, regardless of whether it
    /// produced new entries or only errors. A subscription added while a
    /// tick is in flight is included from the next tick on.
    pub async fn run(mut self) {
        let interval_ms = self.interval.as_millis() as u64;
        tracing::info!(interval_ms, "Poller started");
        loop {
            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = wait_for_shutdown(&mut self.shutdown_rx) => {
                    tracing::info!("Poller stopped");
                    return;
                }
            }
        }
    }

    /// Execute a single polling tick.
    ///
    /// All sources are fetched concurrently; reconciliation is deferred
    /// until every outcome has resolved. A failure in one source never
    /// aborts the others: failures are logged per source and the tick
    /// proceeds with whatever succeeded.
    pub async fn tick(&self) -> TickReport {
        let subscriptions = self.store.subscriptions();
        if subscriptions.is_empty() {
            return TickReport {
                succeeded: 0,
                failed: 0,
                new_entries: 0,
            };
        }

        let fetches = subscriptions.iter().map(|url| {
            let client = self.client.clone();
            let timeout = self.request_timeout;
            async move {
                let result = fetch_source(&client, url, timeout).await;
                (Arc::clone(url), result)
            }
        });

        // join_all preserves input order, so batches arrive in subscription
        // order no matter which fetch completes first.
        let outcomes = futures::future::join_all(fetches).await;

        let mut batches = Vec::new();
        let mut failed = 0usize;
        for (url, result) in outcomes {
            match result {
                Ok(entries) => batches.push(SourceBatch {
                    subscription_url: url,
                    entries,
                }),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        source = %url,
                        kind = e.kind(),
                        error = %e,
                        "Source failed, skipping for this tick"
                    );
                }
            }
        }

        let succeeded = batches.len();
        let outcome = self.store.reconcile(batches);
        tracing::debug!(
            sources = subscriptions.len(),
            succeeded,
            failed,
            new_entries = outcome.new_entries.len(),
            total_entries = outcome.total_entries,
            "Poll tick complete"
        );

        TickReport {
            succeeded,
            failed,
            new_entries: outcome.new_entries.len(),
        }
    }
}

/// Resolve once shutdown is requested.
///
/// A dropped [`Shutdown`] handle means shutdown can never be requested, so
/// the future parks forever rather than resolving; the loop must keep its
/// normal cadence in that case.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        if *rx.borrow() {
            return;
        }
    }
}

async fn fetch_source(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<crate::feed::ParsedEntry>, FeedError> {
    let bytes = fetch_document(client, url, timeout).await?;
    let parsed = parse_feed(&bytes)?;
    Ok(parsed.entries)
}
