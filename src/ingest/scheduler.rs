// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ingest::dedup::DedupLedger;
use crate::ingest::types::SourceProvider;
use crate::ingest::CyclePolicy;
use crate::occupancy::OccupancyService;
use crate::store::ConversationStore;

/// Timeline marker for items accepted by the social loop.
pub const SOCIAL_MARKER: &str = "[INTEL]";
/// Timeline marker for items accepted by the RSS loop.
pub const RSS_MARKER: &str = "[RSS]";

/// Spawn one supervised ingestion loop. The loop owns its providers and its
/// private fingerprint ledger, runs a cycle per tick, and honors the shutdown
/// signal between cycles. A failing cycle is logged and never kills the task.
pub fn spawn_ingest_loop(
    name: &'static str,
    interval: Duration,
    providers: Vec<Box<dyn SourceProvider>>,
    policy: CyclePolicy,
    marker: &'static str,
    ledger_capacity: usize,
    store: Arc<ConversationStore>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(target: "ingest", loop_name = name, "polling started");
        let mut ledger = DedupLedger::with_capacity(ledger_capacity);
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!(target: "ingest", loop_name = name, "shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome =
                        crate::ingest::run_cycle(&providers, policy, marker, &mut ledger, &store)
                            .await;
                    tracing::info!(
                        target: "ingest",
                        loop_name = name,
                        fetched = outcome.fetched,
                        deduped = outcome.deduped,
                        appended = outcome.appended,
                        "ingest tick"
                    );
                }
            }
        }
    })
}

/// Spawn the occupancy refresh loop; each tick recomputes the cached index.
pub fn spawn_occupancy_loop(
    interval: Duration,
    service: Arc<OccupancyService>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(target: "ingest", loop_name = "occupancy", "polling started");
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!(target: "ingest", loop_name = "occupancy", "shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let readings = service.refresh().await;
                    tracing::info!(
                        target: "ingest",
                        loop_name = "occupancy",
                        targets = readings.len(),
                        "occupancy tick"
                    );
                }
            }
        }
    })
}
