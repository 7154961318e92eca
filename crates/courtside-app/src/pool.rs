// Worker pool sharded by player.
//
// Each shard is one tokio task draining its own mpsc queue, so events for the
// same player run strictly in submission order while different players run
// in parallel. A submitter gets a oneshot acknowledgement that resolves only
// after the event's rows are committed (or the event failed).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::NaiveDate;
use courtside_core::error::EngineError;
use courtside_core::facts::RawGameFact;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::engine::{Engine, FactEvent, Outcome};

const SHARD_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    Closed,

    #[error("{} events were not committed, for: {}", .players.len(), .players.join(", "))]
    Uncommitted { players: Vec<String> },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Resolves once the event has been applied or has failed.
pub type Ack = oneshot::Receiver<Result<Outcome, EngineError>>;

struct Job {
    event: FactEvent,
    ack: oneshot::Sender<Result<Outcome, EngineError>>,
}

/// Per-run totals from a batch of events.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub events: usize,
    pub rows_written: usize,
    pub ineligible: usize,
    /// Player of every event that failed, in submission order.
    pub failed: Vec<String>,
}

impl BatchReport {
    /// `Uncommitted` naming the players whose events failed, if any did.
    pub fn ensure_committed(&self) -> Result<(), PoolError> {
        if self.failed.is_empty() {
            return Ok(());
        }
        Err(PoolError::Uncommitted {
            players: self.failed.clone(),
        })
    }
}

/// Result of importing one day's box scores.
#[derive(Debug)]
pub struct ImportReport {
    /// Facts stored and submitted for recompute.
    pub stored: usize,
    pub rejected: Vec<EngineError>,
    pub batch: BatchReport,
}

pub struct WorkerPool {
    engine: Arc<Engine>,
    shards: Vec<mpsc::Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

/// Deterministic shard for a player.
pub fn shard_for(player: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    player.hash(&mut hasher);
    (hasher.finish() % shards.max(1) as u64) as usize
}

impl WorkerPool {
    /// Spawn `workers` shard tasks (at least one).
    pub fn start(engine: Arc<Engine>, workers: usize) -> Self {
        let workers = workers.max(1);
        let mut shards = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for shard in 0..workers {
            let (tx, rx) = mpsc::channel(SHARD_QUEUE_CAPACITY);
            shards.push(tx);
            handles.push(tokio::spawn(run_shard(shard, engine.clone(), rx)));
        }
        info!("Worker pool started with {} shards", workers);

        Self {
            engine,
            shards,
            handles,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn workers(&self) -> usize {
        self.shards.len()
    }

    /// Queue an event on its player's shard.
    pub async fn submit(&self, event: FactEvent) -> Result<Ack, PoolError> {
        let shard = shard_for(event.player(), self.shards.len());
        let (ack, rx) = oneshot::channel();
        self.shards[shard]
            .send(Job { event, ack })
            .await
            .map_err(|_| PoolError::Closed)?;
        Ok(rx)
    }

    /// Submit and wait for the outcome.
    pub async fn dispatch(&self, event: FactEvent) -> Result<Outcome, PoolError> {
        let ack = self.submit(event).await?;
        let outcome = ack.await.map_err(|_| PoolError::Closed)??;
        Ok(outcome)
    }

    /// Submit every event, then wait for all acknowledgements. Failures are
    /// counted, not fatal.
    pub async fn run_batch(&self, events: Vec<FactEvent>) -> Result<BatchReport, PoolError> {
        let mut acks = Vec::with_capacity(events.len());
        for event in events {
            let player = event.player().to_string();
            acks.push((player, self.submit(event).await?));
        }

        let mut report = BatchReport {
            events: acks.len(),
            ..Default::default()
        };
        for (player, ack) in acks {
            match ack.await.map_err(|_| PoolError::Closed)? {
                Ok(Outcome::Recomputed { rows, .. }) => report.rows_written += rows,
                Ok(Outcome::Ineligible) => report.ineligible += 1,
                Err(_) => report.failed.push(player),
            }
        }
        if !report.failed.is_empty() {
            warn!(
                "{} of {} events failed to commit",
                report.failed.len(),
                report.events
            );
        }
        Ok(report)
    }

    /// Store one day's box scores and recompute every player they touch.
    /// Rejected rows and failed events are reported, not returned as errors;
    /// check [`BatchReport::ensure_committed`] before treating the day as
    /// done.
    pub async fn import(
        &self,
        rows: Vec<RawGameFact>,
        game_date: NaiveDate,
    ) -> Result<ImportReport, PoolError> {
        let ingest = self.engine.ingest(rows, game_date)?;
        let stored = ingest.events.len();
        let batch = self.run_batch(ingest.events).await?;
        Ok(ImportReport {
            stored,
            rejected: ingest.rejected,
            batch,
        })
    }

    /// Reconciliation sweep: bring fact season tags back in line with the
    /// calendar, drop orphaned rows, then recompute every snapshot for every
    /// player with facts, optionally limited to one season.
    pub async fn rebuild(&self, season: Option<&str>) -> Result<BatchReport, PoolError> {
        self.engine.reconcile_seasons()?;
        let pairs = self
            .engine
            .db()
            .players_with_facts(season)
            .map_err(EngineError::from)?;
        info!(
            "Rebuilding averages for {} player-seasons{}",
            pairs.len(),
            season.map(|s| format!(" in {s}")).unwrap_or_default()
        );
        let events = pairs
            .into_iter()
            .map(|(player, season)| FactEvent::Reconcile { player, season })
            .collect();
        self.run_batch(events).await
    }

    /// Stop accepting events, let every shard drain its queue, then wait for
    /// the shard tasks to finish.
    pub async fn shutdown(self) {
        drop(self.shards);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker shard panicked: {}", e);
            }
        }
        info!("Worker pool shut down");
    }

    /// Stop immediately. Queued events are dropped; their submitters see
    /// `PoolError::Closed`. Safe because every recompute is total: the next
    /// event or a rebuild re-derives the same rows.
    pub fn abort(self) {
        for handle in &self.handles {
            handle.abort();
        }
        warn!("Worker pool aborted");
    }
}

async fn run_shard(shard: usize, engine: Arc<Engine>, mut rx: mpsc::Receiver<Job>) {
    while let Some(Job { event, ack }) = rx.recv().await {
        let player = event.player().to_string();
        let result = engine.process(event).await;
        if let Err(e) = &result {
            if e.is_rejection() {
                warn!("Shard {}: rejected event for {}: {}", shard, player, e);
            } else {
                error!("Shard {}: event for {} failed: {}", shard, player, e);
            }
        }
        // The submitter may have stopped waiting; the rows are committed anyway.
        let _ = ack.send(result);
    }
}
