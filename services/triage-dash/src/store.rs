// services/triage-dash/src/store.rs
//
// Synchronized state store: the single holder of the latest patients,
// resources and stats pulled from the backend

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use svckit::errors::DashError;
use svckit::metrics;
use svckit::types::{Patient, Resource, Stats};

use crate::gateway::TriageGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Patients,
    Resources,
    Stats,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Resources => "resources",
            Collection::Stats => "stats",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub collection: Collection,
    pub error: DashError,
}

/// Result of one refresh cycle across the three collections.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Complete,
    Partial { failed: Vec<FetchFailure> },
    Failed { failed: Vec<FetchFailure> },
}

impl RefreshOutcome {
    fn from_failures(failed: Vec<FetchFailure>) -> Self {
        match failed.len() {
            0 => RefreshOutcome::Complete,
            n if n < 3 => RefreshOutcome::Partial { failed },
            _ => RefreshOutcome::Failed { failed },
        }
    }

    pub fn failed(&self) -> &[FetchFailure] {
        match self {
            RefreshOutcome::Complete => &[],
            RefreshOutcome::Partial { failed } | RefreshOutcome::Failed { failed } => failed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Complete => "complete",
            RefreshOutcome::Partial { .. } => "partial",
            RefreshOutcome::Failed { .. } => "failed",
        }
    }

    /// True when at least one collection was updated.
    pub fn reached_backend(&self) -> bool {
        !matches!(self, RefreshOutcome::Failed { .. })
    }
}

/// Latest server-authoritative state. Each collection is replaced wholesale
/// by a successful fetch and left untouched by a failed one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub patients: Vec<Patient>,
    pub resources: Vec<Resource>,
    pub stats: Stats,
    pub last_refreshed: Option<DateTime<Local>>,
}

pub struct StateStore {
    gateway: Arc<dyn TriageGateway>,
    snapshot: RwLock<Snapshot>,
    refresh_lock: Mutex<()>,
    cycles: AtomicU64,
}

impl StateStore {
    pub fn new(gateway: Arc<dyn TriageGateway>) -> Self {
        Self {
            gateway,
            snapshot: RwLock::new(Snapshot::default()),
            refresh_lock: Mutex::new(()),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn TriageGateway> {
        &self.gateway
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    /// Run a refresh cycle, waiting for any cycle already in flight to finish
    /// first.
    pub async fn refresh(&self) -> RefreshOutcome {
        let _guard = self.refresh_lock.lock().await;
        self.run_cycle().await
    }

    /// Run a refresh cycle unless one is already in flight.
    pub async fn try_refresh(&self) -> Option<RefreshOutcome> {
        let _guard = self.refresh_lock.try_lock().ok()?;
        Some(self.run_cycle().await)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    /// Number of completed refresh cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    async fn run_cycle(&self) -> RefreshOutcome {
        let (patients, resources, stats) = tokio::join!(
            timed(Collection::Patients, self.gateway.fetch_patients()),
            timed(Collection::Resources, self.gateway.fetch_resources()),
            timed(Collection::Stats, self.gateway.fetch_stats()),
        );

        let mut failed = Vec::new();
        {
            let mut snapshot = self.snapshot.write().await;
            match patients {
                Ok(patients) => snapshot.patients = patients,
                Err(error) => failed.push(FetchFailure { collection: Collection::Patients, error }),
            }
            match resources {
                Ok(resources) => snapshot.resources = resources,
                Err(error) => failed.push(FetchFailure {
                    collection: Collection::Resources,
                    error,
                }),
            }
            match stats {
                Ok(stats) => snapshot.stats = stats,
                Err(error) => failed.push(FetchFailure { collection: Collection::Stats, error }),
            }
            if failed.len() < 3 {
                snapshot.last_refreshed = Some(Local::now());
            }
        }

        let outcome = RefreshOutcome::from_failures(failed);
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_refresh(outcome.label());

        match &outcome {
            RefreshOutcome::Complete => info!("Refresh cycle {} complete", cycle),
            RefreshOutcome::Partial { failed } => warn!(
                "Refresh cycle {} partial: {} stale",
                cycle,
                failed
                    .iter()
                    .map(|f| f.collection.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            RefreshOutcome::Failed { .. } => {
                warn!("Refresh cycle {} failed: backend unreachable", cycle)
            }
        }
        outcome
    }
}

async fn timed<T, F>(collection: Collection, fetch: F) -> Result<T, DashError>
where
    F: Future<Output = Result<T, DashError>>,
{
    let start = Instant::now();
    let result = fetch.await;
    metrics::record_fetch(collection.as_str(), result.is_ok(), start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        warn!("Failed to fetch {}: {}", collection, e);
    }
    result
}
