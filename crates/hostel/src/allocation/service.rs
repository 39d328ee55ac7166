use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::directory::{DirectoryStore, FetchError, PersistError};
use super::domain::{AllocationContext, AssignmentProposal, OccupantId};
use super::matcher::{plan_assignments, SnapshotOrder};

/// Knobs for a [`RoomAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorSettings {
    /// Upper bound for each store round trip.
    pub store_timeout: Duration,
    pub snapshot_order: SnapshotOrder,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            snapshot_order: SnapshotOrder::ById,
        }
    }
}

/// Result of a run whose batch write succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationReport {
    pub assigned_count: usize,
    pub considered: usize,
    pub assignments: Vec<AssignmentProposal>,
    pub unplaced: Vec<OccupantId>,
    pub completed_at: DateTime<Utc>,
}

/// The value handed back to whoever triggered the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationOutcome {
    pub assigned_count: usize,
    pub failure_reason: Option<String>,
}

impl AllocationOutcome {
    /// Failed runs always report zero: writes are atomic, so nothing was placed.
    pub fn from_result(result: &Result<AllocationReport, AllocationError>) -> Self {
        match result {
            Ok(report) => Self {
                assigned_count: report.assigned_count,
                failure_reason: None,
            },
            Err(err) => Self {
                assigned_count: 0,
                failure_reason: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("room allocation requires an administrator")]
    Unauthorized,
    #[error("another allocation run is already in progress")]
    RunInProgress,
    #[error("could not read directory snapshot: {0}")]
    Fetch(#[from] FetchError),
    #[error("could not save assignments: {0}")]
    Persist(#[from] PersistError),
}

/// Runs the greedy allocation against a directory store.
///
/// Only one run per allocator is active at a time; a second caller gets
/// [`AllocationError::RunInProgress`] instead of racing the first on the same rooms.
pub struct RoomAllocator<S> {
    store: Arc<S>,
    settings: AllocatorSettings,
    running: AtomicBool,
}

impl<S> RoomAllocator<S>
where
    S: DirectoryStore + 'static,
{
    pub fn new(store: Arc<S>, settings: AllocatorSettings) -> Self {
        Self {
            store,
            settings,
            running: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn settings(&self) -> AllocatorSettings {
        self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn allocate(
        &self,
        ctx: &AllocationContext,
    ) -> Result<AllocationReport, AllocationError> {
        if !ctx.is_administrator() {
            warn!(actor = %ctx.actor, "allocation refused for non-administrator");
            return Err(AllocationError::Unauthorized);
        }

        let _run = RunGuard::acquire(&self.running).ok_or(AllocationError::RunInProgress)?;
        info!(actor = %ctx.actor, "room allocation started");

        let result = self.run_once().await;
        match &result {
            Ok(report) => info!(
                actor = %ctx.actor,
                assigned = report.assigned_count,
                unplaced = report.unplaced.len(),
                "room allocation complete"
            ),
            Err(err) => warn!(actor = %ctx.actor, error = %err, "room allocation failed"),
        }
        result
    }

    async fn run_once(&self) -> Result<AllocationReport, AllocationError> {
        let limit = self.settings.store_timeout;

        let mut occupants = self
            .bounded(self.store.fetch_unassigned_occupants())
            .await
            .unwrap_or(Err(FetchError::TimedOut(millis(limit))))?;
        let mut rooms = self
            .bounded(self.store.fetch_rooms_with_occupancy())
            .await
            .unwrap_or(Err(FetchError::TimedOut(millis(limit))))?;

        self.settings
            .snapshot_order
            .apply(&mut occupants, &mut rooms);
        debug!(
            occupants = occupants.len(),
            rooms = rooms.len(),
            "directory snapshot loaded"
        );

        let plan = plan_assignments(&occupants, &rooms);

        if plan.is_empty() {
            debug!("no assignments planned, skipping write");
        } else {
            self.bounded(self.store.apply_assignments(&plan.assignments))
                .await
                .unwrap_or(Err(PersistError::TimedOut(millis(limit))))?;
        }

        Ok(AllocationReport {
            assigned_count: plan.assignments.len(),
            considered: occupants.len(),
            assignments: plan.assignments,
            unplaced: plan.unplaced,
            completed_at: Utc::now(),
        })
    }

    /// `None` when the store call outlived the configured timeout.
    async fn bounded<F, T>(&self, call: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.settings.store_timeout, call)
            .await
            .ok()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
