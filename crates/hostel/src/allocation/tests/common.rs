use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::allocation::directory::{DirectoryStore, FetchError, PersistError, RoomInsertError};
use crate::allocation::domain::{
    AccountRole, AssignmentProposal, Gender, NewRoom, Occupant, OccupantId, OccupantSnapshot,
    Room, RoomCategory, RoomId, RoomSnapshot,
};
use crate::allocation::memory::InMemoryDirectory;
use crate::allocation::service::{AllocatorSettings, RoomAllocator};
use crate::allocation::{allocation_router, AllocationState, SnapshotOrder};

pub(super) fn resident(id: &str, gender: Gender) -> Occupant {
    Occupant {
        id: OccupantId(id.to_string()),
        name: format!("Resident {id}"),
        gender,
        role: AccountRole::Resident,
        room_id: None,
    }
}

pub(super) fn housed(id: &str, gender: Gender, room: u64) -> Occupant {
    Occupant {
        room_id: Some(RoomId(room)),
        ..resident(id, gender)
    }
}

pub(super) fn administrator(id: &str) -> Occupant {
    Occupant {
        role: AccountRole::Administrator,
        ..resident(id, Gender::Female)
    }
}

pub(super) fn room(id: u64, capacity: u32, category: RoomCategory) -> Room {
    Room {
        id: RoomId(id),
        room_number: format!("R-{id:03}"),
        capacity,
        category,
    }
}

pub(super) fn settings() -> AllocatorSettings {
    AllocatorSettings {
        store_timeout: Duration::from_millis(200),
        snapshot_order: SnapshotOrder::ById,
    }
}

pub(super) fn allocator_over<S>(store: Arc<S>) -> RoomAllocator<S>
where
    S: DirectoryStore + 'static,
{
    RoomAllocator::new(store, settings())
}

pub(super) fn router_over<S>(store: Arc<S>) -> axum::Router
where
    S: DirectoryStore + 'static,
{
    allocation_router(AllocationState::new(Arc::new(allocator_over(store))))
}

pub(super) fn standard_directory() -> Arc<InMemoryDirectory> {
    Arc::new(InMemoryDirectory::new(
        vec![
            room(1, 2, RoomCategory::Male),
            room(2, 1, RoomCategory::Female),
            room(3, 2, RoomCategory::Mixed),
        ],
        vec![
            resident("s-01", Gender::Male),
            resident("s-02", Gender::Female),
            resident("s-03", Gender::Female),
            housed("s-04", Gender::Male, 1),
            administrator("warden"),
        ],
    ))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Wraps an in-memory directory with switchable failures and call counters.
#[derive(Default)]
pub(super) struct ScriptedDirectory {
    pub(super) inner: InMemoryDirectory,
    pub(super) fail_occupant_fetch: AtomicBool,
    pub(super) fail_room_fetch: AtomicBool,
    pub(super) fail_writes: AtomicBool,
    pub(super) slow_fetches: AtomicBool,
    pub(super) slow_writes: AtomicBool,
    pub(super) apply_calls: AtomicUsize,
}

impl ScriptedDirectory {
    pub(super) fn new(inner: InMemoryDirectory) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub(super) fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryStore for ScriptedDirectory {
    async fn fetch_unassigned_occupants(&self) -> Result<Vec<OccupantSnapshot>, FetchError> {
        if self.fail_occupant_fetch.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("occupants query failed".to_string()));
        }
        if self.slow_fetches.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        self.inner.fetch_unassigned_occupants().await
    }

    async fn fetch_rooms_with_occupancy(&self) -> Result<Vec<RoomSnapshot>, FetchError> {
        if self.fail_room_fetch.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("rooms query failed".to_string()));
        }
        self.inner.fetch_rooms_with_occupancy().await
    }

    async fn apply_assignments(&self, pairs: &[AssignmentProposal]) -> Result<(), PersistError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow_writes.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("write rejected".to_string()));
        }
        self.inner.apply_assignments(pairs).await
    }

    async fn fetch_occupants(&self) -> Result<Vec<Occupant>, FetchError> {
        if self.fail_occupant_fetch.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("occupants query failed".to_string()));
        }
        self.inner.fetch_occupants().await
    }

    async fn fetch_rooms(&self) -> Result<Vec<Room>, FetchError> {
        if self.fail_room_fetch.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("rooms query failed".to_string()));
        }
        self.inner.fetch_rooms().await
    }

    async fn insert_room(&self, room: NewRoom) -> Result<Room, RoomInsertError> {
        self.inner.insert_room(room).await
    }

    async fn clear_room(&self, occupant: &OccupantId) -> Result<Occupant, PersistError> {
        self.inner.clear_room(occupant).await
    }
}
