use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::directory::{DirectoryStore, FetchError, PersistError, RoomInsertError};
use super::roster::{validate_roster, RosterError};
use super::domain::{
    AccountRole, AssignmentProposal, NewRoom, Occupant, OccupantId, OccupantSnapshot, Room,
    RoomId, RoomSnapshot,
};

/// Process-local directory used by the HTTP service, the CLI, and tests.
///
/// Batches are validated against live state before anything is mutated, so a batch planned
/// from a stale snapshot is rejected as a whole.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    occupants: BTreeMap<OccupantId, Occupant>,
    rooms: BTreeMap<RoomId, Room>,
}

impl DirectoryState {
    fn occupied(&self) -> HashMap<RoomId, u32> {
        let mut counts = HashMap::new();
        for room_id in self.occupants.values().filter_map(|o| o.room_id) {
            *counts.entry(room_id).or_insert(0) += 1;
        }
        counts
    }

    fn validate(&self, pairs: &[AssignmentProposal]) -> Result<(), PersistError> {
        let mut occupied = self.occupied();
        let mut batch: HashSet<&OccupantId> = HashSet::with_capacity(pairs.len());

        for pair in pairs {
            if !batch.insert(&pair.occupant_id) {
                return Err(PersistError::Conflict(format!(
                    "occupant {} appears twice in one batch",
                    pair.occupant_id
                )));
            }

            let occupant = self.occupants.get(&pair.occupant_id).ok_or_else(|| {
                PersistError::Conflict(format!("occupant {} does not exist", pair.occupant_id))
            })?;
            if occupant.role == AccountRole::Administrator {
                return Err(PersistError::Conflict(format!(
                    "occupant {} is an administrator",
                    occupant.id
                )));
            }
            if let Some(current) = occupant.room_id {
                return Err(PersistError::Conflict(format!(
                    "occupant {} is already in room {current}",
                    occupant.id
                )));
            }

            let room = self.rooms.get(&pair.room_id).ok_or_else(|| {
                PersistError::Conflict(format!("room {} does not exist", pair.room_id))
            })?;
            if !room.category.accepts(occupant.gender) {
                return Err(PersistError::Conflict(format!(
                    "room {} does not accept {} occupants",
                    room.room_number,
                    occupant.gender.label()
                )));
            }

            let count = occupied.entry(room.id).or_insert(0);
            if *count >= room.capacity {
                return Err(PersistError::Conflict(format!(
                    "room {} is full",
                    room.room_number
                )));
            }
            *count += 1;
        }

        Ok(())
    }
}

impl InMemoryDirectory {
    /// Builds a directory from an imported roster, rejecting seeds that already break
    /// capacity or reference rooms that do not exist.
    pub fn seeded(rooms: Vec<Room>, occupants: Vec<Occupant>) -> Result<Self, RosterError> {
        validate_roster(&rooms, &occupants)?;
        Ok(Self::new(rooms, occupants))
    }

    /// Trusted construction; callers guarantee the records are consistent.
    pub fn new(rooms: Vec<Room>, occupants: Vec<Occupant>) -> Self {
        let state = DirectoryState {
            occupants: occupants.into_iter().map(|o| (o.id.clone(), o)).collect(),
            rooms: rooms.into_iter().map(|r| (r.id, r)).collect(),
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn occupant(&self, id: &OccupantId) -> Option<Occupant> {
        self.state.lock().await.occupants.get(id).cloned()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn fetch_unassigned_occupants(&self) -> Result<Vec<OccupantSnapshot>, FetchError> {
        let state = self.state.lock().await;
        Ok(state
            .occupants
            .values()
            .filter(|occupant| occupant.is_candidate())
            .map(|occupant| OccupantSnapshot {
                id: occupant.id.clone(),
                gender: occupant.gender,
            })
            .collect())
    }

    async fn fetch_rooms_with_occupancy(&self) -> Result<Vec<RoomSnapshot>, FetchError> {
        let state = self.state.lock().await;
        let occupied = state.occupied();
        Ok(state
            .rooms
            .values()
            .map(|room| RoomSnapshot {
                id: room.id,
                capacity: room.capacity,
                category: room.category,
                occupied: occupied.get(&room.id).copied().unwrap_or(0),
            })
            .collect())
    }

    async fn apply_assignments(&self, pairs: &[AssignmentProposal]) -> Result<(), PersistError> {
        let mut state = self.state.lock().await;
        state.validate(pairs)?;

        for pair in pairs {
            if let Some(occupant) = state.occupants.get_mut(&pair.occupant_id) {
                occupant.room_id = Some(pair.room_id);
            }
        }

        Ok(())
    }

    async fn fetch_occupants(&self) -> Result<Vec<Occupant>, FetchError> {
        Ok(self.state.lock().await.occupants.values().cloned().collect())
    }

    async fn fetch_rooms(&self) -> Result<Vec<Room>, FetchError> {
        Ok(self.state.lock().await.rooms.values().cloned().collect())
    }

    async fn insert_room(&self, room: NewRoom) -> Result<Room, RoomInsertError> {
        let mut state = self.state.lock().await;
        let room_number = room.room_number.trim().to_string();

        if state
            .rooms
            .values()
            .any(|existing| existing.room_number.eq_ignore_ascii_case(&room_number))
        {
            return Err(RoomInsertError::Duplicate(room_number));
        }

        let id = match state.rooms.keys().next_back() {
            Some(last) => last.0.checked_add(1).map(RoomId).ok_or_else(|| {
                RoomInsertError::Unavailable("room id space exhausted".to_string())
            })?,
            None => RoomId(1),
        };
        let created = Room {
            id,
            room_number,
            capacity: room.capacity,
            category: room.category,
        };
        state.rooms.insert(id, created.clone());
        Ok(created)
    }

    async fn clear_room(&self, occupant: &OccupantId) -> Result<Occupant, PersistError> {
        let mut state = self.state.lock().await;
        let record = state.occupants.get_mut(occupant).ok_or_else(|| {
            PersistError::Conflict(format!("occupant {occupant} does not exist"))
        })?;
        let previous = record.clone();
        record.room_id = None;
        Ok(previous)
    }
}
