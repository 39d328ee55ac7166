use async_trait::async_trait;

use super::domain::{
    AssignmentProposal, NewRoom, Occupant, OccupantId, OccupantSnapshot, Room, RoomSnapshot,
};

/// Storage abstraction over the hosted directory holding residents and rooms.
///
/// `apply_assignments` is atomic: implementations either set every room reference in the
/// batch or leave the directory untouched and return an error.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Residents with no room, administrators excluded, in ascending id order.
    async fn fetch_unassigned_occupants(&self) -> Result<Vec<OccupantSnapshot>, FetchError>;

    /// Every room with its occupancy at read time, in ascending id order.
    async fn fetch_rooms_with_occupancy(&self) -> Result<Vec<RoomSnapshot>, FetchError>;

    async fn apply_assignments(&self, pairs: &[AssignmentProposal]) -> Result<(), PersistError>;

    async fn fetch_occupants(&self) -> Result<Vec<Occupant>, FetchError>;

    async fn fetch_rooms(&self) -> Result<Vec<Room>, FetchError>;

    async fn insert_room(&self, room: NewRoom) -> Result<Room, RoomInsertError>;

    /// Clears the occupant's room reference. Returns the occupant as it was before the change.
    async fn clear_room(&self, occupant: &OccupantId) -> Result<Occupant, PersistError>;
}

/// A snapshot could not be read. Nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    #[error("directory read timed out after {0} ms")]
    TimedOut(u64),
}

/// The batch write did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    #[error("assignment rejected, snapshot is stale: {0}")]
    Conflict(String),
    #[error("directory write timed out after {0} ms; re-read the directory before retrying")]
    TimedOut(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomInsertError {
    #[error("room number '{0}' already exists")]
    Duplicate(String),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}
