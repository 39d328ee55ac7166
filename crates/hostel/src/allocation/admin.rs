use std::sync::Arc;

use tracing::info;

use super::directory::{DirectoryStore, FetchError, PersistError, RoomInsertError};
use super::domain::{
    AccountRole, AllocationContext, AssignmentProposal, NewRoom, Occupant, OccupantId, Room,
    RoomId,
};

/// Manual directory edits made from the administrator dashboard.
///
/// Every edit goes through the same capacity and compatibility rules as the allocator.
pub struct DirectoryAdmin<S> {
    store: Arc<S>,
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("directory changes require an administrator")]
    Unauthorized,
    #[error("invalid room: {0}")]
    InvalidRoom(String),
    #[error("occupant {0} does not exist")]
    UnknownOccupant(OccupantId),
    #[error("room {0} does not exist")]
    UnknownRoom(RoomId),
    #[error("occupant {occupant} is already in room {room}")]
    AlreadyAssigned { occupant: OccupantId, room: RoomId },
    #[error("occupant {0} is an administrator and cannot be housed")]
    NotResident(OccupantId),
    #[error("room {room_number} does not accept {gender} occupants")]
    Incompatible {
        room_number: String,
        gender: &'static str,
    },
    #[error("room {0} is full")]
    RoomFull(String),
    #[error(transparent)]
    Duplicate(RoomInsertError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl From<RoomInsertError> for AdminError {
    fn from(value: RoomInsertError) -> Self {
        match value {
            RoomInsertError::Duplicate(_) => Self::Duplicate(value),
            RoomInsertError::Unavailable(reason) => {
                Self::Persist(PersistError::Unavailable(reason))
            }
        }
    }
}

impl<S> DirectoryAdmin<S>
where
    S: DirectoryStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn add_room(
        &self,
        ctx: &AllocationContext,
        room: NewRoom,
    ) -> Result<Room, AdminError> {
        require_admin(ctx)?;

        if room.room_number.trim().is_empty() {
            return Err(AdminError::InvalidRoom(
                "room number cannot be empty".to_string(),
            ));
        }
        if room.capacity == 0 {
            return Err(AdminError::InvalidRoom(
                "capacity must be at least 1".to_string(),
            ));
        }

        let created = self.store.insert_room(room).await?;
        info!(
            actor = %ctx.actor,
            room_id = %created.id,
            room_number = %created.room_number,
            capacity = created.capacity,
            "room created"
        );
        Ok(created)
    }

    pub async fn assign_room(
        &self,
        ctx: &AllocationContext,
        occupant_id: &OccupantId,
        room_id: RoomId,
    ) -> Result<AssignmentProposal, AdminError> {
        require_admin(ctx)?;

        let occupant = self.find_occupant(occupant_id).await?;
        if occupant.role == AccountRole::Administrator {
            return Err(AdminError::NotResident(occupant.id));
        }
        if let Some(room) = occupant.room_id {
            return Err(AdminError::AlreadyAssigned {
                occupant: occupant.id,
                room,
            });
        }

        let rooms = self.store.fetch_rooms_with_occupancy().await?;
        let snapshot = rooms
            .iter()
            .find(|room| room.id == room_id)
            .ok_or(AdminError::UnknownRoom(room_id))?;
        let room_number = self.room_number(room_id).await?;

        if !snapshot.category.accepts(occupant.gender) {
            return Err(AdminError::Incompatible {
                room_number,
                gender: occupant.gender.label(),
            });
        }
        if snapshot.occupied >= snapshot.capacity {
            return Err(AdminError::RoomFull(room_number));
        }

        let pair = AssignmentProposal {
            occupant_id: occupant.id,
            room_id,
        };
        self.store
            .apply_assignments(std::slice::from_ref(&pair))
            .await?;
        info!(
            actor = %ctx.actor,
            occupant = %pair.occupant_id,
            room = %room_number,
            "occupant assigned manually"
        );
        Ok(pair)
    }

    /// Clears the occupant's room. Returns the room they left, if any.
    pub async fn unassign_room(
        &self,
        ctx: &AllocationContext,
        occupant_id: &OccupantId,
    ) -> Result<Option<RoomId>, AdminError> {
        require_admin(ctx)?;

        self.find_occupant(occupant_id).await?;
        let previous = self.store.clear_room(occupant_id).await?;
        info!(
            actor = %ctx.actor,
            occupant = %occupant_id,
            room = ?previous.room_id,
            "occupant unassigned"
        );
        Ok(previous.room_id)
    }

    async fn find_occupant(&self, id: &OccupantId) -> Result<Occupant, AdminError> {
        self.store
            .fetch_occupants()
            .await?
            .into_iter()
            .find(|occupant| &occupant.id == id)
            .ok_or_else(|| AdminError::UnknownOccupant(id.clone()))
    }

    async fn room_number(&self, id: RoomId) -> Result<String, AdminError> {
        self.store
            .fetch_rooms()
            .await?
            .into_iter()
            .find(|room| room.id == id)
            .map(|room| room.room_number)
            .ok_or(AdminError::UnknownRoom(id))
    }
}

fn require_admin(ctx: &AllocationContext) -> Result<(), AdminError> {
    if ctx.is_administrator() {
        Ok(())
    } else {
        Err(AdminError::Unauthorized)
    }
}
