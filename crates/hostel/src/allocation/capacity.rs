use std::collections::HashMap;

use tracing::warn;

use super::domain::{RoomId, RoomSnapshot};

/// Seats left per room for the duration of one run.
///
/// Built once from the room snapshot and only ever decremented; it is never re-read from
/// the store mid-run.
#[derive(Debug, Default, Clone)]
pub struct ResidualCapacity {
    seats: HashMap<RoomId, u32>,
}

impl ResidualCapacity {
    pub fn from_rooms(rooms: &[RoomSnapshot]) -> Self {
        let mut seats = HashMap::with_capacity(rooms.len());

        for room in rooms {
            if seats.contains_key(&room.id) {
                warn!(room_id = %room.id, "duplicate room in snapshot, keeping first entry");
                continue;
            }

            if room.occupied > room.capacity {
                warn!(
                    room_id = %room.id,
                    capacity = room.capacity,
                    occupied = room.occupied,
                    "room snapshot reports more occupants than capacity"
                );
            }

            seats.insert(room.id, room.capacity.saturating_sub(room.occupied));
        }

        Self { seats }
    }

    pub fn remaining(&self, room: RoomId) -> u32 {
        self.seats.get(&room).copied().unwrap_or(0)
    }

    pub fn has_room(&self, room: RoomId) -> bool {
        self.remaining(room) > 0
    }

    /// Takes one seat. Returns `false` without changing anything when the room is full or unknown.
    pub fn reserve(&mut self, room: RoomId) -> bool {
        match self.seats.get_mut(&room) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn total_remaining(&self) -> u64 {
        self.seats.values().map(|left| u64::from(*left)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::domain::RoomCategory;

    fn room(id: u64, capacity: u32, occupied: u32) -> RoomSnapshot {
        RoomSnapshot {
            id: RoomId(id),
            capacity,
            category: RoomCategory::Mixed,
            occupied,
        }
    }

    #[test]
    fn residual_is_capacity_minus_occupied() {
        let residual = ResidualCapacity::from_rooms(&[room(1, 4, 1), room(2, 2, 2)]);
        assert_eq!(residual.remaining(RoomId(1)), 3);
        assert_eq!(residual.remaining(RoomId(2)), 0);
        assert!(!residual.has_room(RoomId(2)));
        assert_eq!(residual.total_remaining(), 3);
    }

    #[test]
    fn overfull_rooms_saturate_at_zero() {
        let residual = ResidualCapacity::from_rooms(&[room(1, 2, 5)]);
        assert_eq!(residual.remaining(RoomId(1)), 0);
    }

    #[test]
    fn reserve_refuses_once_exhausted() {
        let mut residual = ResidualCapacity::from_rooms(&[room(1, 2, 0)]);
        assert!(residual.reserve(RoomId(1)));
        assert!(residual.reserve(RoomId(1)));
        assert!(!residual.reserve(RoomId(1)));
        assert_eq!(residual.remaining(RoomId(1)), 0);
    }

    #[test]
    fn unknown_rooms_have_no_seats() {
        let mut residual = ResidualCapacity::from_rooms(&[]);
        assert!(!residual.has_room(RoomId(9)));
        assert!(!residual.reserve(RoomId(9)));
    }

    #[test]
    fn duplicate_room_ids_keep_first_entry() {
        let residual = ResidualCapacity::from_rooms(&[room(1, 3, 0), room(1, 1, 1)]);
        assert_eq!(residual.remaining(RoomId(1)), 3);
    }
}
