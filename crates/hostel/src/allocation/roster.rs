use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{AccountRole, Gender, Occupant, OccupantId, Room, RoomCategory, RoomId};

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("room {room_number} has invalid capacity {capacity}")]
    InvalidRoom { room_number: String, capacity: u32 },
    #[error("unknown account role '{0}'")]
    InvalidRole(String),
    #[error("room id {0} appears more than once")]
    DuplicateRoom(RoomId),
    #[error("room number '{0}' appears more than once")]
    DuplicateRoomNumber(String),
    #[error("occupant id {0} appears more than once")]
    DuplicateOccupant(OccupantId),
    #[error("occupant {occupant} references unknown room {room}")]
    UnknownRoom { occupant: OccupantId, room: RoomId },
    #[error("room {room_number} lists {occupants} occupants but holds {capacity}")]
    OverCapacity {
        room_number: String,
        capacity: u32,
        occupants: u32,
    },
}

/// Reads rooms exported as `id,room_number,capacity,gender_type`.
pub fn read_rooms<R: Read>(reader: R) -> Result<Vec<Room>, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rooms = Vec::new();

    for record in csv_reader.deserialize::<RoomRow>() {
        let row = record?;
        if row.capacity == 0 {
            return Err(RosterError::InvalidRoom {
                room_number: row.room_number,
                capacity: row.capacity,
            });
        }
        rooms.push(Room {
            id: RoomId(row.id),
            room_number: row.room_number,
            capacity: row.capacity,
            category: row.gender_type,
        });
    }

    Ok(rooms)
}

/// Reads residents exported as `id,name,gender,role,room_id`. `role` and `room_id` may be blank.
pub fn read_occupants<R: Read>(reader: R) -> Result<Vec<Occupant>, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut occupants = Vec::new();

    for record in csv_reader.deserialize::<OccupantRow>() {
        let row = record?;
        let role = match row.role.as_deref() {
            None => AccountRole::Resident,
            Some(raw) => {
                AccountRole::parse(raw).ok_or_else(|| RosterError::InvalidRole(raw.to_string()))?
            }
        };
        occupants.push(Occupant {
            id: OccupantId(row.id),
            name: row.name,
            gender: row.gender,
            role,
            room_id: row.room_id.map(RoomId),
        });
    }

    Ok(occupants)
}

/// Checks a seed roster before it becomes directory state: ids are unique, every room
/// reference resolves, and no room starts above capacity.
pub fn validate_roster(rooms: &[Room], occupants: &[Occupant]) -> Result<(), RosterError> {
    let mut by_id: HashMap<RoomId, &Room> = HashMap::with_capacity(rooms.len());
    let mut numbers: HashSet<String> = HashSet::with_capacity(rooms.len());
    for room in rooms {
        if by_id.insert(room.id, room).is_some() {
            return Err(RosterError::DuplicateRoom(room.id));
        }
        if !numbers.insert(room.room_number.trim().to_ascii_lowercase()) {
            return Err(RosterError::DuplicateRoomNumber(room.room_number.clone()));
        }
    }

    let mut seen: HashSet<&OccupantId> = HashSet::with_capacity(occupants.len());
    let mut occupied: HashMap<RoomId, u32> = HashMap::new();
    for occupant in occupants {
        if !seen.insert(&occupant.id) {
            return Err(RosterError::DuplicateOccupant(occupant.id.clone()));
        }
        if let Some(room) = occupant.room_id {
            if !by_id.contains_key(&room) {
                return Err(RosterError::UnknownRoom {
                    occupant: occupant.id.clone(),
                    room,
                });
            }
            *occupied.entry(room).or_insert(0) += 1;
        }
    }

    for (room_id, count) in occupied {
        let room = by_id[&room_id];
        if count > room.capacity {
            return Err(RosterError::OverCapacity {
                room_number: room.room_number.clone(),
                capacity: room.capacity,
                occupants: count,
            });
        }
    }

    Ok(())
}

pub fn read_rooms_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Room>, RosterError> {
    read_rooms(std::fs::File::open(path)?)
}

pub fn read_occupants_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Occupant>, RosterError> {
    read_occupants(std::fs::File::open(path)?)
}

#[derive(Debug, Deserialize)]
struct RoomRow {
    id: u64,
    room_number: String,
    capacity: u32,
    gender_type: RoomCategory,
}

#[derive(Debug, Deserialize)]
struct OccupantRow {
    id: String,
    name: String,
    gender: Gender,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    role: Option<String>,
    #[serde(default, deserialize_with = "empty_u64_as_none")]
    room_id: Option<u64>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn empty_u64_as_none<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    empty_string_as_none(deserializer)?
        .map(|raw| raw.parse::<u64>().map_err(serde::de::Error::custom))
        .transpose()
}
