use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for resident records issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccupantId(pub String);

impl fmt::Display for OccupantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numeric room key assigned by the directory store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

/// Which residents a room may house.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomCategory {
    Male,
    Female,
    Mixed,
}

impl RoomCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Mixed => "Mixed",
        }
    }

    /// `Mixed` rooms take anyone; the others only take their own gender.
    pub const fn accepts(self, gender: Gender) -> bool {
        matches!(
            (self, gender),
            (Self::Mixed, _) | (Self::Male, Gender::Male) | (Self::Female, Gender::Female)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    #[default]
    Resident,
    #[serde(alias = "admin")]
    Administrator,
}

impl AccountRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::Administrator => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "resident" | "student" => Some(Self::Resident),
            "admin" | "administrator" => Some(Self::Administrator),
            _ => None,
        }
    }
}

/// Full resident record as held by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub id: OccupantId,
    pub name: String,
    pub gender: Gender,
    #[serde(default)]
    pub role: AccountRole,
    #[serde(default)]
    pub room_id: Option<RoomId>,
}

impl Occupant {
    /// Residents without a room are the only allocation candidates.
    pub fn is_candidate(&self) -> bool {
        self.role == AccountRole::Resident && self.room_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub room_number: String,
    pub capacity: u32,
    pub category: RoomCategory,
}

/// Payload for creating a room through the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoom {
    pub room_number: String,
    pub capacity: u32,
    #[serde(alias = "gender_type")]
    pub category: RoomCategory,
}

/// Read shape for an unassigned candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupantSnapshot {
    pub id: OccupantId,
    pub gender: Gender,
}

/// Read shape for a room with its occupancy at fetch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub capacity: u32,
    pub category: RoomCategory,
    pub occupied: u32,
}

/// A pairing decided during one allocation run. Applied by setting the occupant's room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentProposal {
    pub occupant_id: OccupantId,
    pub room_id: RoomId,
}

/// Caller credential passed into every directory mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationContext {
    pub actor: String,
    pub role: AccountRole,
}

impl AllocationContext {
    pub fn administrator(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            role: AccountRole::Administrator,
        }
    }

    pub fn resident(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            role: AccountRole::Resident,
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.role == AccountRole::Administrator
    }
}
