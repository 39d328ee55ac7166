//! Room allocation for hostel residents.
//!
//! The matcher is a single synchronous pass over a directory snapshot; the service wraps it
//! with the store round trips, a per-allocator run lock, and an atomic batch write.

pub mod admin;
pub mod capacity;
pub mod directory;
pub mod domain;
pub mod matcher;
pub mod memory;
pub mod occupancy;
pub mod roster;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use admin::{AdminError, DirectoryAdmin};
pub use capacity::ResidualCapacity;
pub use directory::{DirectoryStore, FetchError, PersistError, RoomInsertError};
pub use domain::{
    AccountRole, AllocationContext, AssignmentProposal, Gender, NewRoom, Occupant, OccupantId,
    OccupantSnapshot, Room, RoomCategory, RoomId, RoomSnapshot,
};
pub use matcher::{plan_assignments, AllocationPlan, SnapshotOrder};
pub use memory::InMemoryDirectory;
pub use occupancy::{OccupancySummary, ResidentRoster, ResidentRow, RoomOccupancyRow};
pub use roster::RosterError;
pub use router::{allocation_router, AllocationState};
pub use service::{
    AllocationError, AllocationOutcome, AllocationReport, AllocatorSettings, RoomAllocator,
};
