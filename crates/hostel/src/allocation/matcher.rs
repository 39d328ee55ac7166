use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use super::capacity::ResidualCapacity;
use super::domain::{AssignmentProposal, OccupantId, OccupantSnapshot, RoomId, RoomSnapshot};

/// Order in which snapshots are walked by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotOrder {
    /// Sort occupants and rooms by identifier before matching.
    #[default]
    ById,
    /// Keep whatever order the store returned.
    AsFetched,
}

impl SnapshotOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "id" | "by_id" | "sorted" => Some(Self::ById),
            "fetched" | "as_fetched" | "store" => Some(Self::AsFetched),
            _ => None,
        }
    }

    pub fn apply(self, occupants: &mut [OccupantSnapshot], rooms: &mut [RoomSnapshot]) {
        if self == Self::ById {
            occupants.sort_by(|a, b| a.id.cmp(&b.id));
            rooms.sort_by_key(|room| room.id);
        }
    }
}

/// Result of one pass of the matcher, before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    pub assignments: Vec<AssignmentProposal>,
    pub unplaced: Vec<OccupantId>,
}

impl AllocationPlan {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Greedy first-fit: each occupant, in order, takes the first compatible room with a free seat.
///
/// Occupants with no such room are left in `unplaced`; that is not an error.
pub fn plan_assignments(occupants: &[OccupantSnapshot], rooms: &[RoomSnapshot]) -> AllocationPlan {
    let mut residual = ResidualCapacity::from_rooms(rooms);
    let rooms = first_occurrences(rooms);
    let mut seen: HashSet<&OccupantId> = HashSet::with_capacity(occupants.len());
    let mut plan = AllocationPlan::default();

    for occupant in occupants {
        if !seen.insert(&occupant.id) {
            continue;
        }

        let chosen = rooms
            .iter()
            .find(|room| room.category.accepts(occupant.gender) && residual.has_room(room.id))
            .map(|room| room.id);

        match chosen {
            Some(room_id) if residual.reserve(room_id) => {
                plan.assignments.push(AssignmentProposal {
                    occupant_id: occupant.id.clone(),
                    room_id,
                });
            }
            _ => plan.unplaced.push(occupant.id.clone()),
        }
    }

    debug!(
        placed = plan.assignments.len(),
        unplaced = plan.unplaced.len(),
        seats_left = residual.total_remaining(),
        "allocation plan built"
    );
    plan
}

fn first_occurrences(rooms: &[RoomSnapshot]) -> Vec<&RoomSnapshot> {
    let mut seen: HashSet<RoomId> = HashSet::with_capacity(rooms.len());
    rooms.iter().filter(|room| seen.insert(room.id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::domain::{Gender, RoomCategory};
    use std::collections::HashMap;

    fn occupant(id: &str, gender: Gender) -> OccupantSnapshot {
        OccupantSnapshot {
            id: OccupantId(id.to_string()),
            gender,
        }
    }

    fn room(id: u64, capacity: u32, category: RoomCategory, occupied: u32) -> RoomSnapshot {
        RoomSnapshot {
            id: RoomId(id),
            capacity,
            category,
            occupied,
        }
    }

    fn pair(occupant: &str, room: u64) -> AssignmentProposal {
        AssignmentProposal {
            occupant_id: OccupantId(occupant.to_string()),
            room_id: RoomId(room),
        }
    }

    #[test]
    fn places_each_gender_in_its_room() {
        let plan = plan_assignments(
            &[occupant("o1", Gender::Male), occupant("o2", Gender::Female)],
            &[
                room(1, 1, RoomCategory::Male, 0),
                room(2, 1, RoomCategory::Female, 0),
            ],
        );

        assert_eq!(plan.assignments, vec![pair("o1", 1), pair("o2", 2)]);
        assert!(plan.unplaced.is_empty());
    }

    #[test]
    fn first_occupant_in_order_wins_the_last_seat() {
        let plan = plan_assignments(
            &[occupant("o1", Gender::Male), occupant("o2", Gender::Male)],
            &[room(1, 1, RoomCategory::Male, 0)],
        );

        assert_eq!(plan.assignments, vec![pair("o1", 1)]);
        assert_eq!(plan.unplaced, vec![OccupantId("o2".to_string())]);
    }

    #[test]
    fn mixed_room_accepts_while_seats_remain() {
        let plan = plan_assignments(
            &[occupant("o1", Gender::Male)],
            &[room(1, 2, RoomCategory::Mixed, 1)],
        );

        assert_eq!(plan.assignments, vec![pair("o1", 1)]);
    }

    #[test]
    fn incompatible_rooms_leave_occupant_unplaced() {
        let plan = plan_assignments(
            &[occupant("o1", Gender::Female)],
            &[room(1, 5, RoomCategory::Male, 0)],
        );

        assert!(plan.is_empty());
        assert_eq!(plan.unplaced, vec![OccupantId("o1".to_string())]);
    }

    #[test]
    fn empty_occupant_list_produces_empty_plan() {
        let plan = plan_assignments(&[], &[room(1, 3, RoomCategory::Mixed, 0)]);
        assert_eq!(plan, AllocationPlan::default());
    }

    #[test]
    fn first_fit_fills_earlier_rooms_before_later_ones() {
        let plan = plan_assignments(
            &[
                occupant("o1", Gender::Female),
                occupant("o2", Gender::Female),
                occupant("o3", Gender::Female),
            ],
            &[
                room(1, 2, RoomCategory::Female, 0),
                room(2, 4, RoomCategory::Mixed, 0),
            ],
        );

        assert_eq!(
            plan.assignments,
            vec![pair("o1", 1), pair("o2", 1), pair("o3", 2)]
        );
    }

    #[test]
    fn duplicate_occupants_are_considered_once() {
        let plan = plan_assignments(
            &[occupant("o1", Gender::Male), occupant("o1", Gender::Male)],
            &[room(1, 4, RoomCategory::Male, 0)],
        );

        assert_eq!(plan.assignments, vec![pair("o1", 1)]);
        assert!(plan.unplaced.is_empty());
    }

    #[test]
    fn duplicate_room_entries_do_not_widen_compatibility() {
        let plan = plan_assignments(
            &[occupant("o1", Gender::Female)],
            &[
                room(1, 2, RoomCategory::Male, 0),
                room(1, 2, RoomCategory::Mixed, 0),
            ],
        );

        assert!(plan.is_empty());
    }

    #[test]
    fn plan_never_exceeds_capacity_or_mismatches_gender() {
        let genders = [Gender::Male, Gender::Female];
        let occupants: Vec<_> = (0..40)
            .map(|i| occupant(&format!("o{i:02}"), genders[i % 2]))
            .collect();
        let rooms = vec![
            room(1, 3, RoomCategory::Male, 1),
            room(2, 2, RoomCategory::Female, 0),
            room(3, 4, RoomCategory::Mixed, 3),
            room(4, 6, RoomCategory::Female, 2),
            room(5, 1, RoomCategory::Male, 1),
        ];

        let plan = plan_assignments(&occupants, &rooms);

        let mut placed: HashMap<RoomId, u32> = HashMap::new();
        for assignment in &plan.assignments {
            let room = rooms
                .iter()
                .find(|room| room.id == assignment.room_id)
                .expect("room exists");
            let gender = occupants
                .iter()
                .find(|o| o.id == assignment.occupant_id)
                .expect("occupant exists")
                .gender;
            assert!(room.category.accepts(gender));
            *placed.entry(room.id).or_default() += 1;
        }
        for room in &rooms {
            let added = placed.get(&room.id).copied().unwrap_or(0);
            assert!(room.occupied + added <= room.capacity);
        }
        assert_eq!(plan.assignments.len() + plan.unplaced.len(), occupants.len());
        // 2 + 2 + 1 + 4 + 0 free seats.
        assert_eq!(plan.assignments.len(), 9);
    }

    #[test]
    fn identical_inputs_yield_identical_plans() {
        let occupants = vec![
            occupant("b", Gender::Female),
            occupant("a", Gender::Male),
            occupant("c", Gender::Male),
        ];
        let rooms = vec![
            room(7, 1, RoomCategory::Male, 0),
            room(3, 2, RoomCategory::Mixed, 0),
        ];

        assert_eq!(
            plan_assignments(&occupants, &rooms),
            plan_assignments(&occupants, &rooms)
        );
    }

    #[test]
    fn sorting_by_id_orders_both_snapshots() {
        let mut occupants = vec![occupant("b", Gender::Male), occupant("a", Gender::Male)];
        let mut rooms = vec![
            room(9, 1, RoomCategory::Male, 0),
            room(2, 1, RoomCategory::Male, 0),
        ];

        SnapshotOrder::ById.apply(&mut occupants, &mut rooms);
        let plan = plan_assignments(&occupants, &rooms);

        assert_eq!(plan.assignments, vec![pair("a", 2), pair("b", 9)]);
    }

    #[test]
    fn as_fetched_keeps_store_order() {
        let mut occupants = vec![occupant("b", Gender::Male), occupant("a", Gender::Male)];
        let mut rooms = vec![room(9, 1, RoomCategory::Male, 0)];

        SnapshotOrder::AsFetched.apply(&mut occupants, &mut rooms);
        let plan = plan_assignments(&occupants, &rooms);

        assert_eq!(plan.assignments, vec![pair("b", 9)]);
        assert_eq!(plan.unplaced, vec![OccupantId("a".to_string())]);
    }

    #[test]
    fn snapshot_order_parses_config_values() {
        assert_eq!(SnapshotOrder::parse("id"), Some(SnapshotOrder::ById));
        assert_eq!(SnapshotOrder::parse("Fetched"), Some(SnapshotOrder::AsFetched));
        assert_eq!(SnapshotOrder::parse("random"), None);
    }
}
