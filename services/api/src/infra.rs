use hostel::allocation::roster::{read_occupants_from_path, read_rooms_from_path};
use hostel::allocation::{
    AccountRole, Gender, InMemoryDirectory, Occupant, OccupantId, Room, RoomCategory, RoomId,
};
use hostel::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn load_directory(
    rooms: Option<&Path>,
    occupants: Option<&Path>,
) -> Result<InMemoryDirectory, AppError> {
    let rooms = match rooms {
        Some(path) => read_rooms_from_path(path)?,
        None => Vec::new(),
    };
    let occupants = match occupants {
        Some(path) => read_occupants_from_path(path)?,
        None => Vec::new(),
    };
    Ok(InMemoryDirectory::seeded(rooms, occupants)?)
}

pub(crate) fn demo_directory() -> InMemoryDirectory {
    let rooms = vec![
        demo_room(1, "A-101", 2, RoomCategory::Male),
        demo_room(2, "A-102", 3, RoomCategory::Male),
        demo_room(3, "B-201", 2, RoomCategory::Female),
        demo_room(4, "C-301", 2, RoomCategory::Mixed),
    ];
    let occupants = vec![
        demo_occupant("stu-001", "Adaeze Okafor", Gender::Female, None),
        demo_occupant("stu-002", "Bola Adeyemi", Gender::Male, Some(1)),
        demo_occupant("stu-003", "Chinedu Eze", Gender::Male, None),
        demo_occupant("stu-004", "Damilola Ojo", Gender::Female, None),
        demo_occupant("stu-005", "Emeka Nwosu", Gender::Male, None),
        demo_occupant("stu-006", "Funmi Bello", Gender::Female, None),
        demo_occupant("stu-007", "Gbenga Salami", Gender::Male, None),
        demo_occupant("stu-008", "Halima Musa", Gender::Female, None),
        Occupant {
            role: AccountRole::Administrator,
            ..demo_occupant("adm-001", "Hall Warden", Gender::Female, None)
        },
    ];
    InMemoryDirectory::new(rooms, occupants)
}

fn demo_room(id: u64, number: &str, capacity: u32, category: RoomCategory) -> Room {
    Room {
        id: RoomId(id),
        room_number: number.to_string(),
        capacity,
        category,
    }
}

fn demo_occupant(id: &str, name: &str, gender: Gender, room: Option<u64>) -> Occupant {
    Occupant {
        id: OccupantId(id.to_string()),
        name: name.to_string(),
        gender,
        role: AccountRole::Resident,
        room_id: room.map(RoomId),
    }
}
