use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use super::domain::{AccountRole, Gender, Occupant, OccupantId, Room, RoomCategory, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomOccupancyRow {
    pub room_id: RoomId,
    pub room_number: String,
    pub category: RoomCategory,
    pub capacity: u32,
    pub occupants: u32,
}

impl RoomOccupancyRow {
    pub fn free_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.occupants)
    }
}

/// Dashboard counters plus one row per room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupancySummary {
    pub residents: usize,
    pub assigned_residents: usize,
    pub total_capacity: u64,
    pub occupancy_percentage: u32,
    pub rooms: Vec<RoomOccupancyRow>,
}

impl OccupancySummary {
    pub fn build(occupants: &[Occupant], rooms: &[Room]) -> Self {
        let residents: Vec<&Occupant> = occupants
            .iter()
            .filter(|occupant| occupant.role == AccountRole::Resident)
            .collect();

        let mut per_room: HashMap<RoomId, u32> = HashMap::new();
        for room_id in occupants.iter().filter_map(|occupant| occupant.room_id) {
            *per_room.entry(room_id).or_insert(0) += 1;
        }

        let assigned_residents = residents.iter().filter(|o| o.room_id.is_some()).count();
        let total_capacity: u64 = rooms.iter().map(|room| u64::from(room.capacity)).sum();

        let mut rows: Vec<RoomOccupancyRow> = rooms
            .iter()
            .map(|room| RoomOccupancyRow {
                room_id: room.id,
                room_number: room.room_number.clone(),
                category: room.category,
                capacity: room.capacity,
                occupants: per_room.get(&room.id).copied().unwrap_or(0),
            })
            .collect();
        rows.sort_by(|a, b| a.room_number.cmp(&b.room_number));

        Self {
            residents: residents.len(),
            assigned_residents,
            total_capacity,
            occupancy_percentage: percentage(assigned_residents as u64, total_capacity),
            rooms: rows,
        }
    }

    /// Writes the per-room rows as `room_number,gender_type,capacity,occupants`.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rooms {
            csv_writer.serialize(CsvRow {
                room_number: &row.room_number,
                gender_type: row.category.label(),
                capacity: row.capacity,
                occupants: row.occupants,
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Label used in exports for residents without a room.
pub const UNASSIGNED_LABEL: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResidentRow {
    pub id: OccupantId,
    pub name: String,
    pub gender: Gender,
    pub room_number: Option<String>,
}

/// Where every resident currently lives, administrators excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResidentRoster {
    pub residents: Vec<ResidentRow>,
}

impl ResidentRoster {
    pub fn build(occupants: &[Occupant], rooms: &[Room]) -> Self {
        let numbers: HashMap<RoomId, &str> = rooms
            .iter()
            .map(|room| (room.id, room.room_number.as_str()))
            .collect();

        let mut residents: Vec<ResidentRow> = occupants
            .iter()
            .filter(|occupant| occupant.role == AccountRole::Resident)
            .map(|occupant| ResidentRow {
                id: occupant.id.clone(),
                name: occupant.name.clone(),
                gender: occupant.gender,
                room_number: occupant
                    .room_id
                    .and_then(|room| numbers.get(&room))
                    .map(|number| number.to_string()),
            })
            .collect();
        residents.sort_by(|a, b| a.id.cmp(&b.id));

        Self { residents }
    }

    /// Writes `name,id,gender,room_number`; unhoused residents show as `Unassigned`.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.residents {
            csv_writer.serialize(ResidentCsvRow {
                name: &row.name,
                id: &row.id.0,
                gender: row.gender.label(),
                room_number: row.room_number.as_deref().unwrap_or(UNASSIGNED_LABEL),
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[derive(Serialize)]
struct ResidentCsvRow<'a> {
    name: &'a str,
    id: &'a str,
    gender: &'static str,
    room_number: &'a str,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    room_number: &'a str,
    gender_type: &'static str,
    capacity: u32,
    occupants: u32,
}

fn percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupant(id: &str, role: AccountRole, room: Option<u64>) -> Occupant {
        Occupant {
            id: OccupantId(id.to_string()),
            name: id.to_uppercase(),
            gender: Gender::Female,
            role,
            room_id: room.map(RoomId),
        }
    }

    fn rooms() -> Vec<Room> {
        vec![
            Room {
                id: RoomId(2),
                room_number: "B-201".to_string(),
                capacity: 4,
                category: RoomCategory::Female,
            },
            Room {
                id: RoomId(1),
                room_number: "A-101".to_string(),
                capacity: 2,
                category: RoomCategory::Mixed,
            },
        ]
    }

    #[test]
    fn summary_counts_residents_and_rounds_percentage() {
        let occupants = vec![
            occupant("a", AccountRole::Resident, Some(1)),
            occupant("b", AccountRole::Resident, Some(2)),
            occupant("c", AccountRole::Resident, None),
            occupant("warden", AccountRole::Administrator, None),
        ];

        let summary = OccupancySummary::build(&occupants, &rooms());

        assert_eq!(summary.residents, 3);
        assert_eq!(summary.assigned_residents, 2);
        assert_eq!(summary.total_capacity, 6);
        assert_eq!(summary.occupancy_percentage, 33);
        assert_eq!(summary.rooms[0].room_number, "A-101");
        assert_eq!(summary.rooms[0].occupants, 1);
        assert_eq!(summary.rooms[1].free_seats(), 3);
    }

    #[test]
    fn no_capacity_means_zero_percent() {
        let summary = OccupancySummary::build(&[], &[]);
        assert_eq!(summary.occupancy_percentage, 0);
        assert!(summary.rooms.is_empty());
    }

    #[test]
    fn csv_export_lists_rooms_in_order() {
        let occupants = vec![occupant("a", AccountRole::Resident, Some(2))];
        let summary = OccupancySummary::build(&occupants, &rooms());

        let csv = summary.to_csv_string().expect("csv renders");
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "room_number,gender_type,capacity,occupants");
        assert_eq!(lines[1], "A-101,Mixed,2,0");
        assert_eq!(lines[2], "B-201,Female,4,1");
    }

    #[test]
    fn resident_export_marks_unhoused_residents() {
        let occupants = vec![
            occupant("c", AccountRole::Resident, None),
            occupant("a", AccountRole::Resident, Some(2)),
            occupant("warden", AccountRole::Administrator, Some(1)),
        ];
        let roster = ResidentRoster::build(&occupants, &rooms());

        assert_eq!(roster.residents.len(), 2);
        assert_eq!(roster.residents[0].room_number.as_deref(), Some("B-201"));

        let csv = roster.to_csv_string().expect("csv renders");
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "name,id,gender,room_number");
        assert_eq!(lines[1], "A,a,Female,B-201");
        assert_eq!(lines[2], "C,c,Female,Unassigned");
    }
}
