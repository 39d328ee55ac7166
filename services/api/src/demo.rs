use crate::infra::{demo_directory, load_directory};
use clap::Args;
use hostel::allocation::{
    plan_assignments, AllocationContext, AllocationOutcome, AllocationPlan, AllocationReport,
    DirectoryAdmin, DirectoryStore, InMemoryDirectory, NewRoom, OccupancySummary, OccupantId,
    RoomAllocator, RoomCategory, RoomId,
};
use hostel::config::AppConfig;
use hostel::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

const CLI_ACTOR: &str = "cli";

#[derive(Args, Debug)]
pub(crate) struct AllocateArgs {
    /// Rooms CSV (id,room_number,capacity,gender_type)
    #[arg(long)]
    pub(crate) rooms: PathBuf,
    /// Occupants CSV (id,name,gender,role,room_id)
    #[arg(long)]
    pub(crate) occupants: PathBuf,
    /// Print the planned assignments without applying them
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Emit the run report as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the manual room edits after the allocation run.
    #[arg(long)]
    pub(crate) skip_manual: bool,
}

pub(crate) async fn run_allocate(args: AllocateArgs) -> Result<(), AppError> {
    let AllocateArgs {
        rooms,
        occupants,
        dry_run,
        json,
    } = args;

    let config = AppConfig::load()?;
    let store = Arc::new(load_directory(Some(rooms.as_path()), Some(occupants.as_path()))?);

    if dry_run {
        let plan = preview_plan(store.as_ref(), &config).await?;
        if json {
            print_json(&plan);
        } else {
            println!("Dry run: nothing was written");
            render_plan(&plan);
        }
        return Ok(());
    }

    let allocator = RoomAllocator::new(store.clone(), config.allocation.settings());
    let result = allocator
        .allocate(&AllocationContext::administrator(CLI_ACTOR))
        .await;
    let outcome = AllocationOutcome::from_result(&result);
    let report = match result {
        Ok(report) => report,
        Err(err) => {
            if json {
                print_json(&outcome);
            }
            return Err(err.into());
        }
    };

    if json {
        print_json(&report);
        return Ok(());
    }

    render_report(&report);
    render_occupancy(store.as_ref()).await
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(demo_directory());
    let allocator = RoomAllocator::new(store.clone(), Default::default());
    let admin = DirectoryAdmin::new(store.clone());
    let warden = AllocationContext::administrator("adm-001");

    println!("Hostel allocation demo");
    println!("\nOccupancy before allocation");
    render_occupancy(store.as_ref()).await?;

    let refused = allocator
        .allocate(&AllocationContext::resident("stu-003"))
        .await;
    let outcome = AllocationOutcome::from_result(&refused);
    println!(
        "\nResident-triggered run -> assigned {} ({})",
        outcome.assigned_count,
        outcome.failure_reason.as_deref().unwrap_or("accepted")
    );

    let report = allocator.allocate(&warden).await?;
    println!();
    render_report(&report);

    if args.skip_manual {
        return render_occupancy(store.as_ref()).await;
    }

    println!("\nManual directory edits");
    let annex = admin
        .add_room(
            &warden,
            NewRoom {
                room_number: "D-401".to_string(),
                capacity: 1,
                category: RoomCategory::Female,
            },
        )
        .await?;
    println!(
        "- Added room {} ({}, capacity {})",
        annex.room_number,
        annex.category.label(),
        annex.capacity
    );

    let mover = OccupantId("stu-008".to_string());
    let previous = admin.unassign_room(&warden, &mover).await?;
    println!(
        "- Cleared {} from room {}",
        mover,
        previous.map_or_else(|| "none".to_string(), |room| room.to_string())
    );

    let placed = admin.assign_room(&warden, &mover, annex.id).await?;
    println!("- Moved {} into room {}", placed.occupant_id, placed.room_id);

    match admin.assign_room(&warden, &mover, RoomId(1)).await {
        Ok(_) => println!("- Unexpectedly reassigned {}", mover),
        Err(err) => println!("- Second assignment rejected: {}", err),
    }

    println!("\nOccupancy after allocation");
    render_occupancy(store.as_ref()).await
}

async fn preview_plan(
    store: &InMemoryDirectory,
    config: &AppConfig,
) -> Result<AllocationPlan, AppError> {
    let mut occupants = store.fetch_unassigned_occupants().await?;
    let mut rooms = store.fetch_rooms_with_occupancy().await?;
    config
        .allocation
        .snapshot_order
        .apply(&mut occupants, &mut rooms);
    Ok(plan_assignments(&occupants, &rooms))
}

fn render_plan(plan: &AllocationPlan) {
    println!("Planned assignments: {}", plan.assignments.len());
    for pair in &plan.assignments {
        println!("  - {} -> room {}", pair.occupant_id, pair.room_id);
    }
    render_unplaced(&plan.unplaced);
}

fn render_report(report: &AllocationReport) {
    println!(
        "Allocation run completed at {}",
        report.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "- {} of {} unassigned residents placed",
        report.assigned_count, report.considered
    );
    for pair in &report.assignments {
        println!("  - {} -> room {}", pair.occupant_id, pair.room_id);
    }
    render_unplaced(&report.unplaced);
}

fn render_unplaced(unplaced: &[OccupantId]) {
    if unplaced.is_empty() {
        return;
    }
    println!("Left without a room:");
    for occupant in unplaced {
        println!("  - {}", occupant);
    }
}

async fn render_occupancy(store: &InMemoryDirectory) -> Result<(), AppError> {
    let occupants = store.fetch_occupants().await?;
    let rooms = store.fetch_rooms().await?;
    let summary = OccupancySummary::build(&occupants, &rooms);

    println!(
        "- {} of {} residents housed | {}% of {} beds in use",
        summary.assigned_residents,
        summary.residents,
        summary.occupancy_percentage,
        summary.total_capacity
    );
    for row in &summary.rooms {
        println!(
            "  - {:<6} {:<6} {}/{} occupied, {} free",
            row.room_number,
            row.category.label(),
            row.occupants,
            row.capacity,
            row.free_seats()
        );
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => eprintln!("failed to render JSON output: {err}"),
    }
}
