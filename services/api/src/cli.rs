use crate::demo::{run_allocate, run_demo, AllocateArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hostel::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Hostel Allocation Service",
    about = "Run room allocation for hostel residents from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one allocation pass over CSV rosters and print the outcome
    Allocate(AllocateArgs),
    /// Walk through allocation, manual edits, and occupancy on a seeded directory
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Rooms CSV (id,room_number,capacity,gender_type) used to seed the directory
    #[arg(long, requires = "occupants")]
    pub(crate) rooms: Option<PathBuf>,
    /// Occupants CSV (id,name,gender,role,room_id) used to seed the directory
    #[arg(long, requires = "rooms")]
    pub(crate) occupants: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Allocate(args) => run_allocate(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
