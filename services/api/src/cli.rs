use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use hse_portal::directory::EmployeeImporter;
use hse_portal::error::AppError;
use hse_portal::store::InMemoryPortalStore;

use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "HSE Portal",
    about = "Run the occupational health & safety compliance portal",
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
    /// Dry-run an onboarding CSV against an empty directory and print the import summary
    CheckImport(CheckImportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct CheckImportArgs {
    /// Employee export with username, first_name, last_name and optional placement columns
    pub(crate) csv: PathBuf,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::CheckImport(args) => check_import(args),
    }
}

fn check_import(args: CheckImportArgs) -> Result<(), AppError> {
    let store = InMemoryPortalStore::new();
    let summary = EmployeeImporter::new(&store).from_path(&args.csv, Utc::now())?;

    println!(
        "{}: {} created, {} updated, {} rejected",
        args.csv.display(),
        summary.created,
        summary.updated,
        summary.rejected.len()
    );
    for row in &summary.rejected {
        println!("  line {}: {}", row.line, row.reason);
    }
    Ok(())
}
