use std::path::PathBuf;

use budgetscan::{Result, ScanError, report, scan};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|_| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|error| ScanError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Scan(args) => execute_scan(args),
        Command::Details(args) => execute_details(args),
        Command::List(args) => execute_list(args),
    }
}

fn execute_scan(args: FolderArgs) -> Result<()> {
    let output = args.output_or("budget_summary.xlsx");
    let outcome = scan::scan_folder(&args.input, None)?;
    report::write_report(
        &output,
        &report::header_table(&outcome.records),
        Some(&outcome.stats),
    )?;
    println!(
        "processed {} of {} files, report written to {}",
        outcome.stats.processed_files,
        outcome.stats.total_files,
        output.display()
    );
    Ok(())
}

fn execute_details(args: FolderArgs) -> Result<()> {
    let output = args.output_or("budget_details.xlsx");
    let outcome = scan::extract_details(&args.input, None)?;
    report::write_report(
        &output,
        &report::detail_table(&outcome.records),
        Some(&outcome.stats),
    )?;
    println!(
        "extracted {} detail rows from {} files, report written to {}",
        outcome.records.len(),
        outcome.stats.total_files,
        output.display()
    );
    Ok(())
}

fn execute_list(args: FolderArgs) -> Result<()> {
    let output = args.output_or("file_inventory.xlsx");
    let files = scan::inventory_folder(&args.input)?;
    report::write_report(&output, &report::inventory_table(&files), None)?;
    println!(
        "listed {} files, inventory written to {}",
        files.len(),
        output.display()
    );
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Batch-extract budget fields and line items from folders of Excel documents."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the header fields of every document into a summary report.
    Scan(FolderArgs),
    /// Extract the line-item detail rows of every document.
    Details(FolderArgs),
    /// List every file in the folder into an inventory report.
    List(FolderArgs),
}

#[derive(clap::Args)]
struct FolderArgs {
    /// Folder containing the Excel documents (scanned non-recursively).
    #[arg(long)]
    input: PathBuf,

    /// Output report path.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl FolderArgs {
    fn output_or(&self, default_name: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_name))
    }
}
