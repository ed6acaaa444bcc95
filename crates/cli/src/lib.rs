pub mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::report::{ReportArgs, ReportName};

#[derive(Debug, Parser)]
#[command(
    name = "pipecast",
    about = "Pipecast operator CLI",
    long_about = "Operate Pipecast migrations, demo data seeding, report runs, and config inspection.",
    after_help = "Examples:\n  pipecast migrate\n  pipecast seed\n  pipecast report stage-dwell --start 2024-02-01 --end 2024-04-30\n  pipecast config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo pipeline dataset")]
    Seed,
    #[command(about = "Run one report and print its table as JSON")]
    Report {
        #[arg(value_enum, help = "Which report to run")]
        name: ReportName,
        #[arg(long, help = "Inclusive start of the snapshot-date window (ISO date)")]
        start: Option<NaiveDate>,
        #[arg(long, help = "Inclusive end of the snapshot-date window (ISO date)")]
        end: Option<NaiveDate>,
        #[arg(long, help = "Reference date for roster ages and batch resolution (ISO date)")]
        as_of: Option<NaiveDate>,
        #[arg(long, help = "Loss-reason grouping: reason|stage")]
        group: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Report { name, start, end, as_of, group } => {
            commands::report::run(ReportArgs { name, start, end, as_of, group })
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
