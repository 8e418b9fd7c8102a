use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Report;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use v6netc::orchestrator;
use v6netc::CompileError;

/// Compile a network intent document into per-router configurations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the intent and write one artifact per router
    Compile {
        /// Path to the intent document (JSON, or YAML by extension)
        intent: PathBuf,

        /// Output directory for the artifacts
        output_dir: PathBuf,
    },
    /// Run the full pipeline without writing anything
    Check {
        /// Path to the intent document
        intent: PathBuf,
    },
}

fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = usage_exit_code(&err);
            let _ = err.print();
            std::process::exit(code);
        }
    };

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(err) = run(args.command) {
        let code = err.exit_code();
        eprintln!("Error: {:?}", Report::new(err));
        std::process::exit(code);
    }
    Ok(())
}

/// Exit code for a command line clap rejected. Exit code 2 belongs to write
/// failures, so usage errors report 1 like any other input error.
fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn run(command: Command) -> Result<(), CompileError> {
    match command {
        Command::Compile { intent, output_dir } => {
            info!("Intent document: {:?}", intent);
            info!("Output directory: {:?}", output_dir);
            let summary = orchestrator::compile_to_dir(&intent, &output_dir)?;
            info!("Wrote {} router configurations to {:?}", summary.routers, output_dir);
        }
        Command::Check { intent } => {
            let summary = orchestrator::check(&intent)?;
            info!("{:?} is valid ({} routers)", intent, summary.routers);
        }
    }
    Ok(())
}
