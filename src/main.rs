//! sacd-extract CLI entry point

use clap::Parser;
use sacd_extract::config::{Cli, ExtractionOptions};
use sacd_extract::interrupt::InterruptController;
use sacd_extract::pipeline::{self, RunOutcome};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli);

    // Validate options
    let options = match ExtractionOptions::from_cli(&cli) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if !options.has_work() && !options.print {
        eprintln!(
            "Error: nothing to do\n\n  Tip: Request at least one output.\n  Examples:\n    sacd-extract -i disc.iso -I\n    sacd-extract -i disc.iso -s -t 1,3\n    sacd-extract -i disc.iso -P"
        );
        return ExitCode::FAILURE;
    }

    // Run the pipeline
    let interrupt = Arc::new(InterruptController::new());
    match pipeline::run(&options, &interrupt) {
        Ok(result) => {
            if options.dry_run || !options.has_work() {
                return ExitCode::SUCCESS;
            }

            println!();
            println!(
                "Summary: {} completed, {} failed, {} skipped (of {} planned)",
                result.completed, result.failed, result.skipped, result.planned_jobs
            );

            match result.outcome {
                RunOutcome::Failed(message) => {
                    eprintln!("Fatal error: {}", message);
                    ExitCode::FAILURE
                }
                RunOutcome::Interrupted => ExitCode::SUCCESS,
                RunOutcome::Completed if result.failed > 0 => ExitCode::from(1),
                RunOutcome::Completed => ExitCode::SUCCESS,
            }
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = cli.log_level().to_string().to_lowercase();

    // stdout carries the progress lines
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
