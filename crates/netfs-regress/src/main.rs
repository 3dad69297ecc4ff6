use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use netfs_regress_lib::cli::commands::{Cli, Commands};
use netfs_regress_lib::fixture::remove_tree;
use netfs_regress_lib::{HarnessError, Suite, SuiteConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when at least one case failed
const EXIT_CASES_FAILED: u8 = 1;
/// Exit status when the harness itself failed: bad configuration or an
/// unusable working directory
const EXIT_FATAL: u8 = 2;
/// Exit status after an interrupt
const EXIT_INTERRUPTED: i32 = 130;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logger with specified or default log level
    let env = match cli.log_level {
        Some(ref log_level) => Env::default().filter_or("RUST_LOG", log_level),
        None => Env::default().filter_or("RUST_LOG", "info"),
    };
    env_logger::init_from_env(env);

    match &cli.command {
        Commands::Run { filters, .. } => cmd_run(&cli, filters.clone()),
        Commands::List => {
            cmd_list();
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Report a harness failure and return the fatal exit status
fn fatal(what: &str, e: &HarnessError) -> ExitCode {
    error!("{}: {}", what, e);
    eprintln!("✗ {}: {}", what, e);
    ExitCode::from(EXIT_FATAL)
}

/// Run the suite and turn the report into an exit status
fn cmd_run(cli: &Cli, filters: Vec<String>) -> Result<ExitCode> {
    let mut config = match SuiteConfig::discover(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return Ok(fatal("Failed to load configuration", &e)),
    };
    cli.command.apply_overrides(&mut config);

    let suite = Suite::new(config).filter(filters);
    let workdir = match suite.working_dir() {
        Ok(dir) => dir,
        Err(e) => return Ok(fatal("Failed to resolve the working directory", &e)),
    };

    install_interrupt_handler(workdir.clone())?;

    info!("Running suite in {:?}", workdir);
    let report = match suite.run() {
        Ok(report) => report,
        Err(e) => return Ok(fatal("Cannot run the suite", &e)),
    };

    println!("{}", report);

    if report.is_success() {
        println!("✓ OK");
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "✗ FAILED (failures={}, errors={})",
            report.failed(),
            report.errored()
        );
        Ok(ExitCode::from(EXIT_CASES_FAILED))
    }
}

/// Remove the working directory if the run is interrupted
fn install_interrupt_handler(workdir: PathBuf) -> Result<()> {
    ctrlc::set_handler(move || {
        warn!("Interrupted, removing {:?}", workdir);
        if let Err(e) = remove_tree(&workdir) {
            error!("Failed to remove {:?}: {}", workdir, e);
        }
        std::process::exit(EXIT_INTERRUPTED);
    })
    .with_context(|| "Failed to set interrupt handler")
}

fn cmd_list() {
    let suite = Suite::new(SuiteConfig::default());
    for case in suite.cases() {
        let requires = if case.requires.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = case.requires.iter().map(|c| c.name()).collect();
            format!(" [requires {}]", names.join(", "))
        };
        println!("{:<20} {}{}", case.name, case.description, requires);
    }
}
