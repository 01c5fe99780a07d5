/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use logger::Verbosity;
use stress::{Config, Driver, OpRegistry};

/// Run on/off/verify loops concurrently, one thread per client.
#[derive(Parser, Debug)]
#[command(name = "stress", version)]
struct Args {
    /// JSON file describing the client groups.
    #[arg(long, value_name = "FILE")]
    config: PathBuf,
    /// Log debug output to the terminal.
    #[arg(long)]
    verbose: bool,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
    /// Also log to this file.
    #[arg(long = "log-file", value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    if let Err(e) =
        logger::init(Verbosity::from_flag(args.verbose), args.log_file.as_deref())
    {
        eprintln!("Error: failed to initialize logging: {}", e);
        process::exit(2);
    }

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            process::exit(2);
        }
    };

    let registry = Arc::new(OpRegistry::with_builtins());
    let driver =
        match Driver::configure(registry, config.groups, config.sync_timeout) {
            Ok(driver) => driver,
            Err(e) => {
                log::error!("{}", e);
                process::exit(2);
            }
        };

    let report = driver.run().join();

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                log::error!("failed to serialize report: {}", e);
                process::exit(2);
            }
        }
    } else {
        println!("{}", report);
    }

    if !report.all_passed() {
        process::exit(1);
    }
}
