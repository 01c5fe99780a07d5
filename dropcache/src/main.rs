/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use dropcache::{Config, DrainMonitor, DrainOutcome, DropOptions};
use logger::Verbosity;
use vsi::Vsish;

/// Drop the VSAN read and/or write caches on this host.
#[derive(Parser, Debug)]
#[command(name = "dropcache", version)]
struct Args {
    /// Stop waiting for the write buffers to drain after this many
    /// seconds (0 = wait forever).
    #[arg(short = 'W', long = "maxWait", value_name = "SECONDS", default_value_t = 0)]
    max_wait: u64,
    /// Do not wait for the write buffers to drain.
    #[arg(long = "noWait")]
    no_wait: bool,
    /// Drop the read cache.
    #[arg(short = 'r', long = "rd")]
    read: bool,
    /// Drop the write cache.
    #[arg(short = 'w', long = "wr")]
    write: bool,
    /// Log debug output to the terminal.
    #[arg(long)]
    verbose: bool,
    /// JSON file overriding thresholds and node paths.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// The vsish binary to use.
    #[arg(long, value_name = "PATH", default_value = "vsish")]
    vsish: PathBuf,
    /// Log file (defaults to the one in the configuration).
    #[arg(long = "log-file", value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    if !args.read && !args.write {
        eprintln!("Error: nothing to do; specify --rd and/or --wr (see --help)");
        process::exit(1);
    }

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(2);
            }
        },
        None => Config::default(),
    };

    let log_file = args.log_file.clone().unwrap_or_else(|| config.log_file.clone());
    if let Err(e) = logger::init(Verbosity::from_flag(args.verbose), Some(&log_file)) {
        eprintln!("Error: failed to initialize logging: {}", e);
        process::exit(2);
    }

    let opts = DropOptions {
        read: args.read,
        write: args.write,
        wait: !args.no_wait,
        max_wait: Some(Duration::from_secs(args.max_wait)),
    };
    let monitor = DrainMonitor::new(Vsish::with_binary(&args.vsish), config);

    match monitor.drop_caches(&opts) {
        Ok(report) => {
            if report.drain == Some(DrainOutcome::TimedOut) {
                log::warn!("write buffers did not drain within {}s", args.max_wait);
            }
            log::info!(
                "done: {} flush request(s), {} read cache(s) dropped",
                report.flush_requested,
                report.read_dropped
            );
        }
        Err(e) => {
            log::error!("{}", e);
            process::exit(2);
        }
    }
}
