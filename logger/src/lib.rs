/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod error;

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;

use serde::{Deserialize, Serialize};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger,
    TermLogger, TerminalMode, WriteLogger,
};

pub use error::{Error, Result};

#[derive(
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Clone,
    Copy,
    Debug,
)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Warning,
    Info,
    Debug,
}

impl Verbosity {
    /// Pick the verbosity for a `--verbose` style flag.
    pub fn from_flag(verbose: bool) -> Self {
        match verbose {
            true => Self::Debug,
            false => Self::Info,
        }
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            Self::Warning => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "Warning"),
            Self::Info => write!(f, "Info"),
            Self::Debug => write!(f, "Debug"),
        }
    }
}

/// Install the process-wide logger: the terminal (stderr) at the
/// requested verbosity and, if given, a log file that always receives
/// debug output. The file is appended to, never truncated.
pub fn init(verbosity: Verbosity, log_file: Option<&Path>) -> Result<()> {
    let config = ConfigBuilder::new().build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        verbosity.level_filter(),
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::LogFile(path.to_path_buf(), e))?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, config, file));
    }

    CombinedLogger::init(loggers)?;
    log::debug!("Logging initialized at {} verbosity", verbosity);
    Ok(())
}
