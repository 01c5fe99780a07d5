/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::path::PathBuf;

use thiserror::Error;

use crate::Bytes;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Vsi(#[from] vsi::Error),
    #[error("{disk}: write buffer grew from {previous} to {current} in one poll interval")]
    SteepGrowth {
        disk: String,
        previous: Bytes,
        current: Bytes,
    },
    #[error("polling failed {0} time(s) in a row; last error: {1}")]
    PollFailed(u32, Box<Error>),
    #[error("failed to restore {0}: {1}")]
    Restore(String, vsi::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("failed to read {0}: {1}")]
    ConfigFile(PathBuf, std::io::Error),
    #[error("JSON error: {0}")]
    JSON(#[from] serde_json::Error),
}
