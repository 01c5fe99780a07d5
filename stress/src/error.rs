/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown operation \"{1}\" for client {0}")]
    UnknownOperation(String, String),
    #[error("Client {0} has neither an iteration nor a duration limit")]
    Unbounded(String),
    #[error("Duplicate client id {0}")]
    DuplicateId(String),
    #[error("Failed to read {0}: {1}")]
    ConfigFile(PathBuf, std::io::Error),
    #[error("JSON error: {0}")]
    JSON(#[from] serde_json::Error),
}
