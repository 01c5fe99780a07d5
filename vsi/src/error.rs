/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The node does not exist (typically: the feature is not present
    /// on this build).
    #[error("no such node: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    IO(#[from] std::io::Error),
    #[error("vsish exited with code {0:?}: {1}")]
    NonZeroExitStatus(Option<i32>, String),
    #[error("failed to parse output for {0}: {1}")]
    Parse(String, String),
    #[error("{0}: missing field \"{1}\"")]
    MissingField(String, String),
    #[error("{0}: expected {1}, found {2}")]
    Type(String, &'static str, String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
