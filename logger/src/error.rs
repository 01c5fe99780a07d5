/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to open log file {0}: {1}")]
    LogFile(PathBuf, std::io::Error),
    #[error("failed to install logger: {0}")]
    SetLogger(#[from] log::SetLoggerError),
}
