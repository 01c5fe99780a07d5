/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

//! Builtin operations.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io, thread};

use serde::Deserialize;

use crate::op::{OpResult, Phase, SharedState, ToggleOp};

/// Creates `<dir>/<client id>` when switched on and removes it when
/// switched off. Shares whether the file exists.
#[derive(Debug)]
pub struct FileToggle {
    id: String,
    path: PathBuf,
}

#[derive(Deserialize)]
struct FileArgs {
    dir: PathBuf,
}

/// Sleeps in each phase. Always verifies.
#[derive(Debug)]
pub struct Delay {
    id: String,
    on: Duration,
    off: Duration,
}

#[derive(Deserialize)]
struct DelayArgs {
    #[serde(default, with = "ops_serde::duration")]
    on: Duration,
    #[serde(default, with = "ops_serde::duration")]
    off: Duration,
}

impl FileToggle {
    pub fn construct(
        id: &str,
        argument: &serde_json::Value,
    ) -> OpResult<Box<dyn ToggleOp>> {
        let args: FileArgs = serde_json::from_value(argument.clone())?;
        /* The id names the file; it must not reach outside `dir`. */
        if Path::new(id).file_name() != Some(OsStr::new(id)) {
            return Err(format!("\"{}\" is not a valid file name", id).into());
        }
        if !args.dir.is_dir() {
            return Err(
                format!("{} is not a directory", args.dir.display()).into()
            );
        }
        Ok(Box::new(Self {
            id: id.to_string(),
            path: args.dir.join(id),
        }))
    }
}

impl ToggleOp for FileToggle {
    fn client_id(&self) -> &str {
        &self.id
    }

    fn on(&mut self) -> OpResult<()> {
        Ok(fs::write(&self.path, &self.id)?)
    }

    fn on_verify(&mut self) -> OpResult<bool> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content == self.id),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn off(&mut self) -> OpResult<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn off_verify(&mut self) -> OpResult<bool> {
        Ok(!self.path.exists())
    }

    fn share(&self, _phase: Phase, shared: &mut SharedState) {
        shared.insert(self.id.clone(), self.path.exists().into());
    }
}

impl Delay {
    pub fn construct(
        id: &str,
        argument: &serde_json::Value,
    ) -> OpResult<Box<dyn ToggleOp>> {
        let args: DelayArgs = match argument {
            serde_json::Value::Null => DelayArgs {
                on: Duration::ZERO,
                off: Duration::ZERO,
            },
            _ => serde_json::from_value(argument.clone())?,
        };
        Ok(Box::new(Self {
            id: id.to_string(),
            on: args.on,
            off: args.off,
        }))
    }
}

impl ToggleOp for Delay {
    fn client_id(&self) -> &str {
        &self.id
    }

    fn on(&mut self) -> OpResult<()> {
        thread::sleep(self.on);
        Ok(())
    }

    fn on_verify(&mut self) -> OpResult<bool> {
        Ok(true)
    }

    fn off(&mut self) -> OpResult<()> {
        thread::sleep(self.off);
        Ok(())
    }

    fn off_verify(&mut self) -> OpResult<bool> {
        Ok(true)
    }
}
