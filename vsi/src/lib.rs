/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod error;
mod memory;
mod sysinfo;
mod value;
mod vsish;

pub use error::{Error, Result};
pub use memory::MemSysInfo;
pub use sysinfo::{join_path, SysInfo};
pub use value::{Record, Value};
pub use vsish::Vsish;
