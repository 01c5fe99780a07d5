/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod clock;
mod config;
mod disk;
mod drop;
mod error;
mod monitor;
mod tunables;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, Nodes, TunableSetting, MIB};
pub use disk::{Bytes, DiskRecord, DiskState, USAGE_UNAVAILABLE};
pub use drop::{DropOptions, DropReport};
pub use error::{Error, Result};
pub use monitor::{DrainMonitor, DrainOutcome};
pub use tunables::TunableGuard;
