/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod barrier;
mod config;
mod driver;
mod error;
mod op;
pub mod ops;
mod registry;
mod report;

pub use barrier::{BreakReason, SyncBarrier, SyncOutcome};
pub use config::{ClientSpec, Config, GroupSpec, IterationLimit, Validator};
pub use driver::{Driver, RunningDriver};
pub use error::{Error, Result};
pub use op::{OpError, OpResult, Phase, SharedState, ToggleOp};
pub use registry::{OpConstructor, OpRegistry};
pub use report::{ClientReport, Report, Status};
