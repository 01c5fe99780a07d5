/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::BTreeMap;
use std::fmt;

/// State a synchronization group shares for one barrier round.
pub type SharedState = BTreeMap<String, serde_json::Value>;

pub type OpError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type OpResult<T> = std::result::Result<T, OpError>;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Phase {
    On,
    Off,
}

/// Something that can be switched on and off and checked in each state.
/// One instance is owned by exactly one client thread.
pub trait ToggleOp: Send {
    fn client_id(&self) -> &str;

    fn on(&mut self) -> OpResult<()>;
    fn on_verify(&mut self) -> OpResult<bool>;
    fn off(&mut self) -> OpResult<()>;
    fn off_verify(&mut self) -> OpResult<bool>;

    /// Contribute to the group's shared state right before the
    /// rendezvous that follows `phase`.
    fn share(&self, _phase: Phase, _shared: &mut SharedState) {}
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
        }
    }
}
