/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::op::SharedState;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Maximum time a client waits for its peers at a barrier.
    /// `null` waits forever.
    #[serde(
        default = "default_sync_timeout",
        with = "ops_serde::duration::option"
    )]
    pub sync_timeout: Option<Duration>,
    pub groups: Vec<GroupSpec>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct GroupSpec {
    pub clients: Vec<ClientSpec>,
    /// Require every value shared in a round to be equal.
    #[serde(default, skip_serializing_if = "is_false")]
    pub consistent: bool,
    #[serde(skip)]
    pub validator: Validator,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClientSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub operation: String,
    #[serde(default)]
    pub argument: serde_json::Value,
    #[serde(default)]
    pub limit: IterationLimit,
    #[serde(default)]
    pub sync: bool,
    #[serde(default = "default_count")]
    pub count: usize,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct IterationLimit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u64>,
    #[serde(
        default,
        with = "ops_serde::duration::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_duration: Option<Duration>,
}

/// Group-level check run by the last client to arrive at a barrier.
#[derive(Clone)]
pub struct Validator(Arc<dyn Fn(&SharedState) -> bool + Send + Sync>);

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| Error::ConfigFile(path.to_path_buf(), e))?;
        Ok(serde_json::from_slice(&data)?)
    }
}

impl GroupSpec {
    pub fn new(clients: Vec<ClientSpec>) -> Self {
        Self {
            clients,
            consistent: false,
            validator: Validator::default(),
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }
}

impl ClientSpec {
    pub fn new<S: Into<String>>(operation: S, limit: IterationLimit) -> Self {
        Self {
            id: None,
            operation: operation.into(),
            argument: serde_json::Value::Null,
            limit,
            sync: false,
            count: 1,
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_argument(mut self, argument: serde_json::Value) -> Self {
        self.argument = argument;
        self
    }

    pub fn synced(mut self) -> Self {
        self.sync = true;
        self
    }

    pub fn times(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

impl IterationLimit {
    pub fn iterations(n: u64) -> Self {
        Self {
            max_iterations: Some(n),
            max_duration: None,
        }
    }

    pub fn duration(d: Duration) -> Self {
        Self {
            max_iterations: None,
            max_duration: Some(d),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.max_iterations.is_some() || self.max_duration.is_some()
    }

    /// Whichever limit is hit first ends the loop.
    pub fn reached(&self, iterations: u64, elapsed: Duration) -> bool {
        self.max_iterations.map_or(false, |max| iterations >= max)
            || self.max_duration.map_or(false, |max| elapsed >= max)
    }
}

impl Validator {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&SharedState) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    /// Passes when all shared values are equal.
    pub fn consistent() -> Self {
        Self::new(|shared| {
            let mut values = shared.values();
            match values.next() {
                Some(first) => values.all(|v| v == first),
                None => true,
            }
        })
    }

    pub fn check(&self, shared: &SharedState) -> bool {
        (self.0)(shared)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(|_| true)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validator")
    }
}

fn default_sync_timeout() -> Option<Duration> {
    Some(Duration::from_secs(60))
}

fn default_count() -> usize {
    1
}

fn is_false(b: &bool) -> bool {
    !b
}
