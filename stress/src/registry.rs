/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::op::{OpResult, ToggleOp};
use crate::ops;

/// Builds the operation a client will drive, from its id and the
/// opaque argument given in the configuration.
pub type OpConstructor = Arc<
    dyn Fn(&str, &serde_json::Value) -> OpResult<Box<dyn ToggleOp>>
        + Send
        + Sync,
>;

#[derive(Clone, Default)]
pub struct OpRegistry {
    constructors: HashMap<String, OpConstructor>,
}

impl OpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("file", ops::FileToggle::construct);
        registry.register("delay", ops::Delay::construct);
        registry
    }

    pub fn register<S, F>(&mut self, name: S, constructor: F)
    where
        S: Into<String>,
        F: Fn(&str, &serde_json::Value) -> OpResult<Box<dyn ToggleOp>>
            + Send
            + Sync
            + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names = self
            .constructors
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn construct(
        &self,
        name: &str,
        client_id: &str,
        argument: &serde_json::Value,
    ) -> OpResult<Box<dyn ToggleOp>> {
        match self.constructors.get(name) {
            Some(constructor) => constructor(client_id, argument),
            None => Err(format!("unknown operation \"{}\"", name).into()),
        }
    }
}

impl fmt::Debug for OpRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpRegistry")
            .field("operations", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::OpRegistry;

    #[test]
    fn builtins() {
        let registry = OpRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["delay", "file"]);
        assert!(registry.contains("file"));
        assert!(!registry.contains("disk"));
        assert!(registry.construct("disk", "c0", &json!(null)).is_err());
        let op = registry.construct("delay", "c0", &json!({})).unwrap();
        assert_eq!(op.client_id(), "c0");
    }
}
