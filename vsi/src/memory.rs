/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use parking_lot::Mutex;

use crate::{join_path, Error, Result, SysInfo, Value};

/// An in-memory introspection tree. Besides plain nodes it supports
/// scripted values (each `get` consumes the next one, the last one
/// sticks), injected failures and a journal of every `set`.
#[derive(Default, Debug)]
pub struct MemSysInfo {
    state: Mutex<State>,
}

#[derive(Default, Debug)]
struct State {
    nodes: BTreeMap<String, Value>,
    scripts: HashMap<String, VecDeque<Value>>,
    failures: HashMap<String, usize>,
    journal: Vec<(String, String)>,
}

impl MemSysInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<V: Into<Value>>(&self, path: &str, value: V) {
        self.state.lock().nodes.insert(join_path([path]), value.into());
    }

    pub fn remove(&self, path: &str) -> Option<Value> {
        self.state.lock().nodes.remove(&join_path([path]))
    }

    /// Queue values to be returned by successive reads of `path`.
    pub fn script<I, V>(&self, path: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let path = join_path([path]);
        let mut state = self.state.lock();
        let queue = state.scripts.entry(path.clone()).or_default();
        queue.extend(values.into_iter().map(Into::into));
        if !state.nodes.contains_key(&path) {
            if let Some(first) = state.scripts[&path].front().cloned() {
                state.nodes.insert(path, first);
            }
        }
    }

    /// Make the next `count` accesses to `path` fail.
    pub fn fail(&self, path: &str, count: usize) {
        *self.state.lock().failures.entry(join_path([path])).or_default() +=
            count;
    }

    /// Current value, without consuming scripted values.
    pub fn peek(&self, path: &str) -> Option<Value> {
        self.state.lock().nodes.get(&join_path([path])).cloned()
    }

    /// Every `set` performed so far, in order.
    pub fn journal(&self) -> Vec<(String, String)> {
        self.state.lock().journal.clone()
    }
}

impl State {
    fn check_failure(&mut self, path: &str) -> Result<()> {
        match self.failures.get_mut(path) {
            Some(n) if *n > 0 => {
                *n -= 1;
                Err(Error::NonZeroExitStatus(
                    Some(1),
                    format!("injected failure for {}", path),
                ))
            }
            _ => Ok(()),
        }
    }
}

impl SysInfo for MemSysInfo {
    fn list(&self, path: &str) -> Result<Vec<String>> {
        let dir = join_path([path]);
        let prefix = match dir.as_str() {
            "/" => "/".to_string(),
            _ => format!("{}/", dir),
        };
        let state = self.state.lock();
        let children = state
            .nodes
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(|name| name.to_string())
            .collect::<BTreeSet<_>>();
        match children.is_empty() && !state.nodes.contains_key(&dir) {
            true => Err(Error::NotFound(dir)),
            false => Ok(children.into_iter().collect()),
        }
    }

    fn get(&self, path: &str) -> Result<Value> {
        let path = join_path([path]);
        let mut state = self.state.lock();
        state.check_failure(&path)?;
        if let Some(next) =
            state.scripts.get_mut(&path).and_then(VecDeque::pop_front)
        {
            state.nodes.insert(path.clone(), next);
        }
        state.nodes.get(&path).cloned().ok_or(Error::NotFound(path))
    }

    fn set(&self, path: &str, value: &str) -> Result<()> {
        let path = join_path([path]);
        let mut state = self.state.lock();
        state.check_failure(&path)?;
        match state.nodes.get_mut(&path) {
            Some(node) => node.assign(value),
            None => return Err(Error::NotFound(path)),
        }
        state.journal.push((path, value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemSysInfo;
    use crate::{Record, SysInfo, Value};

    #[test]
    fn list_children() {
        let sys = MemSysInfo::new();
        sys.insert("/vmkModules/plog/devices/naa.1/info", Record::new("info"));
        sys.insert("/vmkModules/plog/devices/naa.2/info", Record::new("info"));
        sys.insert("/vmkModules/plog/devices/naa.2/elevStats", 0u64);
        assert_eq!(
            sys.list("/vmkModules/plog/devices/").unwrap(),
            vec!["naa.1", "naa.2"]
        );
        assert_eq!(sys.list("/").unwrap(), vec!["vmkModules"]);
        assert!(sys.list("/vmkModules/lsom").unwrap_err().is_not_found());
    }

    #[test]
    fn scripted_values_then_stick() {
        let sys = MemSysInfo::new();
        sys.script("/usage", [3u64, 2, 1]);
        assert_eq!(sys.peek("/usage"), Some(Value::Unsigned(3)));
        let reads = (0..5)
            .map(|_| sys.get("/usage").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            reads,
            [3u64, 2, 1, 1, 1].map(Value::Unsigned).to_vec()
        );
    }

    #[test]
    fn injected_failures() {
        let sys = MemSysInfo::new();
        sys.insert("/x", 1u64);
        sys.fail("/x", 2);
        assert!(sys.get("/x").is_err());
        assert!(sys.set("/x", "2").is_err());
        assert_eq!(sys.get("/x").unwrap(), Value::Unsigned(1));
    }

    #[test]
    fn set_requires_existing_node() {
        let sys = MemSysInfo::new();
        sys.insert("/config/opt", Record::option(1));
        sys.set("/config/opt", "0").unwrap();
        assert_eq!(sys.get("/config/opt").unwrap().option_value("/config/opt").unwrap(), 0);
        assert!(sys.set("/config/missing", "0").unwrap_err().is_not_found());
        assert_eq!(sys.journal(), vec![("/config/opt".to_string(), "0".to_string())]);
    }
}
