/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use crate::{Result, Value};

/// The hierarchical key-value namespace exposed by the kernel: directories
/// can be listed, leaves read and (for writable nodes) set.
pub trait SysInfo {
    /// List the entries of a directory node. Names are returned without
    /// trailing separator.
    fn list(&self, path: &str) -> Result<Vec<String>>;
    fn get(&self, path: &str) -> Result<Value>;
    fn set(&self, path: &str, value: &str) -> Result<()>;
}

impl<T: SysInfo + ?Sized> SysInfo for &T {
    fn list(&self, path: &str) -> Result<Vec<String>> {
        (**self).list(path)
    }

    fn get(&self, path: &str) -> Result<Value> {
        (**self).get(path)
    }

    fn set(&self, path: &str, value: &str) -> Result<()> {
        (**self).set(path, value)
    }
}

/// Join node path components, collapsing duplicate separators.
pub fn join_path<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut path = String::new();
    for part in parts {
        for component in part.as_ref().split('/').filter(|c| !c.is_empty()) {
            path.push('/');
            path.push_str(component);
        }
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

#[cfg(test)]
mod tests {
    use super::join_path;

    #[test]
    fn join() {
        assert_eq!(
            join_path(["/vmkModules/plog/devices/", "naa.1", "info"]),
            "/vmkModules/plog/devices/naa.1/info"
        );
        assert_eq!(join_path(["//config/", "/LSOM//"]), "/config/LSOM");
        assert_eq!(join_path::<_, &str>([]), "/");
    }
}
