/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use vsi::SysInfo;

use crate::{Error, Result, TunableSetting};

/// Kernel tunables forced to new values for as long as the guard lives.
/// The original values are written back exactly once: by
/// [`TunableGuard::restore`], or on drop if that was never called.
pub struct TunableGuard<'a, S: SysInfo> {
    sys: &'a S,
    saved: Vec<(String, u64)>,
    restored: bool,
}

impl<'a, S: SysInfo> TunableGuard<'a, S> {
    pub fn acquire(sys: &'a S, settings: &[TunableSetting]) -> Result<Self> {
        let mut guard = Self {
            sys,
            saved: Vec::new(),
            restored: false,
        };

        for setting in settings {
            let current = match sys.get(&setting.path) {
                Ok(value) => value.option_value(&setting.path)?,
                Err(e) if e.is_not_found() && setting.optional => {
                    log::debug!(
                        "{} is not present on this build; leaving it alone",
                        setting.path
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if current != setting.value {
                log::debug!(
                    "setting {} to {} (was {})",
                    setting.path,
                    setting.value,
                    current
                );
                guard.saved.push((setting.path.clone(), current));
                sys.set(&setting.path, &setting.value.to_string())?;
            }
        }

        Ok(guard)
    }

    /// Tunables changed by this guard, with their original values.
    pub fn saved(&self) -> &[(String, u64)] {
        &self.saved
    }

    /// Write back the original values, most recent change first. Every
    /// tunable is attempted; the first failure is returned.
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;

        let mut result = Ok(());
        for (path, value) in self.saved.iter().rev() {
            match self.sys.set(path, &value.to_string()) {
                Ok(()) => log::debug!("restored {} to {}", path, value),
                Err(e) => {
                    log::warn!("failed to restore {} to {}: {}", path, value, e);
                    if result.is_ok() {
                        result = Err(Error::Restore(path.clone(), e));
                    }
                }
            }
        }
        result
    }
}

impl<'a, S: SysInfo> Drop for TunableGuard<'a, S> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            log::error!("{}", e);
        }
    }
}
