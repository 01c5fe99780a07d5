/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::time::Duration;

use vsi::{join_path, SysInfo};

use crate::{Clock, DrainMonitor, DrainOutcome, Result};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct DropOptions {
    pub read: bool,
    pub write: bool,
    /// Wait for the write buffers to drain (only with `write`).
    pub wait: bool,
    pub max_wait: Option<Duration>,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct DropReport {
    /// Outcome of waiting for the write buffers, if we waited.
    pub drain: Option<DrainOutcome>,
    pub flush_requested: usize,
    pub read_dropped: usize,
}

impl Default for DropOptions {
    fn default() -> Self {
        Self {
            read: false,
            write: false,
            wait: true,
            max_wait: None,
        }
    }
}

impl<S: SysInfo, C: Clock> DrainMonitor<S, C> {
    /// Drop the requested caches: the write buffers first (flush and,
    /// unless disabled, wait for the drain), then the read caches.
    pub fn drop_caches(&self, opts: &DropOptions) -> Result<DropReport> {
        let mut report = DropReport::default();

        if opts.write {
            report.flush_requested = self.request_flush()?;
            if opts.wait {
                report.drain = Some(self.run_until_drained(opts.max_wait)?);
            } else {
                log::info!("not waiting for the write buffers to drain");
            }
        }

        if opts.read {
            report.read_dropped = self.drop_read_caches()?;
        }

        Ok(report)
    }

    fn request_flush(&self) -> Result<usize> {
        let nodes = &self.config.nodes;
        let flush = match &nodes.flush_write {
            Some(flush) => flush,
            None => return Ok(0),
        };

        let mut requested = 0;
        for name in self.solid_state_devices()? {
            let node = join_path([&nodes.devices, &name, flush]);
            match self.sys.set(&node, "1") {
                Ok(()) => {
                    log::info!("{}: write buffer flush requested", name);
                    requested += 1;
                }
                Err(e) if e.is_not_found() => {
                    log::debug!("{}: no flush node on this build", name);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(requested)
    }

    fn drop_read_caches(&self) -> Result<usize> {
        let nodes = &self.config.nodes;
        let devices = self.solid_state_devices()?;
        for name in &devices {
            self.sys
                .set(&join_path([&nodes.devices, name, &nodes.drop_read]), "1")?;
            log::info!("{}: read cache dropped", name);
        }
        Ok(devices.len())
    }
}
