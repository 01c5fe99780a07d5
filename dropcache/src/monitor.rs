/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::BTreeMap;
use std::time::Duration;

use vsi::{join_path, SysInfo, Value};

use crate::{
    Bytes, Clock, Config, DiskRecord, DiskState, Error, Result, SystemClock,
    TunableGuard, USAGE_UNAVAILABLE,
};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum DrainOutcome {
    Drained,
    /// The wait limit passed before every disk was done.
    TimedOut,
}

/// Everything a drain session needs: where to read and write kernel
/// nodes, the thresholds, and the clock to pace the polling with.
#[derive(Debug)]
pub struct DrainMonitor<S, C = SystemClock> {
    pub(crate) sys: S,
    pub(crate) config: Config,
    pub(crate) clock: C,
}

impl<S: SysInfo> DrainMonitor<S> {
    pub fn new(sys: S, config: Config) -> Self {
        Self::with_clock(sys, config, SystemClock)
    }
}

impl<S: SysInfo, C: Clock> DrainMonitor<S, C> {
    pub fn with_clock(sys: S, config: Config, clock: C) -> Self {
        Self { sys, config, clock }
    }

    /// Names of the solid-state devices, i.e. the cache tier.
    pub fn solid_state_devices(&self) -> Result<Vec<String>> {
        let nodes = &self.config.nodes;
        let mut devices = Vec::new();

        for name in self.sys.list(&nodes.devices)? {
            let info_node = join_path([&nodes.devices, &name, &nodes.info]);
            let info = self.sys.get(&info_node)?;
            match info.field(&nodes.ssd_field).and_then(Value::as_u64) {
                Some(n) if n != 0 => devices.push(name),
                _ => log::debug!("{}: not a solid-state device", name),
            }
        }

        Ok(devices)
    }

    /// Initial records for every solid-state device, all in
    /// [`DiskState::Query`].
    pub fn build_disk_list(&self) -> Result<BTreeMap<String, DiskRecord>> {
        let nodes = &self.config.nodes;
        let mut records = BTreeMap::new();

        for name in self.solid_state_devices()? {
            let usage_node = join_path([&nodes.devices, &name, &nodes.usage]);
            let usage = self.read_usage(&usage_node)?;
            log::info!("{}: write buffer at {}", name, Bytes(usage));
            records.insert(name.clone(), DiskRecord::new(name, usage, usage_node));
        }

        Ok(records)
    }

    /// Advance every record by one poll interval. Returns whether all
    /// of them are done. On error the records are left untouched.
    pub fn poll_once(
        &self,
        records: &mut BTreeMap<String, DiskRecord>,
    ) -> Result<bool> {
        let mut next = records.clone();

        for record in next.values_mut() {
            match record.state {
                DiskState::Query => {
                    let usage = self.read_usage(&record.usage_node)?;
                    record.observe(usage, &self.config)?;
                }
                DiskState::Wait => record.tick(self.config.poll_interval),
                DiskState::Done => {}
            }
        }

        *records = next;
        Ok(records.values().all(|r| r.state == DiskState::Done))
    }

    /// Force the elevator tunables and poll until every write buffer is
    /// drained or `max_wait` (`None` or zero: forever) has passed. The
    /// tunables are restored on every exit path.
    pub fn run_until_drained(
        &self,
        max_wait: Option<Duration>,
    ) -> Result<DrainOutcome> {
        let mut guard =
            TunableGuard::acquire(&self.sys, &self.config.nodes.tunables)?;
        let result = self.drain(max_wait.filter(|d| !d.is_zero()));

        match (result, guard.restore()) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                log::error!("{}", restore_err);
                Err(e)
            }
        }
    }

    fn drain(&self, max_wait: Option<Duration>) -> Result<DrainOutcome> {
        let started = self.clock.now();
        let mut records = self.build_disk_list()?;
        if records.is_empty() {
            log::warn!("no solid-state devices found; nothing to drain");
            return Ok(DrainOutcome::Drained);
        }

        let mut failures = 0;
        let mut delay = self.config.poll_interval;

        loop {
            self.clock.sleep(delay);

            match self.poll_once(&mut records) {
                Ok(true) => {
                    log::info!(
                        "all write buffers drained after {:?}",
                        self.clock.now().duration_since(started)
                    );
                    return Ok(DrainOutcome::Drained);
                }
                Ok(false) => {
                    failures = 0;
                    delay = self.config.poll_interval;
                }
                Err(e) => {
                    failures += 1;
                    if failures >= self.config.poll_attempts {
                        return Err(Error::PollFailed(failures, Box::new(e)));
                    }
                    log::warn!(
                        "poll failed ({}/{}): {}; retrying in {:?}",
                        failures,
                        self.config.poll_attempts,
                        e,
                        self.config.retry_backoff
                    );
                    delay = self.config.retry_backoff;
                }
            }

            if let Some(max_wait) = max_wait {
                if self.clock.now().duration_since(started) >= max_wait {
                    let pending = records
                        .values()
                        .filter(|r| r.state != DiskState::Done)
                        .map(|r| format!("{} ({})", r.name, r.state))
                        .collect::<Vec<_>>();
                    log::warn!(
                        "stopped waiting after {:?}; not drained: {}",
                        max_wait,
                        pending.join(", ")
                    );
                    return Ok(DrainOutcome::TimedOut);
                }
            }
        }
    }

    fn read_usage(&self, node: &str) -> Result<u64> {
        let value = self.sys.get(node)?;
        match value.try_field(node, &self.config.nodes.usage_field)? {
            Value::Signed(-1) => Ok(USAGE_UNAVAILABLE),
            usage => Ok(usage.try_u64(node)?),
        }
    }
}
