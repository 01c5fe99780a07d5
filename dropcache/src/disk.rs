/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::fmt;
use std::time::Duration;

use crate::{Config, Error, Result, MIB};

/// Usage reported by a device whose write buffer cannot be measured.
pub const USAGE_UNAVAILABLE: u64 = u64::MAX;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum DiskState {
    /// Waiting for the write buffer to drain below the low-water mark.
    Query,
    /// Drained; watching it for the grace period.
    Wait,
    Done,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct DiskRecord {
    pub name: String,
    pub state: DiskState,
    /// Only meaningful in [`DiskState::Wait`].
    pub wait_remaining: Duration,
    pub previous_usage: u64,
    pub usage_node: String,
}

impl DiskRecord {
    pub fn new(name: String, usage: u64, usage_node: String) -> Self {
        Self {
            name,
            state: DiskState::Query,
            wait_remaining: Duration::ZERO,
            previous_usage: usage,
            usage_node,
        }
    }

    /// Apply a usage reading taken one poll interval after the previous
    /// one. Only valid in [`DiskState::Query`].
    pub fn observe(&mut self, usage: u64, config: &Config) -> Result<()> {
        let drained = self.previous_usage as i128 - usage as i128;
        let rate = drained as f64 / config.poll_interval.as_secs_f64();

        if drained >= 0
            && (usage <= config.low_water_mark || usage == USAGE_UNAVAILABLE)
        {
            log::info!(
                "{}: write buffer at {}; waiting {:?} before declaring it drained",
                self.name,
                Bytes(usage),
                config.wait_grace
            );
            self.state = DiskState::Wait;
            self.wait_remaining = config.wait_grace;
        } else if -drained > config.steep_growth as i128
            && usage != USAGE_UNAVAILABLE
        {
            return Err(Error::SteepGrowth {
                disk: self.name.clone(),
                previous: Bytes(self.previous_usage),
                current: Bytes(usage),
            });
        } else {
            log::debug!(
                "{}: write buffer at {}, draining at {:.2} MiB/s",
                self.name,
                Bytes(usage),
                rate / MIB as f64
            );
        }

        self.previous_usage = usage;
        Ok(())
    }

    /// Count down the grace period. Only valid in [`DiskState::Wait`].
    pub fn tick(&mut self, interval: Duration) {
        self.wait_remaining = self.wait_remaining.saturating_sub(interval);
        if self.wait_remaining.is_zero() {
            log::info!("{}: done", self.name);
            self.state = DiskState::Done;
        }
    }
}

impl fmt::Display for DiskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "QUERY"),
            Self::Wait => write!(f, "WAIT"),
            Self::Done => write!(f, "DONE"),
        }
    }
}

/// A byte count, printed in MiB.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Bytes(pub u64);

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            USAGE_UNAVAILABLE => write!(f, "(unavailable)"),
            n => write!(f, "{:.1} MiB", n as f64 / MIB as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Bytes, DiskRecord, DiskState, USAGE_UNAVAILABLE};
    use crate::{Config, Error, MIB};

    fn record(usage: u64) -> DiskRecord {
        DiskRecord::new("naa.1".to_string(), usage, "/usage".to_string())
    }

    #[test]
    fn above_low_water_mark_keeps_querying() {
        let config = Config::default();
        let mut disk = record(500 * MIB);
        disk.observe(400 * MIB, &config).unwrap();
        assert_eq!(disk.state, DiskState::Query);
        assert_eq!(disk.previous_usage, 400 * MIB);
    }

    #[test]
    fn slow_growth_is_tolerated() {
        let config = Config::default();
        let mut disk = record(500 * MIB);
        disk.observe(505 * MIB, &config).unwrap();
        assert_eq!(disk.state, DiskState::Query);
        disk.observe(515 * MIB, &config).unwrap();
        assert_eq!(disk.state, DiskState::Query);
    }

    #[test]
    fn growth_below_low_water_mark_does_not_wait() {
        let config = Config::default();
        let mut disk = record(10 * MIB);
        disk.observe(20 * MIB, &config).unwrap();
        assert_eq!(disk.state, DiskState::Query);
    }

    #[test]
    fn steep_growth_fails() {
        let config = Config::default();
        let mut disk = record(200 * MIB);
        match disk.observe(220 * MIB, &config) {
            Err(Error::SteepGrowth { previous, current, .. }) => {
                assert_eq!(previous, Bytes(200 * MIB));
                assert_eq!(current, Bytes(220 * MIB));
            }
            r => panic!("expected steep growth error, got {:?}", r),
        }
        /* The failed reading is not recorded. */
        assert_eq!(disk.previous_usage, 200 * MIB);
    }

    #[test]
    fn sentinel_after_reading_waits_one_round_later() {
        let config = Config::default();
        let mut disk = record(300 * MIB);
        disk.observe(USAGE_UNAVAILABLE, &config).unwrap();
        assert_eq!(disk.state, DiskState::Query);
        disk.observe(USAGE_UNAVAILABLE, &config).unwrap();
        assert_eq!(disk.state, DiskState::Wait);
    }

    #[test]
    fn grace_period_counts_down() {
        let config = Config::default();
        let mut disk = record(120 * MIB);
        disk.observe(90 * MIB, &config).unwrap();
        assert_eq!(disk.state, DiskState::Wait);
        assert_eq!(disk.wait_remaining, Duration::from_secs(30));
        disk.tick(config.poll_interval);
        disk.tick(config.poll_interval);
        assert_eq!(disk.state, DiskState::Wait);
        disk.tick(config.poll_interval);
        assert_eq!(disk.state, DiskState::Done);
    }

    #[test]
    fn bytes_display() {
        assert_eq!(Bytes(150 * MIB).to_string(), "150.0 MiB");
        assert_eq!(Bytes(USAGE_UNAVAILABLE).to_string(), "(unavailable)");
    }
}
