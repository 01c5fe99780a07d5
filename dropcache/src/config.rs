/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const MIB: u64 = 1 << 20;

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[serde(default)]
pub struct Config {
    /// Time between two usage readings.
    #[serde(with = "ops_serde::duration")]
    pub poll_interval: Duration,
    /// A write buffer at or below this many bytes counts as drained.
    pub low_water_mark: u64,
    /// Growth (in bytes per poll interval) considered a failure.
    pub steep_growth: u64,
    /// How long a drained disk is watched before it is declared done.
    #[serde(with = "ops_serde::duration")]
    pub wait_grace: Duration,
    /// Consecutive failed polls before giving up.
    pub poll_attempts: u32,
    #[serde(with = "ops_serde::duration")]
    pub retry_backoff: Duration,
    pub log_file: PathBuf,
    pub nodes: Nodes,
}

/// Layout of the kernel introspection tree.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[serde(default)]
pub struct Nodes {
    /// Directory with one entry per storage device.
    pub devices: String,
    /// Per-device info node and the field flagging solid-state devices.
    pub info: String,
    pub ssd_field: String,
    /// Per-device node and field reporting write buffer usage in bytes.
    pub usage: String,
    pub usage_field: String,
    /// Per-device node that drops the read cache when set.
    pub drop_read: String,
    /// Per-device node requesting a write buffer flush, if supported.
    pub flush_write: Option<String>,
    /// Tunables forced while waiting for the write buffers to drain.
    pub tunables: Vec<TunableSetting>,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct TunableSetting {
    pub path: String,
    pub value: u64,
    /// Skip (instead of failing) when the node does not exist.
    #[serde(default)]
    pub optional: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::ConfigFile(path.to_path_buf(), e))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll_interval must be positive"));
        }
        if self.poll_attempts == 0 {
            return Err(Error::InvalidConfig("poll_attempts must be at least 1"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            low_water_mark: 100 * MIB,
            steep_growth: 10 * MIB,
            wait_grace: Duration::from_secs(30),
            poll_attempts: 10,
            retry_backoff: Duration::from_secs(60),
            log_file: PathBuf::from("/var/log/dropcache.log"),
            nodes: Nodes::default(),
        }
    }
}

impl Default for Nodes {
    fn default() -> Self {
        Self {
            devices: "/vmkModules/plog/devices".to_string(),
            info: "info".to_string(),
            ssd_field: "isSSD".to_string(),
            usage: "elevStats".to_string(),
            usage_field: "wbUsage".to_string(),
            drop_read: "dropReadCache".to_string(),
            flush_write: Some("flushWriteBuffer".to_string()),
            tunables: vec![
                TunableSetting {
                    path: "/config/LSOM/intOpts/plogRunElevator".to_string(),
                    value: 1,
                    optional: false,
                },
                TunableSetting {
                    path: "/config/LSOM/intOpts/plogElevSleepTime".to_string(),
                    value: 1,
                    optional: false,
                },
                /* Not present on builds without deduplication. */
                TunableSetting {
                    path: "/config/LSOM/intOpts/lsomDedupThrottle".to_string(),
                    value: 0,
                    optional: true,
                },
            ],
        }
    }
}
