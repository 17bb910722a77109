//! Speaker configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, StateError};

/// Default port of the Mopidy HTTP frontend
pub const DEFAULT_PORT: u16 = 6680;

/// Connection and tuning settings for one speaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerConfig {
    pub host: String,
    pub port: u16,
    /// Capacity of each metadata cache (titles, artwork)
    pub cache_capacity: usize,
    /// Volume change applied by `volume_up`/`volume_down`
    pub volume_step: u8,
    /// Pause between playback state polls while restoring a snapshot
    pub restore_retry_interval_ms: u64,
    /// Polls before a snapshot restore gives up
    pub restore_retry_max: u32,
    /// Default number of entries returned by `get_history`
    pub history_limit: usize,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            cache_capacity: 1000,
            volume_step: 5,
            restore_retry_interval_ms: 500,
            restore_retry_max: 120,
            history_limit: 20,
        }
    }
}

impl SpeakerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Base url relative artwork paths are resolved against
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn restore_retry_interval(&self) -> Duration {
        Duration::from_millis(self.restore_retry_interval_ms)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(StateError::validation("Host must not be empty"));
        }
        if self.cache_capacity == 0 {
            return Err(StateError::validation("Cache capacity must be at least 1"));
        }
        Ok(())
    }
}
