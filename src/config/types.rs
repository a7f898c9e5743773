use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::bridge::BridgeTuning;
use crate::classify::Policy;
use crate::scheduler::{ChunkScheduler, DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub policy: Policy,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Bytes requested per read
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Per-file parse deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn scheduler(&self) -> ChunkScheduler {
        ChunkScheduler::new(self.chunk_size, Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Readiness announcement cadence in milliseconds
    #[serde(default = "default_announce_interval_ms")]
    pub announce_interval_ms: u64,

    #[serde(default = "default_announce_budget")]
    pub announce_budget: u32,

    /// Direct-host polling cadence in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_poll_budget")]
    pub poll_budget: u32,

    /// Base URL for redirect-fallback delivery
    #[serde(default = "default_host_base_url")]
    pub host_base_url: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            announce_interval_ms: default_announce_interval_ms(),
            announce_budget: default_announce_budget(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_budget: default_poll_budget(),
            host_base_url: default_host_base_url(),
        }
    }
}

impl BridgeConfig {
    pub fn tuning(&self) -> BridgeTuning {
        BridgeTuning {
            announce_interval: Duration::from_millis(self.announce_interval_ms),
            announce_budget: self.announce_budget,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_budget: self.poll_budget,
            host_base_url: self.host_base_url.clone(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_announce_interval_ms() -> u64 {
    1500
}

fn default_announce_budget() -> u32 {
    10
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_poll_budget() -> u32 {
    40
}

fn default_host_base_url() -> String {
    "http://localhost:8501".to_string()
}
