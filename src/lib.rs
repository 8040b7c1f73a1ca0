pub mod alerts;
pub mod config;
pub mod sampler;
pub mod scheduler;
pub mod storage;
pub mod thresholds;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped reading of host utilization.
///
/// The timestamp is stamped by the sampler at collection time and is never
/// user-supplied. The surrogate row id is assigned by the store on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub disk_percent: f32,
}

impl Sample {
    pub fn new(cpu_percent: f32, ram_percent: f32, disk_percent: f32) -> Self {
        Self {
            timestamp: Utc::now(),
            cpu_percent,
            ram_percent,
            disk_percent,
        }
    }
}
