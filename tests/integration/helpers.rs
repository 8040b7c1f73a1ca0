//! Helper functions for integration tests

use chrono::{DateTime, Utc};
use vigil::Sample;
use vigil::thresholds::Thresholds;

pub fn sample(cpu: f32, ram: f32, disk: f32) -> Sample {
    Sample::new(cpu, ram, disk)
}

pub fn sample_at(timestamp: DateTime<Utc>, cpu: f32, ram: f32, disk: f32) -> Sample {
    Sample {
        timestamp,
        cpu_percent: cpu,
        ram_percent: ram,
        disk_percent: disk,
    }
}

pub fn thresholds_all(limit: usize) -> Thresholds {
    Thresholds {
        cpu: limit,
        ram: limit,
        disk: limit,
    }
}
