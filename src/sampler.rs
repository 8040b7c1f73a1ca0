//! Host metric sampling.
//!
//! CPU utilization needs two refreshes separated by a delay to produce a
//! meaningful delta-based average, so [`MetricSampler::sample`] blocks for
//! about a second instead of returning an instantaneous spot value.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use sysinfo::{Disks, System};
use tracing::trace;

use crate::Sample;

/// Averaging window for CPU utilization. Must stay above
/// `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`.
const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// Reads instantaneous CPU, memory, and root-filesystem utilization from
/// the operating system.
///
/// Owns a persistent [`System`] so consecutive samples see CPU usage
/// deltas rather than first-call zeros.
pub struct MetricSampler {
    system: System,
}

impl MetricSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Read one full sample. Takes roughly [`CPU_SAMPLE_WINDOW`].
    ///
    /// Never fabricates values: if any of the three reads is unavailable,
    /// the whole sample fails so the caller cannot persist a partial row.
    pub async fn sample(&mut self) -> Result<Sample, CollectionError> {
        self.system.refresh_cpu_usage();
        tokio::time::sleep(CPU_SAMPLE_WINDOW).await;
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(CollectionError::Cpu("no CPUs reported".to_string()));
        }
        let cpu_percent = cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / cpus.len() as f32;

        let total_memory = self.system.total_memory();
        if total_memory == 0 {
            return Err(CollectionError::Memory(
                "total memory reported as 0".to_string(),
            ));
        }
        let ram_percent = self.system.used_memory() as f32 / total_memory as f32 * 100.0;

        let disks = Disks::new_with_refreshed_list();
        let disk_percent = root_disk_usage(&disks)?;

        let sample = Sample::new(cpu_percent, ram_percent, disk_percent);
        trace!(
            "sampled CPU {:.2}% | RAM {:.2}% | DISK {:.2}%",
            sample.cpu_percent, sample.ram_percent, sample.disk_percent
        );
        Ok(sample)
    }
}

impl Default for MetricSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Utilization of the root filesystem, with the first listed disk as
/// fallback for hosts that mount no "/" (e.g. Windows).
fn root_disk_usage(disks: &Disks) -> Result<f32, CollectionError> {
    let disk = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first())
        .ok_or_else(|| CollectionError::Disk("no disks reported".to_string()))?;

    let total = disk.total_space();
    if total == 0 {
        return Err(CollectionError::Disk(format!(
            "disk {:?} reports 0 total space",
            disk.mount_point()
        )));
    }

    Ok((total - disk.available_space()) as f32 / total as f32 * 100.0)
}

/// An OS metric read failed; the tick that requested the sample is skipped.
#[derive(Debug)]
pub enum CollectionError {
    Cpu(String),
    Memory(String),
    Disk(String),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::Cpu(msg) => write!(f, "failed to read CPU utilization: {}", msg),
            CollectionError::Memory(msg) => write!(f, "failed to read memory utilization: {}", msg),
            CollectionError::Disk(msg) => write!(f, "failed to read disk utilization: {}", msg),
        }
    }
}

impl std::error::Error for CollectionError {}
