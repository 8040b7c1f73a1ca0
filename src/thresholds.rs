//! Threshold policy: maps a sample to a breach decision.

use crate::Sample;

/// Breach percentages for the three sampled metrics. Loaded once at
/// startup and immutable for the process lifetime.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub cpu: usize,
    pub ram: usize,
    pub disk: usize,
}

/// Outcome of evaluating one sample against the configured thresholds.
#[derive(Debug, Clone)]
pub struct BreachDecision {
    pub triggered: bool,
    pub message: String,
}

impl BreachDecision {
    /// Evaluate one sample. A breach is any single metric at or above its
    /// threshold (`>=`, not `>`).
    ///
    /// The message reports all three metrics with their thresholds so an
    /// operator sees the full picture; only the breaching ones are marked
    /// red. Pure: no clock reads, no I/O.
    pub fn evaluate(sample: &Sample, thresholds: &Thresholds, host: &str) -> Self {
        let cpu_breached = sample.cpu_percent >= thresholds.cpu as f32;
        let ram_breached = sample.ram_percent >= thresholds.ram as f32;
        let disk_breached = sample.disk_percent >= thresholds.disk as f32;

        let message = format!(
            "⚠️ **Vigil Host Alert** ⚠️\n\n\
             🏠 Host: {host}\n\
             🕒 Timestamp: {timestamp}\n\
             {cpu_marker} CPU Usage: {cpu:.2}% (Threshold = {cpu_limit}%)\n\
             {ram_marker} RAM Usage: {ram:.2}% (Threshold = {ram_limit}%)\n\
             {disk_marker} DISK Usage: {disk:.2}% (Threshold = {disk_limit}%)\n",
            timestamp = sample.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            cpu_marker = marker(cpu_breached),
            cpu = sample.cpu_percent,
            cpu_limit = thresholds.cpu,
            ram_marker = marker(ram_breached),
            ram = sample.ram_percent,
            ram_limit = thresholds.ram,
            disk_marker = marker(disk_breached),
            disk = sample.disk_percent,
            disk_limit = thresholds.disk,
        );

        Self {
            triggered: cpu_breached || ram_breached || disk_breached,
            message,
        }
    }
}

fn marker(breached: bool) -> &'static str {
    if breached { "🔴" } else { "🟢" }
}
