//! Process configuration, read once at startup.
//!
//! Every knob comes from the environment (optionally seeded from a dotenv
//! file by the binary). Components receive the resulting [`Config`] by
//! value/reference and never read process state themselves.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::thresholds::Thresholds;

const DB_FILE: &str = "DB_FILE";
const CPU_THRESHOLD: &str = "CPU_THRESHOLD";
const RAM_THRESHOLD: &str = "RAM_THRESHOLD";
const DISK_THRESHOLD: &str = "DISK_THRESHOLD";
const CHECK_INTERVAL: &str = "CHECK_INTERVAL";
const CHECK_INTERVAL_UNIT: &str = "CHECK_INTERVAL_UNIT";
const RETENTION_DAYS: &str = "RETENTION_DAYS";
const WEBHOOK_URL: &str = "WEBHOOK_URL";
const ALERT_EMAIL: &str = "ALERT_EMAIL";
const SMTP_SERVER: &str = "SMTP_SERVER";
const SMTP_PORT: &str = "SMTP_PORT";
const SMTP_USER: &str = "SMTP_USER";
const SMTP_PASS: &str = "SMTP_PASS";
const ALERT_CHANNELS: &str = "ALERT_CHANNELS";
const HOST_LABEL: &str = "HOST_LABEL";
const LOG_LEVEL: &str = "LOG_LEVEL";

const DEFAULT_DB_FILE: &str = "./vigil.db";
const DEFAULT_THRESHOLD: usize = 90;
const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_file: PathBuf,
    pub thresholds: Thresholds,
    pub check_interval: CheckInterval,
    /// Samples older than this many days are removed by the daily sweep.
    pub retention_days: u32,
    /// Host identifier included in alert text.
    pub host_label: String,
    pub channels: ChannelConfig,
    pub log_level: String,
}

impl Config {
    /// Build the process-wide configuration from the environment.
    ///
    /// Missing variables fall back to their defaults; present but
    /// unparseable values are fatal.
    pub fn from_env() -> Result<Self> {
        let thresholds = Thresholds {
            cpu: parsed_var(CPU_THRESHOLD, DEFAULT_THRESHOLD)?,
            ram: parsed_var(RAM_THRESHOLD, DEFAULT_THRESHOLD)?,
            disk: parsed_var(DISK_THRESHOLD, DEFAULT_THRESHOLD)?,
        };

        let check_interval = CheckInterval {
            value: parsed_var(CHECK_INTERVAL, 1)?,
            unit: IntervalUnit::parse(&env_or(CHECK_INTERVAL_UNIT, "m")),
        };

        let webhook = WebhookChannel {
            url: env_or(WEBHOOK_URL, ""),
        };

        let email = EmailChannel {
            server: env_or(SMTP_SERVER, "smtp.example.com"),
            port: parsed_var(SMTP_PORT, 587)?,
            user: env_or(SMTP_USER, "user@example.com"),
            pass: env_or(SMTP_PASS, "secret"),
            recipients: parse_recipients(&env_or(ALERT_EMAIL, "alerts@example.com")),
        };

        let channels =
            ChannelConfig::resolve(&env_or(ALERT_CHANNELS, "webhook,email"), webhook, email);

        Ok(Self {
            db_file: PathBuf::from(env_or(DB_FILE, DEFAULT_DB_FILE)),
            thresholds,
            check_interval,
            retention_days: parsed_var(RETENTION_DAYS, DEFAULT_RETENTION_DAYS)?,
            host_label: host_label(),
            channels,
            log_level: env_or(LOG_LEVEL, "info"),
        })
    }
}

/// Collection cadence: a value plus a coarse unit, as configured.
#[derive(Debug, Clone, Copy)]
pub struct CheckInterval {
    pub value: u64,
    pub unit: IntervalUnit,
}

impl CheckInterval {
    /// The cadence as a duration. A configured value of 0 is lifted to 1
    /// unit so the scheduler cannot spin.
    pub fn duration(self) -> Duration {
        Duration::from_secs(self.value.max(1) * self.unit.seconds())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Seconds,
    Minutes,
    Hours,
}

impl IntervalUnit {
    /// Accepts "s", "m", "h" and longer spellings thereof; the first letter
    /// decides, anything unrecognized falls back to minutes.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();
        if raw.starts_with('s') {
            IntervalUnit::Seconds
        } else if raw.starts_with('h') {
            IntervalUnit::Hours
        } else {
            IntervalUnit::Minutes
        }
    }

    fn seconds(self) -> u64 {
        match self {
            IntervalUnit::Seconds => 1,
            IntervalUnit::Minutes => 60,
            IntervalUnit::Hours => 3600,
        }
    }
}

/// The set of enabled alert transports. `None` means the channel is
/// disabled, either by omission from `ALERT_CHANNELS` or because a required
/// parameter is missing.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfig {
    pub webhook: Option<WebhookChannel>,
    pub email: Option<EmailChannel>,
}

#[derive(Debug, Clone)]
pub struct WebhookChannel {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct EmailChannel {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub recipients: Vec<String>,
}

impl ChannelConfig {
    /// Resolve the enabled-channel list against the per-channel parameters.
    ///
    /// A channel with missing required parameters (empty webhook URL, empty
    /// recipient list) is silently disabled rather than an error.
    pub fn resolve(enabled: &str, webhook: WebhookChannel, email: EmailChannel) -> Self {
        let enabled: Vec<String> = enabled
            .split(',')
            .map(|channel| channel.trim().to_ascii_lowercase())
            .collect();

        let webhook_on = enabled.iter().any(|c| c == "webhook") && !webhook.url.trim().is_empty();
        let email_on = enabled.iter().any(|c| c == "email") && !email.recipients.is_empty();

        Self {
            webhook: webhook_on.then_some(webhook),
            email: email_on.then_some(email),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.webhook.is_none() && self.email.is_none()
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|recipient| recipient.trim().to_string())
        .filter(|recipient| !recipient.is_empty())
        .collect()
}

fn host_label() -> String {
    std::env::var(HOST_LABEL)
        .ok()
        .filter(|label| !label.trim().is_empty())
        .or_else(sysinfo::System::host_name)
        .unwrap_or_else(|| String::from("unknown-host"))
}
