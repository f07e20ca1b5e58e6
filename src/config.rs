use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::canvas::CanvasConfig;
use crate::error::AppError;
use crate::notion::NotionConfig;

/// Everything a process needs, read once at startup and passed down.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub canvas: CanvasConfig,
    pub notion: NotionConfig,
    pub sync: SyncConfig,
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Delay after every create/update sent to Notion.
    pub pace: Duration,
    /// Interval between runs in `watch` and `serve` modes.
    pub interval: Duration,
    pub bind_addr: SocketAddr,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pace: Duration::from_millis(100),
            interval: Duration::from_secs(900),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            canvas: CanvasConfig::from_lookup(&lookup)?,
            notion: NotionConfig::from_lookup(&lookup)?,
            sync: SyncConfig::from_lookup(&lookup)?,
        })
    }
}

impl SyncConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let pace = match optional(lookup, "SYNC_PACE_MS") {
            Some(raw) => Duration::from_millis(parse_number(&raw, "SYNC_PACE_MS")?),
            None => defaults.pace,
        };
        let interval = match optional(lookup, "SYNC_INTERVAL_SECS") {
            Some(raw) => {
                let secs = parse_number(&raw, "SYNC_INTERVAL_SECS")?;
                if secs == 0 {
                    return Err(AppError::Config(
                        "SYNC_INTERVAL_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => defaults.interval,
        };
        let bind_addr = match optional(lookup, "BIND_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("BIND_ADDR is not a socket address: {}", raw)))?,
            None => defaults.bind_addr,
        };

        Ok(Self {
            pace,
            interval,
            bind_addr,
        })
    }
}

/// Reads a variable, treating blank values as unset.
pub(crate) fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn required<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| AppError::Config(format!("{} is not set", key)))
}

fn parse_number(raw: &str, key: &str) -> Result<u64, AppError> {
    raw.parse::<u64>()
        .map_err(|_| AppError::Config(format!("{} must be a non-negative integer, got {:?}", key, raw)))
}
