use crate::sync::{ALIGNMENT_BUFFER, SYNC_PERIOD, SyncTiming};
use std::{env, path::PathBuf, time::Duration};
use tracing::{info, warn};

pub const DEFAULT_API_BASE_URL: &str = "https://api.clickflag.com";
pub const FETCH_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub fetch_timeout: Duration,
    pub sync: SyncTiming,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: parse_or("PORT", 8080),
            api_base_url: var_or("CLICKFLAG_API_BASE_URL", DEFAULT_API_BASE_URL),
            data_dir: PathBuf::from(var_or("CLICKFLAG_DATA_DIR", "data")),
            fetch_timeout: FETCH_TIMEOUT,
            sync: SyncTiming {
                period: SYNC_PERIOD,
                buffer: ALIGNMENT_BUFFER,
            },
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            info!("{key} not set, using default: {default}");
            default.to_string()
        }
    }
}

fn parse_or(key: &str, default: u16) -> u16 {
    let Ok(raw) = env::var(key) else {
        return default;
    };
    raw.parse().unwrap_or_else(|err| {
        warn!("invalid {key} value {raw:?}: {err}, using default: {default}");
        default
    })
}
