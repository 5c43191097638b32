//! Relay configuration.
//!
//! Defaults mirror the deployed service; every value can be overridden from
//! the environment (a `.env` file is honoured).

use crate::error::RelayError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Default listen port
pub const RELAY_PORT: u16 = 8889;

/// Outbound bytes a peer may have queued before sends are deferred (10 MiB)
pub const HIGH_WATER_MARK: usize = 10 * 1024 * 1024;

/// Unfinished transfers are forgotten after this long (5 minutes)
pub const TRANSFER_TIMEOUT_SECS: u64 = 5 * 60;

const SEND_BASE_DELAY_MS: u64 = 100;
const SEND_MAX_DELAY_MS: u64 = 2000;
const SEND_MAX_RETRIES: u32 = 30;
const MAX_CONNECTIONS: usize = 1024;
const PING_INTERVAL_SECS: u64 = 30;
const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Retry policy for deferred sends to a congested peer
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    pub high_water_mark: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Deferred attempts before the message is dropped
    pub max_retries: u32,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            high_water_mark: HIGH_WATER_MARK,
            base_delay: Duration::from_millis(SEND_BASE_DELAY_MS),
            max_delay: Duration::from_millis(SEND_MAX_DELAY_MS),
            max_retries: SEND_MAX_RETRIES,
        }
    }
}

impl BackpressureConfig {
    /// Delay before deferred attempt `attempt` (0-based): doubles from the
    /// base delay, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_addr: SocketAddr,
    pub transfer_timeout: Duration,
    pub backpressure: BackpressureConfig,
    pub max_connections: usize,
    pub ping_interval: Duration,
    pub max_message_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], RELAY_PORT)),
            transfer_timeout: Duration::from_secs(TRANSFER_TIMEOUT_SECS),
            backpressure: BackpressureConfig::default(),
            max_connections: MAX_CONNECTIONS,
            ping_interval: Duration::from_secs(PING_INTERVAL_SECS),
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }
}

impl RelayConfig {
    /// Load `.env` (if any) and apply `RELAY_*` overrides on top of the defaults
    pub fn from_env() -> Result<Self, RelayError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "RELAY_BIND")? {
            config.bind_addr = addr;
        }
        if let Some(secs) = parse_var(&lookup, "RELAY_TRANSFER_TIMEOUT_SECS")? {
            config.transfer_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = parse_var(&lookup, "RELAY_HIGH_WATER_MARK")? {
            config.backpressure.high_water_mark = bytes;
        }
        if let Some(ms) = parse_var(&lookup, "RELAY_SEND_BASE_DELAY_MS")? {
            config.backpressure.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "RELAY_SEND_MAX_DELAY_MS")? {
            config.backpressure.max_delay = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_var(&lookup, "RELAY_SEND_MAX_RETRIES")? {
            config.backpressure.max_retries = retries;
        }
        if let Some(max) = parse_var(&lookup, "RELAY_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(secs) = parse_var(&lookup, "RELAY_PING_INTERVAL_SECS")? {
            config.ping_interval = Duration::from_secs(secs);
        }
        if let Some(bytes) = parse_var(&lookup, "RELAY_MAX_MESSAGE_BYTES")? {
            config.max_message_bytes = bytes;
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, RelayError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RelayError::Config { key, value: raw }),
        None => Ok(None),
    }
}
