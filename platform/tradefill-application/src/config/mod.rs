use crate::executor::SyncSettings;
use crate::fetcher::{FetchSettings, RetryPolicy};
use crate::scheduler::RingOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tradefill_domain::value_objects::timeframe::parse_duration_like_seconds;

pub const DB_URL_ENV: &str = "TRADEFILL_DB_URL";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub db: Option<DbConfig>,
    pub remote: Option<RemoteConfig>,
    pub retry: Option<RetryConfig>,
    pub sync: Option<SyncConfig>,
    pub ring: Option<RingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct DbConfig {
    pub url: Option<String>,
    pub table: Option<String>,
    pub pool_max_size: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    pub page_size: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub request_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Duration string such as `1d` or `6h`.
    pub backfill_chunk: Option<String>,
    pub max_chunk_pages: Option<u32>,
    pub quiet_chunks: Option<u32>,
    pub verify_after_sync: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct RingConfig {
    pub every: Option<String>,
    pub iterations: Option<u32>,
}

pub const DEFAULT_TABLE: &str = "trades";
pub const DEFAULT_POOL_MAX_SIZE: u32 = 4;
pub const DEFAULT_REMOTE_BASE_URL: &str = "https://api.binance.com";
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RING_EVERY_SECONDS: i64 = 60;

pub fn load_config(path: &Path) -> Result<Config, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    toml::from_str(&contents).map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))
}

/// Missing path means all defaults.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, String> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config).map_err(|err| format!("failed to serialize config as TOML: {err}"))
}

/// Precedence: CLI flag, then `TRADEFILL_DB_URL`, then `[db].url`.
pub fn resolve_db_url(
    cli_value: Option<&str>,
    env_value: Option<&str>,
    config: &Config,
) -> Result<String, String> {
    cli_value
        .or(env_value)
        .map(str::to_string)
        .or_else(|| config.db.as_ref().and_then(|db| db.url.clone()))
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| format!("database url missing (set --db-url, {DB_URL_ENV}, or [db].url)"))
}

pub fn resolve_table(config: &Config) -> String {
    config
        .db
        .as_ref()
        .and_then(|db| db.table.clone())
        .unwrap_or_else(|| DEFAULT_TABLE.to_string())
}

pub fn resolve_pool_max_size(config: &Config) -> Result<u32, String> {
    let size = config
        .db
        .as_ref()
        .and_then(|db| db.pool_max_size)
        .unwrap_or(DEFAULT_POOL_MAX_SIZE);
    if size == 0 {
        return Err("db.pool_max_size must be > 0".to_string());
    }
    Ok(size)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub base_url: String,
    pub page_size: usize,
    pub timeout: Duration,
}

pub fn resolve_remote(config: &Config) -> Result<RemoteSettings, String> {
    let remote = config.remote.clone().unwrap_or_default();
    let page_size = remote.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err("remote.page_size must be > 0".to_string());
    }
    let timeout_ms = remote.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err("remote.timeout_ms must be > 0".to_string());
    }
    Ok(RemoteSettings {
        base_url: remote
            .base_url
            .unwrap_or_else(|| DEFAULT_REMOTE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string(),
        page_size,
        timeout: Duration::from_millis(timeout_ms),
    })
}

pub fn resolve_sync_settings(config: &Config) -> Result<SyncSettings, String> {
    let defaults = SyncSettings::default();
    let retry_defaults = defaults.fetch.retry;

    let retry_cfg = config.retry.clone().unwrap_or_default();
    let retry = RetryPolicy {
        max_attempts: retry_cfg.max_attempts.unwrap_or(retry_defaults.max_attempts),
        base_delay: retry_cfg
            .base_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(retry_defaults.base_delay),
        max_delay: retry_cfg
            .max_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(retry_defaults.max_delay),
    };
    if retry.max_attempts == 0 {
        return Err("retry.max_attempts must be > 0".to_string());
    }
    if retry.max_delay < retry.base_delay {
        return Err("retry.max_delay_ms must be >= retry.base_delay_ms".to_string());
    }

    let request_delay = config
        .remote
        .as_ref()
        .and_then(|remote| remote.request_delay_ms)
        .map(Duration::from_millis)
        .unwrap_or(defaults.fetch.request_delay);

    let sync = config.sync.clone().unwrap_or_default();
    let backfill_chunk_seconds = match sync.backfill_chunk.as_deref() {
        Some(value) => parse_duration_like_seconds(value)
            .map_err(|err| format!("invalid sync.backfill_chunk: {err}"))?,
        None => defaults.backfill_chunk_seconds,
    };
    if backfill_chunk_seconds <= 0 {
        return Err("sync.backfill_chunk must be > 0".to_string());
    }

    let max_chunk_pages = sync.max_chunk_pages.unwrap_or(defaults.max_chunk_pages);
    if max_chunk_pages == 0 {
        return Err("sync.max_chunk_pages must be > 0".to_string());
    }

    Ok(SyncSettings {
        fetch: FetchSettings {
            retry,
            request_delay,
        },
        backfill_chunk_seconds,
        max_chunk_pages,
        quiet_chunks: sync.quiet_chunks.unwrap_or(defaults.quiet_chunks),
        verify_after_sync: sync.verify_after_sync.unwrap_or(defaults.verify_after_sync),
    })
}

/// CLI values win over `[ring]`.
pub fn resolve_ring_options(
    config: &Config,
    every_cli: Option<&str>,
    iterations_cli: Option<u32>,
) -> Result<RingOptions, String> {
    let ring = config.ring.clone().unwrap_or_default();
    let every_seconds = match every_cli.or(ring.every.as_deref()) {
        Some(value) => {
            parse_duration_like_seconds(value).map_err(|err| format!("invalid ring interval: {err}"))?
        }
        None => DEFAULT_RING_EVERY_SECONDS,
    };
    if every_seconds < 0 {
        return Err("ring interval must be >= 0".to_string());
    }
    Ok(RingOptions {
        every: Duration::from_secs(every_seconds as u64),
        iterations: iterations_cli.or(ring.iterations),
    })
}
