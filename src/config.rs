use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

/// The persisted configuration record.
///
/// One JSON file holds everything durable: credentials, channel identifier,
/// tuning knobs, and the delivery watermark. The file is rewritten by the
/// watermark store after every delivered post, so missing fields must always
/// deserialize to sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub vk_access_token: String,
    pub vk_owner_id: i64,
    pub tg_bot_token: String,
    pub tg_channel_id: String,
    /// Id of the last successfully delivered post.
    pub last_post_id: i64,
    pub log_level: String,
    pub poll_interval_secs: u64,
    /// Pause between two posts delivered in the same cycle. Multi-hour by
    /// default: the channel should drip-feed a backlog, not flood it.
    pub throttle_secs: u64,
    pub page_size: u32,
    pub vk_api_base: String,
    pub tg_api_base: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            vk_access_token: String::new(),
            vk_owner_id: 0,
            tg_bot_token: String::new(),
            tg_channel_id: String::new(),
            last_post_id: 0,
            log_level: "info".to_string(),
            poll_interval_secs: 60,
            throttle_secs: 7200,
            page_size: 10,
            vk_api_base: "https://api.vk.com/method/".to_string(),
            tg_api_base: "https://api.telegram.org/".to_string(),
        }
    }
}

impl ConfigFile {
    /// Read the record from disk. An absent or unparseable file yields the
    /// default record (watermark 0); validation of required fields happens
    /// later, in [`Config::from_record`].
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Config file not readable, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Config file malformed, using defaults");
                Self::default()
            }
        }
    }
}

/// Validated, immutable runtime configuration.
///
/// Constructed once at startup from the persisted record and passed by
/// reference to the components that need it. Mutable state (the watermark)
/// lives in [`crate::state::WatermarkStore`], not here.
#[derive(Debug, Clone)]
pub struct Config {
    pub vk_access_token: String,
    pub vk_owner_id: i64,
    pub tg_bot_token: String,
    pub tg_channel_id: String,
    pub log_level: String,
    pub poll_interval: Duration,
    pub throttle: Duration,
    pub page_size: u32,
    pub vk_api_base: Url,
    pub tg_api_base: Url,
}

impl Config {
    /// Load and validate configuration from the record at `path`.
    ///
    /// Returns the validated config together with the raw record, which the
    /// watermark store takes ownership of (it rewrites the record on every
    /// advance).
    ///
    /// # Errors
    ///
    /// Returns an error if a required credential or identifier is missing or
    /// an API base URL does not parse.
    pub fn load(path: &Path) -> Result<(Self, ConfigFile), ConfigError> {
        let record = ConfigFile::load(path);
        let config = Self::from_record(&record)?;
        Ok((config, record))
    }

    /// Build a validated config from a raw record.
    ///
    /// `WALLCASTER_VK_TOKEN` and `WALLCASTER_TG_TOKEN` environment variables
    /// override the corresponding record fields, so secrets can be kept out
    /// of the on-disk record entirely. Overrides are never written back.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is empty after overrides are
    /// applied, or an API base URL is invalid.
    pub fn from_record(record: &ConfigFile) -> Result<Self, ConfigError> {
        let vk_access_token = std::env::var("WALLCASTER_VK_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| record.vk_access_token.clone());
        let tg_bot_token = std::env::var("WALLCASTER_TG_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| record.tg_bot_token.clone());

        if vk_access_token.is_empty() {
            return Err(ConfigError::MissingField("vk_access_token"));
        }
        if record.vk_owner_id == 0 {
            return Err(ConfigError::MissingField("vk_owner_id"));
        }
        if tg_bot_token.is_empty() {
            return Err(ConfigError::MissingField("tg_bot_token"));
        }
        if record.tg_channel_id.is_empty() {
            return Err(ConfigError::MissingField("tg_channel_id"));
        }
        if record.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "page_size",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            vk_access_token,
            vk_owner_id: record.vk_owner_id,
            tg_bot_token,
            tg_channel_id: record.tg_channel_id.clone(),
            log_level: record.log_level.clone(),
            poll_interval: Duration::from_secs(record.poll_interval_secs),
            throttle: Duration::from_secs(record.throttle_secs),
            page_size: record.page_size,
            vk_api_base: parse_base_url("vk_api_base", &record.vk_api_base)?,
            tg_api_base: parse_base_url("tg_api_base", &record.tg_api_base)?,
        })
    }

    /// A complete config for tests: dummy credentials, no throttle.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            vk_access_token: "vk-test-token".to_string(),
            vk_owner_id: -1,
            tg_bot_token: "TESTTOKEN".to_string(),
            tg_channel_id: "@testchannel".to_string(),
            log_level: "debug".to_string(),
            poll_interval: Duration::from_secs(60),
            throttle: Duration::ZERO,
            page_size: 10,
            vk_api_base: Url::parse("http://127.0.0.1:9/method/").expect("static url"),
            tg_api_base: Url::parse("http://127.0.0.1:9/").expect("static url"),
        }
    }
}

/// Parse an API base URL, normalizing to a trailing slash so `Url::join`
/// appends method names instead of replacing the last path segment.
fn parse_base_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let mut raw = raw.to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
        name,
        message: e.to_string(),
    })
}
