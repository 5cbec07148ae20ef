//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, Utc};
use tracing::warn;

use crate::error::ConfigError;

/// Default timestamp format (millisecond precision plus offset).
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %:z";

/// Default length of the random part of generated ids.
pub const DEFAULT_RANDOM_ID_LEN: usize = 32;

/// Time zone used for timestamps and generated ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZone {
    Utc,
    Local,
    Fixed(FixedOffset),
}

impl TimeZone {
    /// Current moment in this zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        match self {
            Self::Utc => Utc::now().fixed_offset(),
            Self::Local => Local::now().fixed_offset(),
            Self::Fixed(offset) => Utc::now().with_timezone(offset),
        }
    }
}

impl FromStr for TimeZone {
    type Err = String;

    /// Accepts `UTC`, `local`, or an offset such as `+02:00` / `-0530`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(Self::Utc);
        }
        if s.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        parse_offset(s)
            .map(Self::Fixed)
            .ok_or_else(|| format!("expected UTC, local or +HH:MM, got {s:?}"))
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Socket store and server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Directory holding every socket document and marker file.
    pub data_root: PathBuf,
    /// `chrono` format string for `created`/`started`/`finished`.
    pub date_format: String,
    /// Zone used for timestamps and generated ids.
    pub time_zone: TimeZone,
    /// Length of the random suffix of generated ids.
    pub random_id_len: usize,
    /// Route prefix for the HTTP endpoints, without surrounding slashes.
    pub route_prefix: String,
    /// Bearer token required by `GET /get/{id}`. `None` disables the guard.
    pub auth_token: Option<String>,
    /// Active locale for terminal-transition messages.
    pub locale: String,
    /// Directory containing `{locale}.json` translation catalogs.
    pub lang_dir: Option<PathBuf>,
    /// Environment name reported by the liveness probe.
    pub environment: String,
    /// Listen address of the HTTP server.
    pub bind: SocketAddr,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("./storage/app/socket"),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_zone: TimeZone::Utc,
            random_id_len: DEFAULT_RANDOM_ID_LEN,
            route_prefix: "api/socket".to_string(),
            auth_token: None,
            locale: "en".to_string(),
            lang_dir: None,
            environment: "production".to_string(),
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl SocketConfig {
    /// Config rooted at `data_root` with every other field defaulted.
    pub fn with_data_root(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            ..Self::default()
        }
    }

    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = env_var("SOCKET_DATA") {
            config.data_root = PathBuf::from(v);
        }
        if let Some(v) = env_var("SOCKET_DATE_FORMAT") {
            check_date_format(&v)?;
            config.date_format = v;
        }
        if let Some(v) = env_var("SOCKET_TIMEZONE") {
            config.time_zone = v.parse().map_err(|message| ConfigError::InvalidValue {
                key: "SOCKET_TIMEZONE".to_string(),
                message,
            })?;
        }
        if let Some(v) = env_var("SOCKET_RANDOM_ID") {
            config.random_id_len = v.parse().map_err(|e| ConfigError::InvalidValue {
                key: "SOCKET_RANDOM_ID".to_string(),
                message: format!("{e}"),
            })?;
        }
        if let Some(v) = env_var("SOCKET_ROUTE_PREFIX") {
            config.route_prefix = v.trim_matches('/').to_string();
        }
        config.auth_token = env_var("SOCKET_AUTH_TOKEN");
        if let Some(v) = env_var("SOCKET_LOCALE") {
            config.locale = v;
        }
        config.lang_dir = env_var("SOCKET_LANG_DIR").map(PathBuf::from);
        if let Some(v) = env_var("APP_ENV") {
            config.environment = v;
        }
        if let Some(v) = env_var("SOCKET_BIND") {
            config.bind = v.parse().map_err(|e| ConfigError::InvalidValue {
                key: "SOCKET_BIND".to_string(),
                message: format!("{e}"),
            })?;
        }

        Ok(config)
    }

    /// Current moment formatted with `date_format` in `time_zone`.
    ///
    /// An unusable `date_format` falls back to [`DEFAULT_DATE_FORMAT`].
    pub fn timestamp(&self) -> String {
        let now = self.time_zone.now();
        let mut out = String::new();
        if write!(out, "{}", now.format(&self.date_format)).is_err() {
            warn!(format = %self.date_format, "Invalid date format, using default");
            return now.format(DEFAULT_DATE_FORMAT).to_string();
        }
        out
    }
}

/// Reject `chrono` format strings containing unknown specifiers.
pub fn check_date_format(format: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidValue {
            key: "SOCKET_DATE_FORMAT".to_string(),
            message: format!("unsupported format specifier in {format:?}"),
        });
    }
    Ok(())
}

/// Non-empty, trimmed environment variable.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
