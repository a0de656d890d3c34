//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Longest accepted run interval: one day.
pub const MAX_INTERVAL_MINUTES: u64 = 24 * 60;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Status page fetching settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Run interval and daily window
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Push notification endpoint
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Variable names follow the ones the deployment `.env` files use.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("METROBUS_URL") {
            self.fetch.url = url;
        }
        if let Some(secs) = lookup("FETCH_TIMEOUT") {
            self.fetch.timeout_secs = parse_var("FETCH_TIMEOUT", &secs)?;
        }
        if let Some(secs) = lookup("FETCH_FRAME_TIMEOUT") {
            self.fetch.frame_timeout_secs = parse_var("FETCH_FRAME_TIMEOUT", &secs)?;
        }

        if let Some(minutes) = lookup("SCRAPPER_REFRESH_TIME") {
            self.schedule.interval_minutes = parse_var("SCRAPPER_REFRESH_TIME", &minutes)?;
        }
        if let Some(hour) = lookup("INITIAL_TIME") {
            self.schedule.start_hour = parse_var("INITIAL_TIME", &hour)?;
        }
        if let Some(hour) = lookup("FINAL_TIME") {
            self.schedule.end_hour = parse_var("FINAL_TIME", &hour)?;
        }
        if let Some(tz) = lookup("METROBUS_TIMEZONE") {
            self.schedule.timezone = tz;
        }

        if let Some(host) = lookup("NTFY_HOST").or_else(|| lookup("NTFY_IP")) {
            self.notify.host = host;
        }
        if let Some(port) = lookup("NTFY_PORT") {
            self.notify.port = parse_var("NTFY_PORT", &port)?;
        }

        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.url.trim().is_empty() {
            return Err(AppError::validation("fetch.url is empty"));
        }
        url::Url::parse(&self.fetch.url)?;
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.frame_timeout_secs == 0 {
            return Err(AppError::validation(
                "fetch.frame_timeout_secs must be > 0",
            ));
        }
        if self.schedule.interval_minutes == 0 {
            return Err(AppError::validation(
                "schedule.interval_minutes must be > 0",
            ));
        }
        if self.schedule.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(AppError::validation(format!(
                "schedule.interval_minutes must be at most {MAX_INTERVAL_MINUTES} (one day)"
            )));
        }
        if self.schedule.start_hour > 23 || self.schedule.end_hour > 23 {
            return Err(AppError::validation(
                "schedule hours must be between 0 and 23",
            ));
        }
        if self.schedule.start_hour > self.schedule.end_hour {
            return Err(AppError::validation(
                "schedule.start_hour must not be after schedule.end_hour",
            ));
        }
        self.schedule.tz()?;
        if self.notify.host.trim().is_empty() {
            return Err(AppError::validation("notify.host is empty"));
        }
        if self.notify.port == 0 {
            return Err(AppError::validation("notify.port must be > 0"));
        }
        if self.notify.timeout_secs == 0 {
            return Err(AppError::validation("notify.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::config(format!("{key}={value:?} is invalid: {e}")))
}

/// Status page fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Status page URL
    #[serde(default = "defaults::url")]
    pub url: String,

    /// id of the iframe that embeds the status table
    #[serde(default = "defaults::iframe_id")]
    pub iframe_id: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Status page request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Embedded frame request timeout in seconds
    #[serde(default = "defaults::frame_timeout")]
    pub frame_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: defaults::url(),
            iframe_id: defaults::iframe_id(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            frame_timeout_secs: defaults::frame_timeout(),
        }
    }
}

/// Run interval and the daily window in which runs are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes between runs in scheduled mode
    #[serde(default = "defaults::interval_minutes")]
    pub interval_minutes: u64,

    /// First hour of the daily window (inclusive, on the hour)
    #[serde(default = "defaults::start_hour")]
    pub start_hour: u32,

    /// Last hour of the daily window (inclusive, on the hour)
    #[serde(default = "defaults::end_hour")]
    pub end_hour: u32,

    /// IANA timezone the window is evaluated in
    #[serde(default = "defaults::timezone")]
    pub timezone: String,
}

impl ScheduleConfig {
    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            AppError::validation(format!(
                "schedule.timezone '{}' is not a valid IANA timezone",
                self.timezone
            ))
        })
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: defaults::interval_minutes(),
            start_hour: defaults::start_hour(),
            end_hour: defaults::end_hour(),
            timezone: defaults::timezone(),
        }
    }
}

/// ntfy server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Server host name or IP
    #[serde(default = "defaults::notify_host")]
    pub host: String,

    /// Server port
    #[serde(default = "defaults::notify_port")]
    pub port: u16,

    /// Topic name prefix; the line number is appended
    #[serde(default = "defaults::topic_prefix")]
    pub topic_prefix: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            host: defaults::notify_host(),
            port: defaults::notify_port(),
            topic_prefix: defaults::topic_prefix(),
            timeout_secs: defaults::notify_timeout(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Fetch defaults
    pub fn url() -> String {
        "https://www.metrobus.cdmx.gob.mx/ServicioMB".into()
    }
    pub fn iframe_id() -> String {
        "iFrameEstatus".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; metrobus-notifier/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn frame_timeout() -> u64 {
        10
    }

    // Schedule defaults
    pub fn interval_minutes() -> u64 {
        5
    }
    pub fn start_hour() -> u32 {
        5
    }
    pub fn end_hour() -> u32 {
        23
    }
    pub fn timezone() -> String {
        "America/Mexico_City".into()
    }

    // Notify defaults
    pub fn notify_host() -> String {
        "localhost".into()
    }
    pub fn notify_port() -> u16 {
        80
    }
    pub fn topic_prefix() -> String {
        "metrobus_linea_".into()
    }
    pub fn notify_timeout() -> u64 {
        10
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
