// src/error.rs

//! Unified error handling for the status notifier.

use std::fmt;

use thiserror::Error;

use crate::models::LineId;

/// Result type alias for notifier operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Line number outside the monitored range
    #[error("Invalid line number {0}: expected 1 to {max}", max = LineId::COUNT)]
    InvalidLine(u8),

    /// A fetch returned fewer lines than are monitored
    #[error("Incomplete snapshot: missing lines {missing:?}")]
    IncompleteSnapshot { missing: Vec<u8> },

    /// The status page could not be fetched or parsed
    #[error("Fetch error for {context}: {message}")]
    Fetch { context: String, message: String },

    /// Delivering a notification failed
    #[error("Notification for line {line} failed: {message}")]
    Notify { line: LineId, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error with context.
    pub fn fetch(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error for a line.
    pub fn notify(line: LineId, message: impl fmt::Display) -> Self {
        Self::Notify {
            line,
            message: message.to_string(),
        }
    }
}
