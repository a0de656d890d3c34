//! ntfy push notifier.
//!
//! Each line has its own topic (`metrobus_linea_{n}`) that phones subscribe
//! to. A notification is a plain-text POST to `http://{host}:{port}/{topic}`
//! with the line name in the `Title` header.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{LineId, LineStatus, NotifyConfig};
use crate::utils::http;

/// Delivers one notification for one line.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Make a single delivery attempt.
    async fn notify(&self, line: LineId, status: &LineStatus) -> Result<()>;
}

/// Title shown on the push notification.
pub fn title(line: LineId) -> String {
    format!("Metrobus Linea {}", line)
}

/// Notification body listing the three status fields.
///
/// Fields missing from the page were already stored as empty strings, so
/// they render as empty values here.
pub fn message(status: &LineStatus) -> String {
    format!(
        "Estado: {}\nInformación adicional: {}\nEstaciones afectadas: {}",
        status.estado, status.info_adicional, status.estaciones_afectadas,
    )
}

/// Notifier backed by an ntfy server.
pub struct NtfyNotifier {
    config: NotifyConfig,
    client: Client,
}

impl NtfyNotifier {
    /// Create a notifier with its own HTTP client.
    pub fn new(config: NotifyConfig) -> Result<Self> {
        let client = http::create_notify_client(&config)?;
        Ok(Self { config, client })
    }

    /// Topic a line's notifications are published to.
    pub fn topic(&self, line: LineId) -> String {
        format!("{}{}", self.config.topic_prefix, line)
    }

    /// Full publish URL for a line.
    pub fn url(&self, line: LineId) -> String {
        format!(
            "http://{}:{}/{}",
            self.config.host,
            self.config.port,
            self.topic(line)
        )
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn notify(&self, line: LineId, status: &LineStatus) -> Result<()> {
        let url = self.url(line);
        log::debug!("Notify URL: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Title", title(line))
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(message(status).into_bytes())
            .send()
            .await
            .map_err(|e| AppError::notify(line, format!("request to {url} failed: {e}")))?;

        let code = response.status();
        if !code.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::notify(line, format!("{code} - {body}")));
        }

        log::info!("Notification sent successfully for line {}", line);
        Ok(())
    }
}
