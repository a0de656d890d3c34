// src/services/status.rs

//! Status page fetcher.
//!
//! The Metrobus service page embeds its status table in an iframe. Each line
//! has a row marked by an icon whose `src` contains `MB{n}`; the second,
//! third and fourth cells of that row hold the status, affected stations and
//! additional information.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{FetchConfig, LineId, LineStatus, Snapshot};
use crate::utils::{http, normalize_whitespace, resolve_url};

/// Text that identifies the status table body.
const TABLE_MARKER: &str = "EstadoServicio";

/// Source of line status snapshots.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    /// Fetch the status of every line. Any failure fails the whole fetch.
    async fn fetch(&self) -> Result<Snapshot>;
}

/// Fetches and parses the public status page over HTTP.
pub struct PageStatusFetcher {
    config: FetchConfig,
    client: Client,
}

impl PageStatusFetcher {
    /// Create a fetcher with its own HTTP client.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = http::create_fetch_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl StatusFetcher for PageStatusFetcher {
    async fn fetch(&self) -> Result<Snapshot> {
        let page = http::fetch_text(&self.client, &self.config.url, None).await?;

        let frame_url = find_frame_url(&page, &self.config.url, &self.config.iframe_id)?;
        let table_html = match frame_url {
            Some(url) => {
                log::debug!("Switched to iframe {}: {}", self.config.iframe_id, url);
                let timeout = Duration::from_secs(self.config.frame_timeout_secs);
                http::fetch_text(&self.client, &url, Some(timeout)).await?
            }
            None => {
                log::debug!(
                    "No iframe '{}' on page, reading table from page itself",
                    self.config.iframe_id
                );
                page
            }
        };

        parse_status_table(&table_html)
    }
}

/// Locate the status iframe and return its absolute URL.
pub fn find_frame_url(html: &str, page_url: &str, iframe_id: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let selector = parse_selector("iframe[id]")?;

    let src = document
        .select(&selector)
        .find(|frame| frame.value().id() == Some(iframe_id))
        .and_then(|frame| frame.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty());

    match src {
        Some(src) => {
            let base = Url::parse(page_url)?;
            Ok(Some(resolve_url(&base, src)))
        }
        None => Ok(None),
    }
}

/// Parse the status table into a snapshot of all lines.
pub fn parse_status_table(html: &str) -> Result<Snapshot> {
    let document = Html::parse_document(html);
    let tbody_sel = parse_selector("tbody")?;
    let row_sel = parse_selector("tbody tr")?;
    let img_sel = parse_selector("img[src]")?;

    let has_table = document
        .select(&tbody_sel)
        .any(|tbody| tbody.text().any(|t| t.contains(TABLE_MARKER)));
    if !has_table {
        return Err(AppError::fetch(
            "status table",
            format!("no table body containing '{TABLE_MARKER}'"),
        ));
    }

    let rows: Vec<ElementRef> = document.select(&row_sel).collect();
    let mut lines = Vec::with_capacity(usize::from(LineId::COUNT));

    for line in LineId::all() {
        let icon = format!("MB{}", line);
        let row = rows
            .iter()
            .find(|row| {
                row.select(&img_sel)
                    .filter_map(|img| img.value().attr("src"))
                    .any(|src| src.contains(&icon))
            })
            .ok_or_else(|| AppError::fetch(format!("line {line}"), "status row not found"))?;

        let status = parse_row(line, row)?;
        log::info!("Linea {}", line);
        log::info!("Estado: {}", status.estado);
        log::info!("Estaciones_Afectadas: {}", status.estaciones_afectadas);
        log::info!("Info_Adicional: {}", status.info_adicional);

        lines.push((line, status));
    }

    Snapshot::from_lines(lines)
}

/// Read cells 2, 3 and 4 of a status row. A missing cell fails the fetch.
fn parse_row(line: LineId, row: &ElementRef) -> Result<LineStatus> {
    let cells: Vec<String> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .map(|td| normalize_whitespace(&td.text().collect::<String>()))
        .collect();

    let cell = |index: usize| {
        cells.get(index).cloned().ok_or_else(|| {
            AppError::fetch(format!("line {line}"), format!("status cell {} missing", index + 1))
        })
    };
    Ok(LineStatus::new(cell(1)?, cell(2)?, cell(3)?))
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::selector(selector, e))
}
