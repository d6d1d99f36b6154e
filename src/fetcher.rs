// src/fetcher.rs

//! Announcement fetcher.
//!
//! Fetches the notification page and extracts announcement titles (and
//! links, when present) using the configured CSS selectors.

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Announcement, SourceConfig};
use crate::utils::{self, http};

/// Anything that can produce the current announcement list.
///
/// The orchestration cycle depends on this seam rather than on the HTTP
/// fetcher directly.
#[async_trait]
pub trait Source: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Announcement>>;
}

/// HTTP fetcher for the configured notification page.
pub struct Fetcher {
    client: reqwest::Client,
    config: SourceConfig,
}

impl Fetcher {
    /// Create a new fetcher with the given source configuration.
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = http::create_client(&config)?;
        Ok(Self { client, config })
    }

    /// Extract announcements from a parsed page.
    ///
    /// A missing container is a structural mismatch and an error; a present
    /// container with no matching rows yields an empty list. Rows without a
    /// title anchor, or with empty title text, are skipped.
    pub fn extract(&self, document: &Html) -> Result<Vec<Announcement>> {
        let container_sel = parse_selector(&self.config.container_selector)?;
        let item_sel = parse_selector(&self.config.item_selector)?;
        let link_sel = parse_selector(&self.config.link_selector)?;

        let container = document.select(&container_sel).next().ok_or_else(|| {
            AppError::scrape(
                &self.config.url,
                format!("container '{}' not found", self.config.container_selector),
            )
        })?;

        let base_url = url::Url::parse(&self.config.url)?;
        let mut announcements = Vec::new();

        for row in container.select(&item_sel) {
            let Some(anchor) = row.select(&link_sel).next() else {
                continue;
            };

            let title = utils::normalize_whitespace(&anchor.text().collect::<String>());
            if title.is_empty() {
                continue;
            }

            let url = anchor
                .value()
                .attr("href")
                .map(|href| utils::resolve_url(&base_url, href));

            announcements.push(Announcement { title, url });
        }

        Ok(announcements)
    }
}

#[async_trait]
impl Source for Fetcher {
    async fn fetch(&self) -> Result<Vec<Announcement>> {
        let text = http::fetch_text(&self.client, &self.config.url).await?;
        let document = Html::parse_document(&text);
        self.extract(&document)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
