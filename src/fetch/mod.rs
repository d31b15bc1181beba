// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::{config::ScraperConfig, error::FetchError};

pub mod catalog;
pub mod download;
pub mod resolve;

pub use catalog::{Catalog, HtmlCatalog};
pub use download::download_dataset;
pub use resolve::resolve_download_url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the single HTTP client shared by every step of a run.
pub fn build_client(config: &ScraperConfig) -> Result<Client> {
    Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .context("building HTTP client")
}

/// GET a page and return its body, failing on transport errors or non-2xx.
pub async fn get_text(client: &Client, url: &str) -> Result<String, FetchError> {
    debug!("Fetching text from {}", url);
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    resp.text().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })
}
