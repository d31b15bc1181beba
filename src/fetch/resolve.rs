// src/fetch/resolve.rs

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, error, instrument};
use url::Url;

use crate::fetch::get_text;

/// Fetch a resource page and find the link to its data file.
///
/// Any failure is logged and reported as `None`; the caller decides on a
/// fallback URL.
#[instrument(level = "debug", skip(client, base))]
pub async fn resolve_download_url(client: &Client, base: &Url, resource_url: &str) -> Option<Url> {
    match get_text(client, resource_url).await {
        Ok(html) => {
            let found = find_download_link(&html, base);
            if found.is_none() {
                debug!(%resource_url, "no download link on resource page");
            }
            found
        }
        Err(e) => {
            error!(%resource_url, error = %e, "resource page fetch failed");
            None
        }
    }
}

/// First-match scan of a resource page: a direct CSV or download link,
/// otherwise a `/dataset/…/resource/…/download/…` path.
pub fn find_download_link(html: &str, base: &Url) -> Option<Url> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("a[href]").expect("selector should parse");
    let hrefs: Vec<&str> = doc
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .collect();

    hrefs
        .iter()
        .find(|href| href.ends_with(".csv") || href.to_lowercase().contains("download"))
        .or_else(|| {
            hrefs.iter().find(|href| {
                href.contains("/dataset/") && href.contains("/resource/") && href.contains("/download/")
            })
        })
        .and_then(|href| base.join(href).ok())
}
