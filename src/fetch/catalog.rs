// src/fetch/catalog.rs

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, trace};
use url::Url;

use crate::{config::ScraperConfig, error::FetchError, fetch::get_text, types::DatasetReference};

/// href fragment every monthly resource link carries.
const RESOURCE_MARKER: &str = "/resource/";
/// Link text fragment naming the dataset.
const DATASET_MARKER: &str = "PCA";
/// Crude recency filter on link text: any year 2020-2029.
const YEAR_MARKER: &str = "202";

/// Source of monthly resource references.
///
/// The HTML scrape below is one implementation; anything producing
/// `DatasetReference`s (a structured API, a fixture) can stand in for it.
#[allow(async_fn_in_trait)]
pub trait Catalog {
    async fn list_datasets(&self) -> Result<Vec<DatasetReference>, FetchError>;
}

/// Scrapes the dataset index page of the open-data portal.
pub struct HtmlCatalog<'a> {
    client: &'a Client,
    index_url: String,
    base: Url,
}

impl<'a> HtmlCatalog<'a> {
    pub fn new(client: &'a Client, config: &ScraperConfig) -> Result<Self, FetchError> {
        let base = Url::parse(&config.base_url).map_err(|source| FetchError::Url {
            url: config.base_url.clone(),
            source,
        })?;
        Ok(Self {
            client,
            index_url: config.dataset_url(),
            base,
        })
    }
}

impl Catalog for HtmlCatalog<'_> {
    #[instrument(level = "info", skip(self), fields(url = %self.index_url))]
    async fn list_datasets(&self) -> Result<Vec<DatasetReference>, FetchError> {
        let html = get_text(self.client, &self.index_url).await?;
        let refs = parse_catalog(&html, &self.base);
        info!(count = refs.len(), "catalog candidates");
        Ok(refs)
    }
}

/// Pull candidate monthly resources out of the index page HTML.
pub fn parse_catalog(html: &str, base: &Url) -> Vec<DatasetReference> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("a[href]").expect("selector should parse");

    let mut refs = Vec::new();
    for el in doc.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if !href.contains(RESOURCE_MARKER) {
            continue;
        }
        let text = el.text().collect::<String>();
        let title = text.trim();
        if !(title.contains(DATASET_MARKER) && title.contains(YEAR_MARKER)) {
            trace!(%href, %title, "not a monthly PCA link");
            continue;
        }
        let resource_url = match base.join(href) {
            Ok(u) => u.to_string(),
            Err(e) => {
                debug!(%href, error = %e, "unjoinable href");
                continue;
            }
        };
        let resource_id = href.rsplit('/').next().unwrap_or_default();
        refs.push(DatasetReference::new(title, resource_url, resource_id));
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
<html><body>
  <a href="/dataset/prescription-cost-analysis-pca-monthly-data/resource/aaa-111">
    Prescription Cost Analysis (PCA) - Jan 2021
  </a>
  <a href="/dataset/prescription-cost-analysis-pca-monthly-data/resource/bbb-222">PCA - Dec 2019</a>
  <a href="/dataset/prescription-cost-analysis-pca-monthly-data/resource/ccc-333">Data dictionary 2021</a>
  <a href="/about">PCA 2021 overview</a>
  <a href="https://elsewhere.example/resource/ddd-444">PCA - Feb 2022</a>
  <a>PCA - Mar 2022</a>
</body></html>"#;

    #[test]
    fn picks_resource_links_with_pca_and_year() {
        let base = Url::parse("https://opendata.nhsbsa.net").unwrap();
        let refs = parse_catalog(INDEX, &base);

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].title, "Prescription Cost Analysis (PCA) - Jan 2021");
        assert_eq!(
            refs[0].resource_url,
            "https://opendata.nhsbsa.net/dataset/prescription-cost-analysis-pca-monthly-data/resource/aaa-111"
        );
        assert_eq!(refs[0].resource_id, "aaa-111");
        assert_eq!(refs[0].date, None);

        // absolute hrefs are kept as-is
        assert_eq!(refs[1].resource_url, "https://elsewhere.example/resource/ddd-444");
        assert_eq!(refs[1].resource_id, "ddd-444");
    }

    #[test]
    fn empty_page_yields_nothing() {
        let base = Url::parse("https://opendata.nhsbsa.net").unwrap();
        assert!(parse_catalog("<html></html>", &base).is_empty());
    }
}
