// src/config.rs

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};
use tracing::info;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://opendata.nhsbsa.net";
pub const DEFAULT_DATASET_SLUG: &str = "prescription-cost-analysis-pca-monthly-data";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_START_DATE: &str = "202101";
pub const DEFAULT_DOWNLOAD_DELAY_MS: u64 = 3_000;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Columns kept from every monthly file, in output order.
pub const DEFAULT_REQUIRED_COLUMNS: &[&str] = &[
    "YEAR",
    "YEAR_MONTH",
    "REGION_NAME",
    "BNF_CHEMICAL_SUBSTANCE",
    "ITEMS",
    "COST",
];

/// Environment variable naming an optional YAML file that overrides defaults.
pub const CONFIG_ENV: &str = "PCA_SCRAPER_CONFIG";

/// Everything the pipeline needs, passed by reference into each step.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    pub dataset_slug: String,
    pub user_agent: String,
    pub data_dir: PathBuf,
    pub output_filename: String,
    pub start_date: String,
    pub download_delay_ms: u64,
    pub retry_delay_ms: u64,
    pub max_retries: u32,
    pub required_columns: Vec<String>,
    pub write_parquet: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            dataset_slug: DEFAULT_DATASET_SLUG.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            data_dir: PathBuf::from("pca_data"),
            output_filename: "combined_pca_data.csv".to_string(),
            start_date: DEFAULT_START_DATE.to_string(),
            download_delay_ms: DEFAULT_DOWNLOAD_DELAY_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            required_columns: DEFAULT_REQUIRED_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            write_parquet: true,
        }
    }
}

impl ScraperConfig {
    /// Defaults, overlaid by the YAML file named in `PCA_SCRAPER_CONFIG` if set.
    pub fn load() -> Result<Self> {
        let cfg = match env::var(CONFIG_ENV) {
            Ok(path) => {
                info!(%path, "loading config");
                let text =
                    fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
                Self::from_yaml(&text).with_context(|| format!("parsing {}", path))?
            }
            Err(_) => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date.len() != 6
            || NaiveDate::parse_from_str(&format!("{}01", self.start_date), "%Y%m%d").is_err()
        {
            bail!("start_date must be YYYYMM, got {:?}", self.start_date);
        }
        if self.max_retries == 0 {
            bail!("max_retries must be at least 1");
        }
        if self.required_columns.is_empty() {
            bail!("required_columns must not be empty");
        }
        Url::parse(&self.base_url).with_context(|| format!("base_url {}", self.base_url))?;
        Ok(())
    }

    pub fn base(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("base_url {}", self.base_url))
    }

    /// The catalog index page listing every monthly resource.
    pub fn dataset_url(&self) -> String {
        format!(
            "{}/dataset/{}",
            self.base_url.trim_end_matches('/'),
            self.dataset_slug
        )
    }

    /// Guessed download URL for a resource whose page could not be resolved.
    pub fn fallback_download_url(&self, resource_id: &str) -> String {
        format!("{}/resource/{}/download", self.dataset_url(), resource_id)
    }

    pub fn output_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_filename)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
