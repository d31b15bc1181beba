// src/pipeline.rs

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::{fs, time::sleep};
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::{
    config::ScraperConfig,
    fetch::{build_client, download_dataset, resolve_download_url, Catalog, HtmlCatalog},
    process::{filter_datasets_by_date_range, merge_tables, normalize_month, write},
    summary::CombinedSummary,
    types::{DatasetReference, DownloadRecord},
};

pub const MANIFEST_FILENAME: &str = "download_manifest.json";

/// Per-month file name under the data directory.
pub fn month_filename(date: &str) -> String {
    format!("PCA_{}.csv", date)
}

/// Result of a full run.
#[derive(Debug)]
pub struct RunReport {
    pub downloads: Vec<DownloadRecord>,
    pub combined: Option<CombinedSummary>,
}

/// List, filter, download and combine, start to finish.
pub async fn run(config: &ScraperConfig) -> Result<RunReport> {
    let client = build_client(config)?;
    let catalog = HtmlCatalog::new(&client, config)?;

    let downloads = scrape_all(&client, &catalog, config).await;
    if downloads.is_empty() {
        return Ok(RunReport {
            downloads,
            combined: None,
        });
    }

    let combined = tokio::task::spawn_blocking({
        let records = downloads.clone();
        let config = config.clone();
        move || combine_datasets(&records, &config)
    })
    .await??;

    Ok(RunReport {
        downloads,
        combined,
    })
}

/// Download every catalog month at or after the configured start date.
///
/// A failed catalog fetch yields an empty list. After that, a failing month
/// is logged and skipped; it never aborts the others.
#[instrument(level = "info", skip_all, fields(start_date = %config.start_date))]
pub async fn scrape_all<C: Catalog>(
    client: &Client,
    catalog: &C,
    config: &ScraperConfig,
) -> Vec<DownloadRecord> {
    info!("Starting NHS PCA data scraping");

    let datasets = match catalog.list_datasets().await {
        Ok(d) => d,
        Err(e) => {
            error!(error = %e, "Error getting available datasets");
            Vec::new()
        }
    };
    if datasets.is_empty() {
        error!("No datasets found!");
        return Vec::new();
    }
    info!("Found {} total datasets", datasets.len());

    let filtered = filter_datasets_by_date_range(datasets, &config.start_date);
    info!(
        "Found {} datasets from {} onwards",
        filtered.len(),
        config.start_date
    );

    let base = match config.base() {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "unusable base URL");
            return Vec::new();
        }
    };

    let total = filtered.len();
    let mut downloaded = Vec::new();
    for (i, dataset) in filtered.iter().enumerate() {
        info!("Processing dataset {}/{}: {}", i + 1, total, dataset.title);

        match fetch_month(client, &base, dataset, config).await {
            Ok(Some(record)) => downloaded.push(record),
            Ok(None) => warn!("Failed to download {}", dataset.title),
            Err(e) => error!(title = %dataset.title, error = %e, "Error processing dataset"),
        }

        if i + 1 < total {
            sleep(config.download_delay()).await;
        }
    }

    info!("Scraping completed. Downloaded {} files", downloaded.len());
    if !downloaded.is_empty() {
        if let Err(e) = write_manifest(&downloaded, &config.data_dir).await {
            warn!(error = %e, "could not write download manifest");
        }
    }
    downloaded
}

async fn fetch_month(
    client: &Client,
    base: &Url,
    dataset: &DatasetReference,
    config: &ScraperConfig,
) -> Result<Option<DownloadRecord>> {
    let date = dataset
        .date
        .clone()
        .context("reference reached download without a date")?;

    let url = match resolve_download_url(client, base, &dataset.resource_url).await {
        Some(u) => u.to_string(),
        None => {
            let guess = config.fallback_download_url(&dataset.resource_id);
            warn!(title = %dataset.title, url = %guess, "falling back to constructed download URL");
            guess
        }
    };

    let filename = month_filename(&date);
    let Some(local_path) = download_dataset(
        client,
        &url,
        &config.data_dir,
        &filename,
        config.max_retries,
        config.retry_delay(),
    )
    .await
    else {
        return Ok(None);
    };

    let size_bytes = fs::metadata(&local_path)
        .await
        .with_context(|| format!("stat {}", local_path.display()))?
        .len();

    Ok(Some(DownloadRecord {
        date,
        title: dataset.title.clone(),
        local_path,
        source_url: url,
        size_bytes,
        downloaded_at: Utc::now(),
    }))
}

async fn write_manifest(records: &[DownloadRecord], dir: &Path) -> Result<PathBuf> {
    let path = dir.join(MANIFEST_FILENAME);
    let json = serde_json::to_string_pretty(records)?;
    fs::write(&path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "wrote download manifest");
    Ok(path)
}

/// Normalize every downloaded month and write the combined table.
///
/// Months that cannot be read or lack every required column are skipped.
/// Returns `None` when nothing was left to combine.
pub fn combine_datasets(
    records: &[DownloadRecord],
    config: &ScraperConfig,
) -> Result<Option<CombinedSummary>> {
    if records.is_empty() {
        warn!("No files to combine");
        return Ok(None);
    }
    info!("Combining {} datasets...", records.len());

    let mut tables = Vec::with_capacity(records.len());
    for record in records {
        match normalize_month(record, &config.required_columns) {
            Ok(Some(table)) => {
                info!("Added {} records from {}", table.num_rows(), record.date);
                tables.push(table);
            }
            Ok(None) => warn!(
                "Skipping {} - no required columns found",
                record.local_path.display()
            ),
            Err(e) => error!(
                path = %record.local_path.display(),
                error = %e,
                "Error reading downloaded file"
            ),
        }
    }
    if tables.is_empty() {
        warn!("No month contributed any rows");
        return Ok(None);
    }

    let merged = merge_tables(&tables, &config.required_columns)?;

    let output_path = config.output_path();
    let size = write::write_csv(&merged, &output_path)?;
    info!("Combined dataset saved to {}", output_path.display());

    let parquet_path = if config.write_parquet {
        let p = output_path.with_extension("parquet");
        match write::write_parquet(&merged, &p) {
            Ok(bytes) => {
                info!(path = %p.display(), bytes, "wrote parquet copy");
                Some(p)
            }
            Err(e) => {
                warn!(path = %p.display(), error = %e, "parquet copy failed, keeping CSV only");
                None
            }
        }
    } else {
        None
    };

    let summary = CombinedSummary::from_batch(&merged, output_path, parquet_path, size)?;
    info!("Total records: {}", summary.total_rows);
    info!("Columns: {:?}", summary.columns);
    if let Some((lo, hi)) = &summary.date_range {
        info!("Date range: {} to {}", lo, hi);
    }
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::fs as stdfs;
    use tempfile::tempdir;

    struct FailingCatalog;

    impl Catalog for FailingCatalog {
        async fn list_datasets(&self) -> Result<Vec<DatasetReference>, FetchError> {
            Err(FetchError::Status {
                url: "http://portal/dataset".into(),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            })
        }
    }

    struct FixedCatalog(Vec<DatasetReference>);

    impl Catalog for FixedCatalog {
        async fn list_datasets(&self) -> Result<Vec<DatasetReference>, FetchError> {
            Ok(self.0.clone())
        }
    }

    fn test_config(dir: &Path) -> ScraperConfig {
        ScraperConfig {
            base_url: "http://127.0.0.1:9".into(),
            data_dir: dir.to_path_buf(),
            download_delay_ms: 0,
            retry_delay_ms: 0,
            max_retries: 1,
            ..ScraperConfig::default()
        }
    }

    #[tokio::test]
    async fn catalog_failure_means_no_downloads() {
        let tmp = tempdir().unwrap();
        let cfg = test_config(tmp.path());
        let out = scrape_all(&Client::new(), &FailingCatalog, &cfg).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn unreachable_months_are_skipped_not_fatal() {
        let tmp = tempdir().unwrap();
        let cfg = test_config(tmp.path());
        let catalog = FixedCatalog(vec![
            DatasetReference::new("PCA - Jan 2021", "http://127.0.0.1:9/resource/a", "a"),
            DatasetReference::new("PCA - Feb 2021", "http://127.0.0.1:9/resource/b", "b"),
        ]);
        let out = scrape_all(&Client::new(), &catalog, &cfg).await;
        assert!(out.is_empty());
        assert!(!tmp.path().join(MANIFEST_FILENAME).exists());
    }

    #[test]
    fn combine_skips_bad_months_and_reports_range() {
        let tmp = tempdir().unwrap();
        let mut cfg = test_config(tmp.path());
        cfg.required_columns = vec!["YEAR_MONTH".into(), "ITEMS".into(), "COST".into()];

        let jan = tmp.path().join(month_filename("202101"));
        stdfs::write(&jan, "YEAR_MONTH,ITEMS,COST\n202101,1,2.5\n202101,3,4.5\n").unwrap();
        let feb = tmp.path().join(month_filename("202102"));
        stdfs::write(&feb, "UNRELATED\nx\n").unwrap();
        let mar = tmp.path().join(month_filename("202103"));
        stdfs::write(&mar, "YEAR_MONTH,ITEMS\n202103,9\n").unwrap();

        let rec = |date: &str, path: &Path| DownloadRecord {
            date: date.into(),
            title: format!("PCA - {}", date),
            local_path: path.to_path_buf(),
            source_url: String::new(),
            size_bytes: 0,
            downloaded_at: Utc::now(),
        };
        let records = vec![
            rec("202101", &jan),
            rec("202102", &feb),
            rec("202103", &mar),
            rec("202104", &tmp.path().join("missing.csv")),
        ];

        let summary = combine_datasets(&records, &cfg).unwrap().unwrap();
        assert_eq!(summary.total_rows, 3);
        assert_eq!(
            summary.columns,
            vec!["YEAR_MONTH", "ITEMS", "COST", "data_source_date", "data_source_title"]
        );
        assert_eq!(
            summary.date_range,
            Some(("202101".to_string(), "202103".to_string()))
        );
        assert!(summary.output_path.exists());
        assert!(summary.parquet_path.as_ref().unwrap().exists());

        let text = stdfs::read_to_string(&summary.output_path).unwrap();
        assert!(text.starts_with(
            "YEAR_MONTH,ITEMS,COST,data_source_date,data_source_title\n"
        ));
        assert!(text.contains("202103,9,,202103,PCA - 202103"));
    }

    #[test]
    fn parquet_failure_keeps_csv_output() {
        let tmp = tempdir().unwrap();
        let mut cfg = test_config(tmp.path());
        cfg.required_columns = vec!["ITEMS".into()];

        // a directory squatting on the parquet path makes File::create fail
        stdfs::create_dir(cfg.output_path().with_extension("parquet")).unwrap();

        let jan = tmp.path().join(month_filename("202101"));
        stdfs::write(&jan, "ITEMS\n4\n").unwrap();
        let records = vec![DownloadRecord {
            date: "202101".into(),
            title: "PCA - Jan 2021".into(),
            local_path: jan,
            source_url: String::new(),
            size_bytes: 0,
            downloaded_at: Utc::now(),
        }];

        let summary = combine_datasets(&records, &cfg).unwrap().unwrap();
        assert_eq!(summary.total_rows, 1);
        assert!(summary.output_path.exists());
        assert!(summary.parquet_path.is_none());
    }

    #[test]
    fn nothing_to_combine() {
        let tmp = tempdir().unwrap();
        let cfg = test_config(tmp.path());
        assert!(combine_datasets(&[], &cfg).unwrap().is_none());
    }
}
