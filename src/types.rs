// src/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One monthly resource listed on the catalog page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetReference {
    pub title: String,
    pub resource_url: String,
    pub resource_id: String,
    /// `YYYYMM`, attached by the date filter.
    pub date: Option<String>,
}

impl DatasetReference {
    pub fn new(
        title: impl Into<String>,
        resource_url: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            resource_url: resource_url.into(),
            resource_id: resource_id.into(),
            date: None,
        }
    }
}

/// A month that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub date: String,
    pub title: String,
    pub local_path: PathBuf,
    pub source_url: String,
    pub size_bytes: u64,
    pub downloaded_at: DateTime<Utc>,
}
