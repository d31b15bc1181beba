// src/summary.rs

use anyhow::Result;
use arrow::{
    array::{Array, StringArray},
    record_batch::RecordBatch,
    util::pretty::pretty_format_batches,
};
use std::path::PathBuf;

use crate::process::{utils::parse_numeric, SOURCE_DATE_COLUMN, SOURCE_TITLE_COLUMN};

const SAMPLE_ROWS: usize = 5;

/// describe()-style statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

/// What a finished combine run produced.
#[derive(Debug, Clone)]
pub struct CombinedSummary {
    pub output_path: PathBuf,
    pub parquet_path: Option<PathBuf>,
    pub total_rows: usize,
    pub columns: Vec<String>,
    pub date_range: Option<(String, String)>,
    pub file_size_bytes: u64,
    pub sample: String,
    pub numeric: Vec<NumericSummary>,
}

impl CombinedSummary {
    pub fn from_batch(
        batch: &RecordBatch,
        output_path: PathBuf,
        parquet_path: Option<PathBuf>,
        file_size_bytes: u64,
    ) -> Result<Self> {
        let columns = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let sample_len = batch.num_rows().min(SAMPLE_ROWS);
        let sample = pretty_format_batches(&[batch.slice(0, sample_len)])?.to_string();

        Ok(Self {
            output_path,
            parquet_path,
            total_rows: batch.num_rows(),
            columns,
            date_range: date_range(batch),
            file_size_bytes,
            sample,
            numeric: describe(batch),
        })
    }

    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn print_report(&self) {
        println!("\nAll data combined into: {}", self.output_path.display());
        if let Some(p) = &self.parquet_path {
            println!("Parquet copy:           {}", p.display());
        }
        println!("\nDataset Info:");
        println!("- Total records: {}", self.total_rows);
        println!("- Columns: {:?}", self.columns);
        match &self.date_range {
            Some((lo, hi)) => println!("- Date range: {} to {}", lo, hi),
            None => println!("- Date range: <none>"),
        }
        println!("- File size: {:.1} MB", self.file_size_mb());

        println!("\nSample of combined data:");
        println!("{}", self.sample);

        if !self.numeric.is_empty() {
            println!("\nSummary statistics for numeric columns:");
            println!(
                "{:<24} {:>10} {:>14} {:>14} {:>12} {:>12} {:>12} {:>12} {:>14}",
                "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
            );
            for s in &self.numeric {
                let std = s.std.map_or("NaN".to_string(), |v| format!("{:.3}", v));
                println!(
                    "{:<24} {:>10} {:>14.3} {:>14} {:>12.3} {:>12.3} {:>12.3} {:>12.3} {:>14.3}",
                    s.column, s.count, s.mean, std, s.min, s.p25, s.p50, s.p75, s.max
                );
            }
        }
    }
}

/// Lowest and highest source month present in the provenance column.
pub fn date_range(batch: &RecordBatch) -> Option<(String, String)> {
    let dates = batch
        .column_by_name(SOURCE_DATE_COLUMN)?
        .as_any()
        .downcast_ref::<StringArray>()?;
    let min = dates.iter().flatten().min()?;
    let max = dates.iter().flatten().max()?;
    Some((min.to_string(), max.to_string()))
}

/// Statistics for every non-provenance column whose non-empty cells all parse
/// as numbers.
pub fn describe(batch: &RecordBatch) -> Vec<NumericSummary> {
    let schema = batch.schema();
    schema
        .fields()
        .iter()
        .zip(batch.columns())
        .filter(|(f, _)| f.name() != SOURCE_DATE_COLUMN && f.name() != SOURCE_TITLE_COLUMN)
        .filter_map(|(f, col)| {
            let strings = col.as_any().downcast_ref::<StringArray>()?;
            let values = numeric_values(strings)?;
            summarize(f.name(), values)
        })
        .collect()
}

fn numeric_values(col: &StringArray) -> Option<Vec<f64>> {
    let mut values = Vec::with_capacity(col.len() - col.null_count());
    for cell in col.iter().flatten() {
        if cell.trim().is_empty() {
            continue;
        }
        values.push(parse_numeric(cell)?);
    }
    Some(values)
}

fn summarize(column: &str, mut values: Vec<f64>) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = (n > 1).then(|| {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    });

    Some(NumericSummary {
        column: column.to_string(),
        count: n,
        mean,
        std,
        min: values[0],
        p25: quantile(&values, 0.25),
        p50: quantile(&values, 0.5),
        p75: quantile(&values, 0.75),
        max: values[n - 1],
    })
}

/// Linear-interpolated quantile of already sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
