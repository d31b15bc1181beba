use anyhow::{Context, Result};
use arrow::{csv::WriterBuilder, record_batch::RecordBatch};
use parquet::{
    arrow::ArrowWriter,
    basic::{BrotliLevel, Compression},
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    path::Path,
};

/// Write `batch` as CSV with a header row; returns the file size in bytes.
pub fn write_csv(batch: &RecordBatch, output_path: &Path) -> Result<u64> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    {
        let file = File::create(output_path)
            .with_context(|| format!("creating file {}", output_path.display()))?;
        let mut writer = WriterBuilder::new().with_header(true).build(file);
        writer.write(batch).context("writing CSV batch")?;
    }
    let metadata = fs::metadata(output_path).context("getting file metadata")?;
    Ok(metadata.len())
}

/// Write `batch` as a Brotli-compressed Parquet file; returns its size in bytes.
pub fn write_parquet(batch: &RecordBatch, output_path: &Path) -> Result<u64> {
    let file = File::create(output_path)
        .with_context(|| format!("creating file {}", output_path.display()))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(BrotliLevel::try_new(5)?))
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;

    let metadata = fs::metadata(output_path).context("getting file metadata")?;
    Ok(metadata.len())
}
