use anyhow::{bail, Context, Result};
use arrow::{
    array::{ArrayRef, StringArray},
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{fs::File, path::Path, sync::Arc};
use tracing::{error, info, warn};

use crate::{process::utils::clean_str, types::DownloadRecord};

/// Provenance column holding the source month (`YYYYMM`).
pub const SOURCE_DATE_COLUMN: &str = "data_source_date";
/// Provenance column holding the source resource title.
pub const SOURCE_TITLE_COLUMN: &str = "data_source_title";

const BATCH_SIZE: usize = 64 * 1024;

/// Read a whole CSV file into one batch, every column as nullable text.
///
/// Column names come from arrow's own header parse, so quoted names with
/// embedded commas survive; only the types it guesses are thrown away.
pub fn load_csv(path: &Path) -> Result<RecordBatch> {
    let header_file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let (inferred, _) = Format::default()
        .with_header(true)
        .with_quote(b'"')
        .with_delimiter(b',')
        .infer_schema(header_file, Some(0))
        .with_context(|| format!("reading header of {}", path.display()))?;
    if inferred.fields().is_empty() {
        bail!("{} has no header line", path.display());
    }

    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(clean_str(f.name()), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .with_quote(b'"')
        .with_delimiter(b',')
        .build(file)
        .context("creating CSV reader")?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parsing {}", path.display()))?;
    concat_batches(&schema, &batches).context("concatenating CSV batches")
}

/// Outcome of projecting one table onto the required columns.
#[derive(Debug)]
pub struct Projection {
    /// `None` when not a single required column was present.
    pub batch: Option<RecordBatch>,
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

/// Keep only the required columns that exist in `batch`, in required order.
pub fn project_required(batch: &RecordBatch, required: &[String]) -> Result<Projection> {
    let schema = batch.schema();
    let mut indices = Vec::new();
    let mut present = Vec::new();
    let mut missing = Vec::new();

    for name in required {
        match schema.column_with_name(name) {
            Some((idx, _)) => {
                indices.push(idx);
                present.push(name.clone());
            }
            None => missing.push(name.clone()),
        }
    }

    let batch = if indices.is_empty() {
        None
    } else {
        Some(batch.project(&indices).context("projecting required columns")?)
    };

    Ok(Projection {
        batch,
        present,
        missing,
    })
}

/// Append the source month and title to every row.
pub fn tag_provenance(batch: &RecordBatch, date: &str, title: &str) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let schema = batch.schema();

    let mut fields: Vec<Arc<Field>> = schema.fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(SOURCE_DATE_COLUMN, DataType::Utf8, true)));
    fields.push(Arc::new(Field::new(SOURCE_TITLE_COLUMN, DataType::Utf8, true)));

    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    columns.push(Arc::new(StringArray::from(vec![date; rows])));
    columns.push(Arc::new(StringArray::from(vec![title; rows])));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("adding provenance columns")
}

/// Load one downloaded month and reduce it to the required columns plus
/// provenance. `Ok(None)` means the file had none of the required columns.
pub fn normalize_month(record: &DownloadRecord, required: &[String]) -> Result<Option<RecordBatch>> {
    info!("Reading {}", record.local_path.display());
    let batch = load_csv(&record.local_path)?;

    let available: Vec<&str> = batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    info!(date = %record.date, "Available columns: {:?}", available);

    let projection = project_required(&batch, required)?;
    if !projection.missing.is_empty() {
        warn!(date = %record.date, "Missing columns: {:?}", projection.missing);
    }

    match projection.batch {
        Some(projected) => {
            info!(date = %record.date, "Filtering to columns: {:?}", projection.present);
            let tagged = tag_provenance(&projected, &record.date, &record.title)?;
            info!(date = %record.date, rows = tagged.num_rows(), "normalized");
            Ok(Some(tagged))
        }
        None => {
            error!(
                path = %record.local_path.display(),
                "None of the required columns found in dataset"
            );
            Ok(None)
        }
    }
}
