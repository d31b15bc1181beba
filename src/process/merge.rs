use anyhow::{Context, Result};
use arrow::{
    array::{new_null_array, ArrayRef},
    compute::{cast, concat_batches},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::info;

use crate::process::normalize::{SOURCE_DATE_COLUMN, SOURCE_TITLE_COLUMN};

/// The declared output schema: every required column, then provenance.
pub fn combined_schema(required: &[String]) -> SchemaRef {
    let fields: Vec<Field> = required
        .iter()
        .map(String::as_str)
        .chain([SOURCE_DATE_COLUMN, SOURCE_TITLE_COLUMN])
        .map(|n| Field::new(n, DataType::Utf8, true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Rebuild `batch` with exactly the columns of `schema`, null-filling any the
/// batch lacks and dropping any it has beyond them.
pub fn align_to_schema(batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let columns = schema
        .fields()
        .iter()
        .map(|field| match batch.column_by_name(field.name()) {
            Some(col) if col.data_type() == field.data_type() => Ok(col.clone()),
            Some(col) => cast(col, field.data_type())
                .with_context(|| format!("casting column {}", field.name())),
            None => Ok(new_null_array(field.data_type(), rows)),
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    RecordBatch::try_new(schema.clone(), columns).context("aligning batch to combined schema")
}

/// Row-concatenate monthly tables under the declared column list.
///
/// Tables may carry differing subsets of the required columns; the result
/// always has the full declared schema.
pub fn merge_tables(tables: &[RecordBatch], required: &[String]) -> Result<RecordBatch> {
    let schema = combined_schema(required);
    let aligned = tables
        .iter()
        .map(|t| align_to_schema(t, &schema))
        .collect::<Result<Vec<_>>>()?;

    info!("Concatenating {} datasets", aligned.len());
    concat_batches(&schema, &aligned).context("concatenating monthly tables")
}
