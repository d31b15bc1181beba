use tracing::debug;

use crate::{process::date_parser::extract_date_from_title, types::DatasetReference};

/// Keep references dated at or after `start_date` (`YYYYMM`), with the date
/// attached, sorted oldest first.
///
/// Zero-padded `YYYYMM` strings order the same as the months they name, so
/// plain string comparison is enough. Two references for the same month both
/// pass through.
pub fn filter_datasets_by_date_range(
    datasets: Vec<DatasetReference>,
    start_date: &str,
) -> Vec<DatasetReference> {
    let mut kept: Vec<DatasetReference> = datasets
        .into_iter()
        .filter_map(|mut ds| match extract_date_from_title(&ds.title) {
            Some(date) if date.as_str() >= start_date => {
                ds.date = Some(date);
                Some(ds)
            }
            Some(date) => {
                debug!(title = %ds.title, %date, "before start date");
                None
            }
            None => {
                debug!(title = %ds.title, "no month in title");
                None
            }
        })
        .collect();

    kept.sort_by(|a, b| a.date.cmp(&b.date));
    kept
}
