// src/process/mod.rs

pub mod date_parser;
pub mod filter;
pub mod merge;
pub mod normalize;
pub mod utils;
pub mod write;

pub use date_parser::extract_date_from_title;
pub use filter::filter_datasets_by_date_range;
pub use merge::{combined_schema, merge_tables};
pub use normalize::{normalize_month, SOURCE_DATE_COLUMN, SOURCE_TITLE_COLUMN};
