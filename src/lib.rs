pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod summary;
pub mod types;

pub use config::ScraperConfig;
pub use error::FetchError;
pub use types::{DatasetReference, DownloadRecord};
