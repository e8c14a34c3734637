pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod models;
pub mod service;

pub use cache::FetchCache;
pub use client::ReviewClient;
pub use config::Config;
pub use error::{ErrorKind, ExportError, FetchError, RunError};
pub use export::{export_csv, export_file_name, flatten_review};
pub use fetcher::{LogProgress, NoopProgress, ProgressObserver, ReviewFetcher};
pub use models::*;
pub use service::{ExportOutcome, ReviewService};
