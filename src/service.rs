use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cache::FetchCache;
use crate::config::Config;
use crate::error::{FetchError, RunError};
use crate::export::{export_csv, export_file_name};
use crate::fetcher::{ProgressObserver, ReviewFetcher};
use crate::models::{FetchKey, FetchOutcome, FetchRequest};

/// Result of a fetch-then-export run
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub key: FetchKey,
    pub outcome: Arc<FetchOutcome>,
    pub from_cache: bool,
    pub file_name: String,
    /// `None` when no reviews were fetched
    pub csv: Option<Vec<u8>>,
}

/// Fetches reviews and turns them into a downloadable CSV
pub struct ReviewService {
    config: Config,
    fetcher: ReviewFetcher,
    cache: FetchCache,
}

impl ReviewService {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = ReviewFetcher::new(&config.api)?;
        Ok(Self {
            config,
            fetcher,
            cache: FetchCache::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate raw caller input against the configured page ceiling
    pub fn parse_request(
        &self,
        app_id: &str,
        language: &str,
        max_pages: u32,
    ) -> Result<FetchRequest, FetchError> {
        FetchRequest::parse(app_id, language, max_pages, self.config.api.max_pages_ceiling)
    }

    /// Fetch reviews for `request` (or reuse the last identical fetch) and export them
    pub async fn run(
        &mut self,
        request: &FetchRequest,
        progress: &mut impl ProgressObserver,
    ) -> Result<ExportOutcome, RunError> {
        let key = request.key();

        if self.cache.key().is_some_and(|cached| *cached != key) {
            debug!("Fetch parameters changed, discarding cached reviews");
            self.cache.invalidate();
        }

        let (outcome, from_cache) = match self.cache.get(&key) {
            Some(outcome) => {
                info!(app_id = key.app_id, "Reusing previously fetched reviews");
                (outcome, true)
            }
            None => {
                let outcome = self.fetcher.fetch(request, progress).await?;
                (self.cache.store(key.clone(), outcome), false)
            }
        };

        let csv = export_csv(&outcome.reviews)?;

        if csv.is_none() {
            info!(app_id = key.app_id, "No reviews to export");
        }

        Ok(ExportOutcome {
            file_name: export_file_name(&key),
            key,
            outcome,
            from_cache,
            csv,
        })
    }
}
