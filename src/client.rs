use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::models::{LanguageFilter, ReviewPage};

/// HTTP adapter for the Steam store review endpoint
pub struct ReviewClient {
    client: Client,
    config: ApiConfig,
}

impl ReviewClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn page_size(&self) -> u32 {
        self.config.num_per_page
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn query_params(&self, cursor: &str, language: &LanguageFilter) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("json", "1".to_string()),
            ("filter", self.config.filter.clone()),
            ("day_range", self.config.day_range.to_string()),
            ("num_per_page", self.config.num_per_page.to_string()),
            ("review_type", self.config.review_type.clone()),
            ("purchase_type", self.config.purchase_type.clone()),
            ("cursor", cursor.to_string()),
        ];

        match language {
            LanguageFilter::All if !self.config.send_all_language => {}
            other => params.push(("language", other.as_str().to_string())),
        }

        params
    }

    /// Request a single page of reviews
    #[instrument(skip(self, language), fields(language = %language))]
    pub async fn fetch_page(
        &self,
        app_id: u32,
        cursor: &str,
        language: &LanguageFilter,
    ) -> Result<ReviewPage, FetchError> {
        let url = format!(
            "{}/appreviews/{}",
            self.config.base_url.trim_end_matches('/'),
            app_id
        );

        let response = self
            .client
            .get(&url)
            .query(&self.query_params(cursor, language))
            .send()
            .await?;

        debug!(url = %response.url(), "Review page requested");

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::HttpStatus { status, body });
        }

        let body = response.text().await?;

        let page: ReviewPage = serde_json::from_str(&body)
            .map_err(|source| FetchError::Decode { source, body: body.clone() })?;

        if !page.is_success() {
            return Err(FetchError::Rejected { body });
        }

        debug!(
            reviews = page.reviews.as_ref().map_or(0, Vec::len),
            has_cursor = page.next_cursor().is_some(),
            "Review page received"
        );

        Ok(page)
    }
}
