use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::client::ReviewClient;
use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::models::{FetchOutcome, FetchRequest, ProgressEvent, Review, StopReason, START_CURSOR};

/// Receives progress notifications from a running fetch
pub trait ProgressObserver {
    /// Called once per page after its records have been accumulated
    fn on_page(&mut self, event: &ProgressEvent);

    /// Called the first time the API reports a total review count
    fn on_estimate(&mut self, _total: u64) {}

    fn on_complete(&mut self, _outcome: &FetchOutcome) {}
}

/// Observer that discards every event
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_page(&mut self, _event: &ProgressEvent) {}
}

/// Observer that reports progress through `tracing`
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_page(&mut self, event: &ProgressEvent) {
        info!(
            page = event.page,
            records = event.records,
            percent = (event.fraction * 100.0).round() as u32,
            "Fetched page"
        );
    }

    fn on_estimate(&mut self, total: u64) {
        info!(total, "Estimated total reviews");
    }

    fn on_complete(&mut self, outcome: &FetchOutcome) {
        match outcome.stop_reason {
            StopReason::PageLimit | StopReason::CursorRepeated => warn!(
                reason = %outcome.stop_reason,
                reviews = outcome.reviews.len(),
                "Stopped fetching before the end of the review list"
            ),
            StopReason::ShortPage | StopReason::NoCursor => info!(
                reason = %outcome.stop_reason,
                reviews = outcome.reviews.len(),
                "Fetched all reviews"
            ),
        }
    }
}

/// Walks the paginated review endpoint until a termination rule fires
pub struct ReviewFetcher {
    client: ReviewClient,
}

impl ReviewFetcher {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            client: ReviewClient::new(config)?,
        })
    }

    /// Fetch every page for `request`.
    ///
    /// Page limit, short page, missing cursor and repeated cursor all end the
    /// session successfully with the reviews gathered so far. A failed request
    /// ends it with an error and no reviews.
    pub async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &mut impl ProgressObserver,
    ) -> Result<FetchOutcome, FetchError> {
        let session_id = Uuid::new_v4();
        let span = info_span!(
            "fetch_reviews",
            session = %session_id,
            app_id = request.app_id,
            language = %request.language,
            max_pages = request.max_pages,
        );

        async move {
            info!("Starting review fetch");
            let outcome = self.run(session_id, request, progress).await?;
            info!(
                reviews = outcome.reviews.len(),
                pages = outcome.pages_fetched,
                reason = %outcome.stop_reason,
                "Review fetch complete"
            );
            progress.on_complete(&outcome);
            Ok::<_, FetchError>(outcome)
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        session_id: Uuid,
        request: &FetchRequest,
        progress: &mut impl ProgressObserver,
    ) -> Result<FetchOutcome, FetchError> {
        let page_size = self.client.page_size() as usize;
        let page_hint = self.client.config().progress_page_hint;

        let mut reviews: Vec<Review> = Vec::new();
        let mut cursor = START_CURSOR.to_string();
        let mut seen: HashSet<String> = HashSet::from([cursor.clone()]);
        let mut estimated_total: Option<u64> = None;
        let mut page: u32 = 0;

        let stop_reason = loop {
            page += 1;
            if page > request.max_pages {
                break StopReason::PageLimit;
            }

            debug!(page, cursor = %cursor, "Requesting page");

            let response = self
                .client
                .fetch_page(request.app_id, &cursor, &request.language)
                .await?;

            if estimated_total.is_none() {
                if let Some(total) = response.total_reviews() {
                    estimated_total = Some(total);
                    progress.on_estimate(total);
                }
            }

            let next_cursor = response.next_cursor().map(str::to_string);
            let batch = response.reviews.unwrap_or_default();
            let batch_len = batch.len();
            reviews.extend(batch);

            progress.on_page(&ProgressEvent::new(
                page,
                reviews.len(),
                estimated_total,
                page_hint,
            ));

            if batch_len < page_size {
                break StopReason::ShortPage;
            }

            let Some(next_cursor) = next_cursor else {
                break StopReason::NoCursor;
            };

            if !seen.insert(next_cursor.clone()) {
                warn!(cursor = %next_cursor, "Cursor repeated, stopping pagination");
                break StopReason::CursorRepeated;
            }

            cursor = next_cursor;
        };

        Ok(FetchOutcome {
            session_id,
            reviews,
            stop_reason,
            pages_fetched: page.min(request.max_pages),
            estimated_total,
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::LanguageFilter;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingProgress {
        pages: Vec<ProgressEvent>,
        estimate: Option<u64>,
        completed: bool,
    }

    impl ProgressObserver for RecordingProgress {
        fn on_page(&mut self, event: &ProgressEvent) {
            self.pages.push(event.clone());
        }

        fn on_estimate(&mut self, total: u64) {
            self.estimate = Some(total);
        }

        fn on_complete(&mut self, _outcome: &FetchOutcome) {
            self.completed = true;
        }
    }

    fn reviews(prefix: &str, count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| {
                json!({
                    "recommendationid": format!("{}-{}", prefix, i),
                    "author": {"steamid": format!("7656{}", i), "num_reviews": i}
                })
            })
            .collect()
    }

    async fn mount_page(server: &MockServer, cursor: &str, body: Value, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/appreviews/688130"))
            .and(query_param("cursor", cursor))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn fetcher_for(server: &MockServer) -> ReviewFetcher {
        ReviewFetcher::new(&ApiConfig {
            base_url: server.uri(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap()
    }

    fn request(max_pages: u32) -> FetchRequest {
        FetchRequest {
            app_id: 688130,
            language: LanguageFilter::All,
            max_pages,
        }
    }

    #[tokio::test]
    async fn test_short_page_terminates() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "*",
            json!({"success": 1, "query_summary": {"total_reviews": 230}, "reviews": reviews("a", 100), "cursor": "c1"}),
            1,
        )
        .await;
        mount_page(
            &server,
            "c1",
            json!({"success": 1, "reviews": reviews("b", 100), "cursor": "c2"}),
            1,
        )
        .await;
        mount_page(
            &server,
            "c2",
            json!({"success": 1, "reviews": reviews("c", 30), "cursor": "c3"}),
            1,
        )
        .await;

        let mut progress = RecordingProgress::default();
        let outcome = fetcher_for(&server)
            .fetch(&request(10), &mut progress)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::ShortPage);
        assert_eq!(outcome.reviews.len(), 230);
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(outcome.estimated_total, Some(230));

        assert_eq!(progress.estimate, Some(230));
        assert_eq!(progress.pages.len(), 3);
        assert_eq!(progress.pages[2].fraction, 1.0);
        assert!(progress.completed);
    }

    #[tokio::test]
    async fn test_empty_first_page_is_success() {
        let server = MockServer::start().await;
        mount_page(&server, "*", json!({"success": 1, "reviews": [], "cursor": "c1"}), 1).await;

        let outcome = fetcher_for(&server)
            .fetch(&request(5), &mut NoopProgress)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::ShortPage);
        assert!(outcome.reviews.is_empty());
    }

    #[tokio::test]
    async fn test_missing_reviews_field_counts_as_empty_page() {
        let server = MockServer::start().await;
        mount_page(&server, "*", json!({"success": 1, "cursor": "c1"}), 1).await;

        let outcome = fetcher_for(&server)
            .fetch(&request(5), &mut NoopProgress)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::ShortPage);
        assert_eq!(outcome.pages_fetched, 1);
    }

    #[tokio::test]
    async fn test_missing_cursor_terminates_after_two_pages() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "*",
            json!({"success": 1, "reviews": reviews("a", 100), "cursor": "c1"}),
            1,
        )
        .await;
        mount_page(&server, "c1", json!({"success": 1, "reviews": reviews("b", 100)}), 1).await;

        let outcome = fetcher_for(&server)
            .fetch(&request(2), &mut NoopProgress)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::NoCursor);
        assert_eq!(outcome.reviews.len(), 200);
        assert_eq!(outcome.pages_fetched, 2);
    }

    #[tokio::test]
    async fn test_page_limit_returns_partial_result() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "*",
            json!({"success": 1, "reviews": reviews("a", 100), "cursor": "c1"}),
            1,
        )
        .await;
        mount_page(
            &server,
            "c1",
            json!({"success": 1, "reviews": reviews("b", 100), "cursor": "c2"}),
            0,
        )
        .await;

        let outcome = fetcher_for(&server)
            .fetch(&request(1), &mut NoopProgress)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::PageLimit);
        assert_eq!(outcome.reviews.len(), 100);
        assert_eq!(outcome.pages_fetched, 1);
    }

    #[tokio::test]
    async fn test_repeated_cursor_terminates() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "*",
            json!({"success": 1, "reviews": reviews("a", 100), "cursor": "c1"}),
            1,
        )
        .await;
        mount_page(
            &server,
            "c1",
            json!({"success": 1, "reviews": reviews("b", 100), "cursor": "c1"}),
            1,
        )
        .await;

        let outcome = fetcher_for(&server)
            .fetch(&request(50), &mut NoopProgress)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::CursorRepeated);
        assert_eq!(outcome.reviews.len(), 200);
        assert_eq!(outcome.pages_fetched, 2);
    }

    #[tokio::test]
    async fn test_cursor_pointing_back_to_start_terminates() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "*",
            json!({"success": 1, "reviews": reviews("a", 100), "cursor": "*"}),
            1,
        )
        .await;

        let outcome = fetcher_for(&server)
            .fetch(&request(50), &mut NoopProgress)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::CursorRepeated);
        assert_eq!(outcome.reviews.len(), 100);
    }

    #[tokio::test]
    async fn test_never_exceeds_max_pages() {
        let server = MockServer::start().await;
        for i in 0..3 {
            let cursor = if i == 0 { "*".to_string() } else { format!("c{}", i) };
            mount_page(
                &server,
                &cursor,
                json!({"success": 1, "reviews": reviews("x", 100), "cursor": format!("c{}", i + 1)}),
                1,
            )
            .await;
        }
        mount_page(
            &server,
            "c3",
            json!({"success": 1, "reviews": reviews("x", 100), "cursor": "c4"}),
            0,
        )
        .await;

        let mut progress = RecordingProgress::default();
        let outcome = fetcher_for(&server)
            .fetch(&request(3), &mut progress)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::PageLimit);
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(outcome.reviews.len(), 300);
        assert_eq!(progress.pages.len(), 3);
        // No estimate: progress falls back to the page hint
        assert!((progress.pages[0].fraction - 1.0 / 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_transport_failure_on_first_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let mut progress = RecordingProgress::default();
        let err = fetcher_for(&server)
            .fetch(&request(5), &mut progress)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(progress.pages.is_empty());
        assert!(!progress.completed);
    }

    #[tokio::test]
    async fn test_failure_mid_session_discards_progress() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "*",
            json!({"success": 1, "reviews": reviews("a", 100), "cursor": "c1"}),
            1,
        )
        .await;
        mount_page(&server, "c1", json!({"success": 42}), 1).await;

        let mut progress = RecordingProgress::default();
        let err = fetcher_for(&server)
            .fetch(&request(5), &mut progress)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(progress.pages.len(), 1);
        assert!(!progress.completed);
    }
}
