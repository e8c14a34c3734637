use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::FetchError;

/// A single review as returned by the API. No schema is enforced.
pub type Review = Map<String, Value>;

/// Cursor value that starts a pagination session
pub const START_CURSOR: &str = "*";

/// Language codes accepted by the Steam store review endpoint
const LANGUAGES: &[&str] = &[
    "arabic",
    "brazilian",
    "bulgarian",
    "czech",
    "danish",
    "dutch",
    "english",
    "finnish",
    "french",
    "german",
    "greek",
    "hungarian",
    "indonesian",
    "italian",
    "japanese",
    "koreana",
    "latam",
    "norwegian",
    "polish",
    "portuguese",
    "romanian",
    "russian",
    "schinese",
    "spanish",
    "swedish",
    "tchinese",
    "thai",
    "turkish",
    "ukrainian",
    "vietnamese",
];

pub fn recognized_languages() -> &'static [&'static str] {
    LANGUAGES
}

/// Language restriction for a fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageFilter {
    #[default]
    All,
    Code(String),
}

impl LanguageFilter {
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.is_empty() || normalized == "all" {
            return Ok(LanguageFilter::All);
        }
        if LANGUAGES.contains(&normalized.as_str()) {
            Ok(LanguageFilter::Code(normalized))
        } else {
            Err(FetchError::InvalidInput(format!(
                "unrecognized language code: {}",
                input.trim()
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LanguageFilter::All => "all",
            LanguageFilter::Code(code) => code,
        }
    }
}

impl fmt::Display for LanguageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a fetch; equal keys produce interchangeable results
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchKey {
    pub app_id: u32,
    pub language: LanguageFilter,
    pub max_pages: u32,
}

/// A validated request to fetch reviews
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub app_id: u32,
    pub language: LanguageFilter,
    pub max_pages: u32,
}

impl FetchRequest {
    /// Validate raw caller input. `ceiling` bounds `max_pages`.
    pub fn parse(
        app_id: &str,
        language: &str,
        max_pages: u32,
        ceiling: u32,
    ) -> Result<Self, FetchError> {
        let app_id = app_id.trim();
        let app_id: u32 = app_id.parse().map_err(|_| {
            FetchError::InvalidInput(format!("app id must be a positive integer, got: {}", app_id))
        })?;
        if app_id == 0 {
            return Err(FetchError::InvalidInput(
                "app id must be a positive integer, got: 0".to_string(),
            ));
        }

        if max_pages == 0 || max_pages > ceiling {
            return Err(FetchError::InvalidInput(format!(
                "max pages must be between 1 and {}, got: {}",
                ceiling, max_pages
            )));
        }

        Ok(Self {
            app_id,
            language: LanguageFilter::parse(language)?,
            max_pages,
        })
    }

    pub fn key(&self) -> FetchKey {
        FetchKey {
            app_id: self.app_id,
            language: self.language.clone(),
            max_pages: self.max_pages,
        }
    }
}

/// One page of the review endpoint's response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewPage {
    pub success: Option<Value>,
    pub query_summary: Option<QuerySummary>,
    pub reviews: Option<Vec<Review>>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuerySummary {
    pub total_reviews: Option<Value>,
}

impl ReviewPage {
    pub fn is_success(&self) -> bool {
        self.success.as_ref().and_then(Value::as_i64) == Some(1)
    }

    /// Total review estimate, accepting integer or float encodings
    pub fn total_reviews(&self) -> Option<u64> {
        let total = self.query_summary.as_ref()?.total_reviews.as_ref()?;
        total
            .as_u64()
            .or_else(|| total.as_f64().filter(|t| *t >= 0.0).map(|t| t as u64))
    }

    /// Next cursor, treating an empty string as absent
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// Why a fetch session stopped without failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    PageLimit,
    ShortPage,
    NoCursor,
    CursorRepeated,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::PageLimit => "page limit reached",
            StopReason::ShortPage => "last page reached",
            StopReason::NoCursor => "no further cursor",
            StopReason::CursorRepeated => "cursor repeated",
        };
        f.write_str(text)
    }
}

/// Result of a successful fetch session
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub session_id: Uuid,
    pub reviews: Vec<Review>,
    pub stop_reason: StopReason,
    pub pages_fetched: u32,
    pub estimated_total: Option<u64>,
    pub completed_at: DateTime<Utc>,
}

/// Progress snapshot emitted after each page
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub page: u32,
    pub records: usize,
    pub estimated_total: Option<u64>,
    /// Completion estimate in `[0, 1]`
    pub fraction: f64,
}

impl ProgressEvent {
    pub fn new(page: u32, records: usize, estimated_total: Option<u64>, page_hint: u32) -> Self {
        let fraction = match estimated_total {
            Some(total) if total > 0 => records as f64 / total as f64,
            _ => f64::from(page) / f64::from(page_hint.max(1)),
        };

        Self {
            page,
            records,
            estimated_total,
            fraction: fraction.min(1.0),
        }
    }
}
