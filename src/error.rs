use reqwest::StatusCode;
use thiserror::Error;

/// Coarse classification of a fetch failure, for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input; no request was sent
    InvalidInput,
    /// Connection error, timeout or non-2xx status
    Transport,
    /// The API answered but refused the request
    Rejected,
}

/// Errors that end a fetch session
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("review API returned HTTP {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("review API rejected the request: {body}")]
    Rejected { body: String },

    #[error("failed to parse review API response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidInput(_) => ErrorKind::InvalidInput,
            FetchError::Transport(_) | FetchError::HttpStatus { .. } => ErrorKind::Transport,
            FetchError::Rejected { .. } | FetchError::Decode { .. } => ErrorKind::Rejected,
        }
    }

    /// Raw response body, when the failure carried one
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            FetchError::HttpStatus { body, .. }
            | FetchError::Rejected { body }
            | FetchError::Decode { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Errors from serializing reviews to CSV
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV buffer: {0}")]
    Flush(String),
}

/// Errors from the combined fetch-then-export operation
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
