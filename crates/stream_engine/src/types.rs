use std::fmt;

use catalog_core::{Catalog, EntryId, StreamStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Status stored on an entry whose check failed with this error.
    pub fn to_status(&self) -> StreamStatus {
        match &self.kind {
            FailureKind::Timeout => StreamStatus::Timeout,
            FailureKind::Connection => StreamStatus::ConnectionError,
            FailureKind::HttpStatus(code) => StreamStatus::http_status(*code),
            FailureKind::FormatMismatch => StreamStatus::InvalidFormat,
            FailureKind::DecodeFailure | FailureKind::ExtractionEmpty => StreamStatus::NoStreamFound,
            FailureKind::InvalidUrl
            | FailureKind::RedirectLimitExceeded
            | FailureKind::TooLarge { .. }
            | FailureKind::Network => StreamStatus::message(&self.message),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Connection,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    /// Resolved URL does not look like a stream.
    FormatMismatch,
    /// Obfuscated markup was absent or malformed.
    DecodeFailure,
    /// Extraction found neither candidates nor titles.
    ExtractionEmpty,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Connection => write!(f, "connection failure"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::FormatMismatch => write!(f, "not a stream url"),
            FailureKind::DecodeFailure => write!(f, "obfuscated source not decodable"),
            FailureKind::ExtractionEmpty => write!(f, "no candidates found"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    BatchStarted {
        batch: usize,
        size: usize,
    },
    EntryChecked {
        batch: usize,
        id: EntryId,
        label: String,
        status: StreamStatus,
    },
    BatchCompleted {
        batch: usize,
        resolved: usize,
    },
}

/// Result of a whole run. `failure` is set when the run short-circuited to
/// an empty catalog; the caller decides whether that is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub catalog: Catalog,
    pub failure: Option<FetchError>,
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, "too many redirects");
    }
    if err.is_connect() {
        return FetchError::new(FailureKind::Connection, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
