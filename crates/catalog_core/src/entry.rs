use chrono::{DateTime, Utc};

use crate::StreamStatus;

pub type EntryId = u64;

pub const DEFAULT_GROUP: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    /// Channel line from a playlist file.
    Playlist,
    /// Embedded player page found in an `<iframe>`.
    Iframe,
    /// Any other URL discovered in page markup.
    Generic,
}

/// A reference discovered by parsing or extraction, not yet checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    pub id: EntryId,
    pub label: String,
    /// Raw, pre-resolution reference. Empty for title-only placeholders.
    pub source_url: String,
    pub kind: CandidateKind,
    pub group: Option<String>,
    pub logo: String,
    pub duration: Option<i64>,
    pub attributes: String,
}

impl CandidateEntry {
    pub fn new(
        id: EntryId,
        label: impl Into<String>,
        source_url: impl Into<String>,
        kind: CandidateKind,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            source_url: source_url.into(),
            kind,
            group: None,
            logo: String::new(),
            duration: None,
            attributes: String::new(),
        }
    }

    pub fn group_or_empty(&self) -> &str {
        self.group.as_deref().unwrap_or("")
    }

    pub fn has_source(&self) -> bool {
        !self.source_url.trim().is_empty()
    }
}

/// Headers a player has to send when requesting the resolved stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    pub user_agent: String,
    pub referer: String,
    pub origin: String,
}

/// Outcome of checking one candidate. A re-check produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub candidate: CandidateEntry,
    pub resolved_url: String,
    pub status: StreamStatus,
    pub checked_at: DateTime<Utc>,
    pub request_headers: Option<RequestHeaders>,
    /// Page the candidate was discovered on, for page-form runs.
    pub source_page: Option<String>,
}

impl ResolvedEntry {
    pub fn new(
        candidate: CandidateEntry,
        resolved_url: impl Into<String>,
        status: StreamStatus,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            candidate,
            resolved_url: resolved_url.into(),
            status,
            checked_at,
            request_headers: None,
            source_page: None,
        }
    }

    /// Resolution failed before any redirect was seen: the URL stays as given.
    pub fn unresolved(candidate: CandidateEntry, status: StreamStatus, checked_at: DateTime<Utc>) -> Self {
        let url = candidate.source_url.clone();
        Self::new(candidate, url, status, checked_at)
    }

    pub fn with_request_headers(mut self, headers: RequestHeaders) -> Self {
        self.request_headers = Some(headers);
        self
    }

    pub fn with_source_page(mut self, page_url: impl Into<String>) -> Self {
        self.source_page = Some(page_url.into());
        self
    }

    pub fn is_working(&self) -> bool {
        self.status.is_working()
    }
}
