use std::path::{Path, PathBuf};

use catalog_core::{Catalog, ResolvedEntry, DEFAULT_GROUP};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use stream_logging::stream_info;
use url::Url;

use crate::persist::{write_atomic, PersistError};
use crate::resolve::looks_like_stream;

/// Shape of the written document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogForm {
    /// `channels[]`, one per playlist line.
    Playlist,
    /// `events[]`, one per embedded player found on a page.
    Page,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn catalog_to_json(catalog: &Catalog, form: CatalogForm) -> Value {
    let last_updated = timestamp(catalog.generated_at());
    match form {
        CatalogForm::Playlist => json!({
            "last_updated": last_updated,
            "total_channels": catalog.total(),
            "working_channels": catalog.working(),
            "channels": catalog.entries().iter().map(channel_json).collect::<Vec<_>>(),
        }),
        CatalogForm::Page => json!({
            "last_updated": last_updated,
            "total_events": catalog.total(),
            "events": catalog.entries().iter().map(event_json).collect::<Vec<_>>(),
        }),
    }
}

fn channel_json(entry: &ResolvedEntry) -> Value {
    let candidate = &entry.candidate;
    json!({
        "name": candidate.label,
        "original_url": candidate.source_url,
        "stream_url": entry.resolved_url,
        "logo": candidate.logo,
        "group": candidate.group.as_deref().unwrap_or(DEFAULT_GROUP),
        "status": entry.status.to_string(),
        "last_checked": timestamp(entry.checked_at),
        "duration": candidate.duration,
        "attributes": candidate.attributes,
    })
}

fn event_json(entry: &ResolvedEntry) -> Value {
    let candidate = &entry.candidate;
    let (user_agent, referer, origin) = match entry.request_headers.as_ref() {
        Some(headers) => (
            headers.user_agent.as_str(),
            headers.referer.as_str(),
            headers.origin.as_str(),
        ),
        None => ("", "", ""),
    };
    let page = entry.source_page.as_deref().unwrap_or(referer);
    json!({
        "id": format!("event_{}", candidate.id),
        "title": candidate.label,
        "iframe_url": candidate.source_url,
        "m3u8_url": manifest_url(entry),
        "logo": candidate.logo,
        "status": entry.status.to_string(),
        "timestamp": timestamp(entry.checked_at),
        "referer": page,
        "headers": {
            "User-Agent": user_agent,
            "Referer": referer,
            "Origin": origin,
        },
    })
}

/// The resolved URL when it is a stream, empty otherwise.
fn manifest_url(entry: &ResolvedEntry) -> &str {
    match Url::parse(&entry.resolved_url) {
        Ok(url) if looks_like_stream(&url) => &entry.resolved_url,
        _ => "",
    }
}

/// Writes the catalog as pretty JSON (two-space indent, UTF-8 kept as is).
pub fn write_catalog(path: &Path, catalog: &Catalog, form: CatalogForm) -> Result<PathBuf, ExportError> {
    let mut content = serde_json::to_string_pretty(&catalog_to_json(catalog, form))?;
    content.push('\n');
    let written = write_atomic(path, &content)?;
    stream_info!("Saved {} entries to {}", catalog.total(), written.display());
    Ok(written)
}
