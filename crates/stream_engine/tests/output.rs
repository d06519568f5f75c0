use std::fs;

use catalog_core::{CandidateEntry, CandidateKind, Catalog, RequestHeaders, ResolvedEntry, StreamStatus};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use stream_engine::{catalog_to_json, ensure_output_dir, write_atomic, write_catalog, CatalogForm};
use tempfile::TempDir;

fn channel(id: u64, name: &str, url: &str, status: StreamStatus) -> ResolvedEntry {
    let candidate = CandidateEntry {
        group: Some("Sports".to_string()),
        logo: "https://img.example/logo.png".to_string(),
        duration: Some(-1),
        attributes: "tvg-logo=\"https://img.example/logo.png\" group-title=\"Sports\"".to_string(),
        ..CandidateEntry::new(id, name, url, CandidateKind::Playlist)
    };
    let checked = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();
    ResolvedEntry::new(candidate, url, status, checked)
}

fn generated() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 31, 0).unwrap()
}

#[test]
fn playlist_form_lists_channels() {
    let catalog = Catalog::assemble(
        vec![
            channel(1, "ESPN", "https://cdn.example/hls/espn.m3u8", StreamStatus::Working),
            channel(2, "Fox", "https://cdn.example/hls/fox.m3u8", StreamStatus::http_status(404)),
        ],
        generated(),
    );

    let document = catalog_to_json(&catalog, CatalogForm::Playlist);
    assert_eq!(
        document,
        json!({
            "last_updated": "2024-05-01T12:31:00Z",
            "total_channels": 2,
            "working_channels": 1,
            "channels": [
                {
                    "name": "ESPN",
                    "original_url": "https://cdn.example/hls/espn.m3u8",
                    "stream_url": "https://cdn.example/hls/espn.m3u8",
                    "logo": "https://img.example/logo.png",
                    "group": "Sports",
                    "status": "working",
                    "last_checked": "2024-05-01T12:30:05Z",
                    "duration": -1,
                    "attributes": "tvg-logo=\"https://img.example/logo.png\" group-title=\"Sports\"",
                },
                {
                    "name": "Fox",
                    "original_url": "https://cdn.example/hls/fox.m3u8",
                    "stream_url": "https://cdn.example/hls/fox.m3u8",
                    "logo": "https://img.example/logo.png",
                    "group": "Sports",
                    "status": "error_404",
                    "last_checked": "2024-05-01T12:30:05Z",
                    "duration": -1,
                    "attributes": "tvg-logo=\"https://img.example/logo.png\" group-title=\"Sports\"",
                },
            ],
        })
    );
}

#[test]
fn page_form_carries_player_headers() {
    let candidate = CandidateEntry::new(3, "18:00 - Boca vs River", "https://embed.example/p/3", CandidateKind::Iframe);
    let entry = ResolvedEntry::new(
        candidate,
        "https://cdn.example/hls/boca.m3u8",
        StreamStatus::Working,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
    .with_request_headers(RequestHeaders {
        user_agent: "TestAgent/1.0".to_string(),
        referer: "https://embed.example/p/3".to_string(),
        origin: "https://embed.example".to_string(),
    })
    .with_source_page("https://events.example/schedule");
    let catalog = Catalog::assemble(vec![entry], generated());

    let document = catalog_to_json(&catalog, CatalogForm::Page);
    assert_eq!(
        document,
        json!({
            "last_updated": "2024-05-01T12:31:00Z",
            "total_events": 1,
            "events": [{
                "id": "event_3",
                "title": "18:00 - Boca vs River",
                "iframe_url": "https://embed.example/p/3",
                "m3u8_url": "https://cdn.example/hls/boca.m3u8",
                "logo": "",
                "status": "working",
                "timestamp": "2024-05-01T12:00:00Z",
                "referer": "https://events.example/schedule",
                "headers": {
                    "User-Agent": "TestAgent/1.0",
                    "Referer": "https://embed.example/p/3",
                    "Origin": "https://embed.example",
                },
            }],
        })
    );
}

#[test]
fn empty_catalog_keeps_the_envelope() {
    let document = catalog_to_json(&Catalog::empty(generated()), CatalogForm::Playlist);
    assert_eq!(document["total_channels"], json!(0));
    assert_eq!(document["working_channels"], json!(0));
    assert_eq!(document["channels"], json!([]));
}

#[test]
fn write_catalog_creates_parent_and_keeps_utf8() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("out").join("streams.json");
    let catalog = Catalog::assemble(
        vec![channel(1, "Telemundo Señal", "https://cdn.example/hls/t.m3u8", StreamStatus::Working)],
        generated(),
    );

    let written = write_catalog(&target, &catalog, CatalogForm::Playlist).unwrap();
    assert_eq!(written, target);

    let content = fs::read_to_string(&target).unwrap();
    assert!(content.contains("\"name\": \"Telemundo Señal\""));
    assert!(content.starts_with("{\n  \""));
    let parsed: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed, catalog_to_json(&catalog, CatalogForm::Playlist));
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("events.json");

    write_atomic(&target, "first").unwrap();
    write_atomic(&target, "second").unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "second");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn output_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();

    assert!(ensure_output_dir(&blocker).is_err());
    assert!(write_atomic(&blocker.join("streams.json"), "data").is_err());
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");
}
