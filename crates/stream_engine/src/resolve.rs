use std::time::Duration;

use catalog_core::{CandidateEntry, ResolvedEntry, StreamStatus};
use chrono::Utc;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN, REFERER};
use stream_logging::{stream_debug, stream_warn};
use url::Url;

use crate::batch::CandidateResolver;
use crate::fetch::FetchHeaders;
use crate::types::map_reqwest_error;
use crate::EngineContext;

const MANIFEST_MARKERS: [&[u8]; 2] = [b"#EXTM3U", b"#EXT-X-"];

/// Follows redirects with a HEAD probe, then classifies the final URL with a
/// streamed GET. Holds no state besides its (shared) client.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
    gated_hosts: Vec<String>,
    first_chunk_bytes: usize,
}

impl HttpResolver {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            client: ctx.client.clone(),
            gated_hosts: ctx.config.gated_hosts.clone(),
            first_chunk_bytes: ctx.config.first_chunk_bytes.max(1),
        }
    }

    pub async fn resolve(&self, url: &str, timeout: Duration) -> (String, StreamStatus) {
        self.resolve_with(url, timeout, &FetchHeaders::default()).await
    }

    /// Like [`resolve`](Self::resolve), sending `extra` on top of the
    /// per-host header rules. Returns the URL after redirects (or `url`
    /// itself when the probe failed) and its status.
    pub async fn resolve_with(
        &self,
        url: &str,
        timeout: Duration,
        extra: &FetchHeaders,
    ) -> (String, StreamStatus) {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(err) => return (url.to_string(), StreamStatus::message(err.to_string())),
        };
        let headers = self.request_headers(&parsed, extra);

        let probe = self
            .client
            .head(parsed)
            .headers(headers.clone())
            .timeout(timeout)
            .send()
            .await;
        let final_url = match probe {
            Ok(response) => response.url().clone(),
            Err(err) => {
                let err = map_reqwest_error(err);
                stream_debug!("Probe of {} failed: {}", url, err);
                return (url.to_string(), err.to_status());
            }
        };

        if !looks_like_stream(&final_url) {
            return (final_url.to_string(), StreamStatus::InvalidFormat);
        }

        let status = self.classify(final_url.clone(), headers, timeout).await;
        (final_url.to_string(), status)
    }

    async fn classify(&self, url: Url, headers: HeaderMap, timeout: Duration) -> StreamStatus {
        let response = match self.client.get(url).headers(headers).timeout(timeout).send().await {
            Ok(response) => response,
            Err(err) => return map_reqwest_error(err).to_status(),
        };

        let status = response.status();
        if !status.is_success() {
            return StreamStatus::http_status(status.as_u16());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if content_type.contains("mpegurl") || content_type.contains("m3u8") {
            return StreamStatus::Working;
        }
        // A definite length is taken as evidence of a real media resource.
        if response.headers().contains_key(CONTENT_LENGTH) {
            return StreamStatus::Working;
        }

        let mut head = Vec::with_capacity(self.first_chunk_bytes);
        let mut body = response.bytes_stream();
        while head.len() < self.first_chunk_bytes {
            match body.next().await {
                Some(Ok(chunk)) => head.extend_from_slice(&chunk),
                Some(Err(err)) if err.is_timeout() => return StreamStatus::Timeout,
                Some(Err(err)) => {
                    stream_warn!("Reading first chunk failed: {}", err);
                    return StreamStatus::Unknown;
                }
                None => break,
            }
        }
        head.truncate(self.first_chunk_bytes);

        if contains_manifest_marker(&head) {
            StreamStatus::Working
        } else {
            StreamStatus::Unknown
        }
    }

    fn request_headers(&self, url: &Url, extra: &FetchHeaders) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if self.is_gated(url) {
            let origin = url.origin().ascii_serialization();
            insert_header(&mut headers, REFERER, &format!("{origin}/"));
            insert_header(&mut headers, ORIGIN, &origin);
        }
        if let Some(referer) = extra.referer.as_deref() {
            insert_header(&mut headers, REFERER, referer);
        }
        if let Some(origin) = extra.origin.as_deref() {
            insert_header(&mut headers, ORIGIN, origin);
        }
        headers
    }

    fn is_gated(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        self.gated_hosts
            .iter()
            .any(|gated| host == gated || host.ends_with(&format!(".{gated}")))
    }
}

fn insert_header(headers: &mut HeaderMap, name: reqwest::header::HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(err) => stream_warn!("Dropping header {}: {}", name, err),
    }
}

/// Manifest or segment URL, or a path under a streaming prefix.
pub fn looks_like_stream(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    let query = url.query().unwrap_or("").to_ascii_lowercase();
    path.ends_with(".ts")
        || path.contains(".m3u8")
        || path.contains("/hls/")
        || path.contains("/live/")
        || query.contains(".m3u8")
}

pub fn contains_manifest_marker(bytes: &[u8]) -> bool {
    MANIFEST_MARKERS
        .iter()
        .any(|marker| bytes.windows(marker.len()).any(|window| window == *marker))
}

/// Checks the candidate's own URL; used for playlist channels.
#[derive(Debug, Clone)]
pub struct StreamProbe {
    resolver: HttpResolver,
    timeout: Duration,
}

impl StreamProbe {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            resolver: HttpResolver::new(ctx),
            timeout: ctx.config.request_timeout,
        }
    }
}

#[async_trait::async_trait]
impl CandidateResolver for StreamProbe {
    async fn resolve(&self, candidate: &CandidateEntry) -> ResolvedEntry {
        if !candidate.has_source() {
            return ResolvedEntry::unresolved(candidate.clone(), StreamStatus::NoStreamFound, Utc::now());
        }
        let (url, status) = self.resolver.resolve(&candidate.source_url, self.timeout).await;
        ResolvedEntry::new(candidate.clone(), url, status, Utc::now())
    }
}
