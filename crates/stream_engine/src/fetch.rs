use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, ORIGIN, REFERER};
use stream_logging::stream_debug;

use crate::charset::{decode_body, DecodedText};
use crate::types::map_reqwest_error;
use crate::{EngineContext, FailureKind, FetchError, FetchMetadata, FetchOutput};

/// Extra request headers for pages that check where the request comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchHeaders {
    pub referer: Option<String>,
    pub origin: Option<String>,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: &FetchHeaders) -> Result<FetchOutput, FetchError>;

    /// Fetches and decodes the body to UTF-8 text.
    async fn fetch_text(&self, url: &str, headers: &FetchHeaders) -> Result<DecodedText, FetchError> {
        let output = self.fetch(url, headers).await?;
        Ok(decode_body(&output.bytes, output.metadata.content_type.as_deref()))
    }
}

/// Downloads playlists and pages with a size cap; any content type is accepted.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl ReqwestFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration, max_bytes: u64) -> Self {
        Self {
            client,
            timeout,
            max_bytes,
        }
    }

    /// Fetcher for root sources (playlists, event pages).
    pub fn for_root(ctx: &EngineContext) -> Self {
        Self::new(ctx.client.clone(), ctx.config.root_timeout, ctx.config.max_root_bytes)
    }

    /// Fetcher for embedded player pages, bounded like any other check.
    pub fn for_embeds(ctx: &EngineContext) -> Self {
        Self::new(ctx.client.clone(), ctx.config.request_timeout, ctx.config.max_root_bytes)
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, headers: &FetchHeaders) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let mut request = self.client.get(parsed).timeout(self.timeout);
        if let Some(referer) = headers.referer.as_deref() {
            request = request.header(REFERER, referer);
        }
        if let Some(origin) = headers.origin.as_deref() {
            request = request.header(ORIGIN, origin);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        stream_debug!("Fetched {} ({} bytes) from {}", final_url, bytes.len(), url);

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            content_type,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput { bytes, metadata })
    }
}
