use std::sync::{Arc, LazyLock};
use std::time::Duration;

use catalog_core::{CandidateEntry, RequestHeaders, ResolvedEntry, StreamStatus};
use chrono::Utc;
use regex::Regex;
use stream_logging::{stream_debug, stream_info};
use url::Url;

use crate::batch::CandidateResolver;
use crate::fetch::{FetchHeaders, Fetcher};
use crate::obfuscation::ObfuscationDecoder;
use crate::renderer::Renderer;
use crate::resolve::{looks_like_stream, HttpResolver};
use crate::{EngineContext, FetchError};

/// Where player pages usually spell out their manifest, most specific last.
static MANIFEST_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)(https?://[^\s"'>]+\.m3u8[^\s"'>]*)"#,
        r#"(?i)source:\s*["']([^"']+\.m3u8[^"']*)["']"#,
        r#"(?i)file:\s*["']([^"']+\.m3u8[^"']*)["']"#,
        r#"(?i)src:\s*["']([^"']+\.m3u8[^"']*)["']"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("hardcoded regex pattern is valid"))
    .collect()
});

/// Origin (`scheme://host[:port]`) of `url`, or an empty string.
pub(crate) fn origin_of(url: &str) -> String {
    Url::parse(url)
        .map(|parsed| parsed.origin().ascii_serialization())
        .ok()
        .filter(|origin| origin != "null")
        .unwrap_or_default()
}

/// Finds the manifest URL behind an embedded player page.
pub struct EmbedInspector {
    fetcher: Arc<dyn Fetcher>,
    decoder: ObfuscationDecoder,
    renderer: Option<Arc<dyn Renderer>>,
}

impl EmbedInspector {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            decoder: ObfuscationDecoder::new(),
            renderer: None,
        }
    }

    pub fn with_decoder(mut self, decoder: ObfuscationDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Manifest URL in the static markup of `embed_url`, falling back to the
    /// renderer when one is configured. `Ok(None)` means the page loaded but
    /// nothing was found.
    pub async fn find_manifest(&self, embed_url: &str, page_url: &str) -> Result<Option<String>, FetchError> {
        let headers = FetchHeaders {
            referer: Some(page_url.to_string()),
            origin: Some(origin_of(page_url)).filter(|origin| !origin.is_empty()),
        };
        let page = self.fetcher.fetch_text(embed_url, &headers).await?;
        if let Some(found) = self.scan(&page.text, embed_url) {
            return Ok(Some(found));
        }

        let Some(renderer) = self.renderer.as_ref() else {
            return Ok(None);
        };
        let Some(rendered) = renderer.render(embed_url).await else {
            return Ok(None);
        };
        let from_values = rendered
            .values
            .iter()
            .filter_map(|value| absolutize(value.trim(), embed_url))
            .find(|value| value.to_ascii_lowercase().contains(".m3u8"));
        Ok(from_values.or_else(|| self.scan(&rendered.markup, embed_url)))
    }

    /// Decoder first, then the plain-text patterns.
    pub fn scan(&self, markup: &str, embed_url: &str) -> Option<String> {
        if let Some(decoded) = self.decoder.decode(markup) {
            stream_debug!("Decoded obfuscated manifest in {}", embed_url);
            return Some(decoded);
        }
        MANIFEST_PATTERNS.iter().find_map(|pattern| {
            let raw = pattern.captures(markup)?.get(1)?.as_str().replace("&amp;", "&");
            absolutize(&raw, embed_url)
        })
    }
}

fn absolutize(reference: &str, base: &str) -> Option<String> {
    let base = Url::parse(base).ok();
    crate::extract::resolve_reference(reference, base.as_ref())
}

/// Page-form check: inspect the embed page, then probe the manifest with the
/// headers a player would send from inside that embed.
pub struct EmbedResolver {
    inspector: EmbedInspector,
    resolver: HttpResolver,
    timeout: Duration,
    user_agent: String,
    page_url: String,
}

impl EmbedResolver {
    pub fn new(ctx: &EngineContext, inspector: EmbedInspector, page_url: impl Into<String>) -> Self {
        Self {
            inspector,
            resolver: HttpResolver::new(ctx),
            timeout: ctx.config.request_timeout,
            user_agent: ctx.config.user_agent.clone(),
            page_url: page_url.into(),
        }
    }

    fn headers_from(&self, referer: &str) -> RequestHeaders {
        RequestHeaders {
            user_agent: self.user_agent.clone(),
            referer: referer.to_string(),
            origin: origin_of(referer),
        }
    }

    async fn probe(&self, candidate: &CandidateEntry, manifest: &str, headers: RequestHeaders) -> ResolvedEntry {
        let extra = FetchHeaders {
            referer: Some(headers.referer.clone()),
            origin: Some(headers.origin.clone()).filter(|origin| !origin.is_empty()),
        };
        let (url, status) = self.resolver.resolve_with(manifest, self.timeout, &extra).await;
        ResolvedEntry::new(candidate.clone(), url, status, Utc::now()).with_request_headers(headers)
    }

    async fn check(&self, candidate: &CandidateEntry) -> ResolvedEntry {
        let page_headers = self.headers_from(&self.page_url);
        if !candidate.has_source() {
            return ResolvedEntry::unresolved(candidate.clone(), StreamStatus::NoStreamFound, Utc::now())
                .with_request_headers(page_headers);
        }

        let source = candidate.source_url.as_str();
        if Url::parse(source).map(|url| looks_like_stream(&url)).unwrap_or(false) {
            return self.probe(candidate, source, page_headers).await;
        }

        match self.inspector.find_manifest(source, &self.page_url).await {
            Ok(Some(manifest)) => {
                stream_info!("Found manifest for {}: {}", candidate.label, manifest);
                let headers = self.headers_from(source);
                self.probe(candidate, &manifest, headers).await
            }
            Ok(None) => ResolvedEntry::unresolved(candidate.clone(), StreamStatus::NoStreamFound, Utc::now())
                .with_request_headers(page_headers),
            Err(err) => {
                stream_debug!("Embed {} not fetched: {}", source, err);
                ResolvedEntry::unresolved(candidate.clone(), err.to_status(), Utc::now())
                    .with_request_headers(page_headers)
            }
        }
    }
}

#[async_trait::async_trait]
impl CandidateResolver for EmbedResolver {
    async fn resolve(&self, candidate: &CandidateEntry) -> ResolvedEntry {
        self.check(candidate).await.with_source_page(self.page_url.as_str())
    }
}
