use std::collections::HashSet;
use std::sync::LazyLock;

use catalog_core::{CandidateEntry, CandidateKind, EntryId};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use stream_logging::{stream_debug, stream_warn};
use url::Url;

use crate::renderer::RenderedPage;
use crate::titles::{extract_titles, label_for};

static ABSOLUTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s"'<>()\\]+"#).expect("hardcoded regex pattern is valid")
});

const INPUT_LIKE: &str = "input, textarea, select, option, button, param";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorSettings {
    /// Substrings marking a value as a likely player endpoint.
    pub marker_tokens: Vec<String>,
    /// Domains whose URLs are always candidates.
    pub brand_domains: Vec<String>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            marker_tokens: vec!["global".into(), "streamtp".into(), ".php".into()],
            brand_domains: vec!["streamtpmedia.com".into()],
        }
    }
}

impl ExtractorSettings {
    fn has_marker(&self, value: &str) -> bool {
        let lower = value.to_ascii_lowercase();
        self.marker_tokens
            .iter()
            .any(|token| lower.contains(&token.to_ascii_lowercase()))
    }

    fn is_relevant(&self, url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        lower.contains(".m3u8")
            || self.has_marker(url)
            || self
                .brand_domains
                .iter()
                .any(|domain| lower.contains(&domain.to_ascii_lowercase()))
    }
}

/// Everything a strategy may look at.
pub struct PageSource<'a> {
    pub markup: &'a str,
    pub document: &'a Html,
    pub base_url: Option<&'a Url>,
    pub rendered_values: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    pub url: String,
    pub kind: CandidateKind,
}

impl Discovered {
    fn generic(url: String) -> Self {
        Self {
            url,
            kind: CandidateKind::Generic,
        }
    }
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, page: &PageSource<'_>) -> Vec<Discovered>;
}

/// Runs the strategy chain and pairs the result with event titles.
pub struct CandidateExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl CandidateExtractor {
    pub fn new(settings: &ExtractorSettings) -> Self {
        Self::with_strategies(vec![
            Box::new(InputValueStrategy::new(settings.clone())),
            Box::new(IframeStrategy),
            Box::new(PatternStrategy::new(settings.clone())),
            Box::new(EventHandlerStrategy),
            Box::new(RenderedValueStrategy),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Candidate URLs from every strategy, deduplicated by exact string.
    /// The first strategy to report a URL fixes its position and kind.
    pub fn discover(
        &self,
        markup: &str,
        base_url: Option<&str>,
        rendered: Option<&RenderedPage>,
    ) -> Vec<Discovered> {
        let document = Html::parse_document(markup);
        let base_url = base_url.and_then(|base| Url::parse(base).ok());
        let page = PageSource {
            markup,
            document: &document,
            base_url: base_url.as_ref(),
            rendered_values: rendered.map(|r| r.values.as_slice()).unwrap_or(&[]),
        };

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for strategy in &self.strategies {
            let before = found.len();
            for item in strategy.extract(&page) {
                if seen.insert(item.url.clone()) {
                    found.push(item);
                }
            }
            stream_debug!("Strategy {} added {} candidates", strategy.name(), found.len() - before);
        }
        found
    }

    /// Candidates labelled with the event titles found in `markup`.
    ///
    /// Titles are matched to URLs by position only. When no URL is found but
    /// titles are, one placeholder per title is returned with an empty
    /// `source_url` so callers can see the page was partly understood.
    pub fn extract(
        &self,
        markup: &str,
        base_url: Option<&str>,
        rendered: Option<&RenderedPage>,
    ) -> Vec<CandidateEntry> {
        let discovered = self.discover(markup, base_url, rendered);
        let titles = extract_titles(markup);

        if discovered.is_empty() {
            if !titles.is_empty() {
                stream_warn!("Found {} titles but no stream candidates", titles.len());
            }
            return titles
                .into_iter()
                .enumerate()
                .map(|(idx, title)| {
                    CandidateEntry::new(idx as EntryId + 1, title, "", CandidateKind::Generic)
                })
                .collect();
        }

        discovered
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                CandidateEntry::new(idx as EntryId + 1, label_for(&titles, idx), item.url, item.kind)
            })
            .collect()
    }
}

/// Values of form-like elements that carry a marker token.
pub struct InputValueStrategy {
    settings: ExtractorSettings,
}

impl InputValueStrategy {
    pub fn new(settings: ExtractorSettings) -> Self {
        Self { settings }
    }
}

impl ExtractionStrategy for InputValueStrategy {
    fn name(&self) -> &'static str {
        "input-values"
    }

    fn extract(&self, page: &PageSource<'_>) -> Vec<Discovered> {
        let Ok(selector) = Selector::parse(INPUT_LIKE) else {
            return Vec::new();
        };
        page.document
            .select(&selector)
            .flat_map(|element| element.value().attrs())
            .filter(|(name, value)| {
                !name.starts_with("on")
                    && !value.trim().contains(char::is_whitespace)
                    && self.settings.has_marker(value)
            })
            .filter_map(|(_, value)| resolve_reference(value, page.base_url))
            .map(Discovered::generic)
            .collect()
    }
}

pub struct IframeStrategy;

impl ExtractionStrategy for IframeStrategy {
    fn name(&self) -> &'static str {
        "iframes"
    }

    fn extract(&self, page: &PageSource<'_>) -> Vec<Discovered> {
        let Ok(selector) = Selector::parse("iframe") else {
            return Vec::new();
        };
        page.document
            .select(&selector)
            .flat_map(|frame| ["src", "data-src"].into_iter().filter_map(move |attr| frame.value().attr(attr)))
            .filter_map(|src| resolve_reference(src, page.base_url))
            .map(|url| Discovered {
                url,
                kind: CandidateKind::Iframe,
            })
            .collect()
    }
}

struct UrlPattern {
    name: &'static str,
    regex: Regex,
    /// Drop matches that carry no marker token, brand domain or manifest suffix.
    needs_relevance: bool,
}

/// Ordered regular expressions over the raw text.
pub struct PatternStrategy {
    settings: ExtractorSettings,
    patterns: Vec<UrlPattern>,
}

impl PatternStrategy {
    pub fn new(settings: ExtractorSettings) -> Self {
        let mut specs: Vec<(&'static str, String, bool)> = vec![(
            "query-endpoint",
            r#"https?://[^\s"'<>]+?\.php\?[^\s"'<>]+"#.to_string(),
            false,
        )];
        for domain in &settings.brand_domains {
            specs.push((
                "brand-domain",
                format!(
                    r#"(?i)https?://(?:[a-z0-9-]+\.)*{}(?:[/?#][^\s"'<>]*)?"#,
                    regex::escape(domain)
                ),
                false,
            ));
        }
        specs.extend([
            (
                "attribute",
                r#"(?i)\b(?:value|src|data-src|href)\s*=\s*["']([^"'\s<>]+)["']"#.to_string(),
                true,
            ),
            (
                "declared-variable",
                r#"\b(?:var|let|const)\s+[A-Za-z_$][\w$]*\s*=\s*["']([^"'\s]+)["']"#.to_string(),
                true,
            ),
            (
                "player-config",
                r#"(?i)\b(?:source|file|src)\s*:\s*["']([^"']+\.m3u8[^"']*)["']"#.to_string(),
                false,
            ),
            (
                "manifest",
                r#"https?://[^\s"'<>]+\.m3u8[^\s"'<>]*"#.to_string(),
                false,
            ),
        ]);

        let patterns = specs
            .into_iter()
            .filter_map(|(name, source, needs_relevance)| match Regex::new(&source) {
                Ok(regex) => Some(UrlPattern {
                    name,
                    regex,
                    needs_relevance,
                }),
                Err(err) => {
                    stream_warn!("Skipping pattern {}: {}", name, err);
                    None
                }
            })
            .collect();

        Self { settings, patterns }
    }
}

impl ExtractionStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "patterns"
    }

    fn extract(&self, page: &PageSource<'_>) -> Vec<Discovered> {
        let mut found = Vec::new();
        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(page.markup) {
                let Some(raw) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                let raw = raw.as_str().replace("&amp;", "&");
                if pattern.needs_relevance && !self.settings.is_relevant(&raw) {
                    continue;
                }
                if let Some(url) = resolve_reference(&raw, page.base_url) {
                    stream_debug!("Pattern {} matched {}", pattern.name, url);
                    found.push(Discovered::generic(url));
                }
            }
        }
        found
    }
}

/// Absolute URLs inside inline `on*` handlers.
pub struct EventHandlerStrategy;

impl ExtractionStrategy for EventHandlerStrategy {
    fn name(&self) -> &'static str {
        "event-handlers"
    }

    fn extract(&self, page: &PageSource<'_>) -> Vec<Discovered> {
        let Ok(selector) = Selector::parse("*") else {
            return Vec::new();
        };
        page.document
            .select(&selector)
            .flat_map(handler_values)
            .flat_map(|handler| {
                ABSOLUTE_URL
                    .find_iter(&handler)
                    .map(|m| m.as_str().trim_end_matches([';', ',', '.']).to_string())
                    .collect::<Vec<_>>()
            })
            .filter_map(|raw| resolve_reference(&raw, None))
            .map(Discovered::generic)
            .collect()
    }
}

fn handler_values(element: ElementRef<'_>) -> Vec<String> {
    element
        .value()
        .attrs()
        .filter(|(name, _)| name.starts_with("on"))
        .map(|(_, value)| value.to_string())
        .collect()
}

/// Values reported by an external renderer after scripts ran.
pub struct RenderedValueStrategy;

impl ExtractionStrategy for RenderedValueStrategy {
    fn name(&self) -> &'static str {
        "rendered-values"
    }

    fn extract(&self, page: &PageSource<'_>) -> Vec<Discovered> {
        page.rendered_values
            .iter()
            .filter_map(|value| resolve_reference(value, page.base_url))
            .map(Discovered::generic)
            .collect()
    }
}

/// Absolute http(s) URL for `reference`, joined onto `base` when relative.
pub(crate) fn resolve_reference(reference: &str, base: Option<&Url>) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("data:") {
        return None;
    }
    // Absolute references are kept as written; only joined ones are serialized.
    let (url, absolute) = match Url::parse(trimmed) {
        Ok(url) => (url, true),
        Err(url::ParseError::RelativeUrlWithoutBase) => (base?.join(trimmed).ok()?, false),
        Err(_) => return None,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    Some(if absolute { trimmed.to_string() } else { url.to_string() })
}
