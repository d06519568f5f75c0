use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA};
use stream_logging::{stream_debug, stream_info};

use crate::extract::ExtractorSettings;
use crate::types::{FailureKind, FetchError, RunEvent};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Hosts that reject requests without same-origin looking headers.
pub const DEFAULT_GATED_HOSTS: &[&str] = &["tvpass.org", "thetvapp.to"];

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of concurrent batch workers.
    pub workers: usize,
    /// Timeout applied to every single network request while checking a candidate.
    pub request_timeout: Duration,
    /// Ceiling for checking one candidate, across all of its requests.
    pub item_timeout: Duration,
    /// Timeout for fetching the root playlist or page.
    pub root_timeout: Duration,
    /// Pause between consecutive checks inside one batch.
    pub polite_delay: Duration,
    pub redirect_limit: usize,
    pub max_root_bytes: u64,
    /// Bytes sniffed from a body that declares neither a manifest type nor a length.
    pub first_chunk_bytes: usize,
    pub user_agent: String,
    pub gated_hosts: Vec<String>,
    pub accept_invalid_certs: bool,
    /// Variable holding the obfuscated manifest pairs in player pages.
    /// `None` accepts the first array of pairs found.
    pub obfuscated_array: Option<String>,
    pub extractor: ExtractorSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            request_timeout: Duration::from_secs(15),
            item_timeout: Duration::from_secs(60),
            root_timeout: Duration::from_secs(30),
            polite_delay: Duration::from_millis(500),
            redirect_limit: 5,
            max_root_bytes: 10 * 1024 * 1024,
            first_chunk_bytes: 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            gated_hosts: DEFAULT_GATED_HOSTS.iter().map(|h| h.to_string()).collect(),
            accept_invalid_certs: true,
            obfuscated_array: None,
            extractor: ExtractorSettings::default(),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

/// Forwards run events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: RunEvent) {
        match event {
            RunEvent::BatchStarted { batch, size } => {
                stream_debug!("Batch {} started with {} candidates", batch, size)
            }
            RunEvent::EntryChecked {
                batch,
                id,
                label,
                status,
            } => stream_info!("Checked [{}] #{} {}: {}", batch, id, label, status),
            RunEvent::BatchCompleted { batch, resolved } => {
                stream_info!("Completed batch {}: {} entries", batch, resolved)
            }
        }
    }
}

/// Everything a worker needs: settings, a shared HTTP client and the
/// progress sink. Cloning is cheap and every worker gets its own clone.
#[derive(Clone)]
pub struct EngineContext {
    pub config: EngineConfig,
    pub client: reqwest::Client,
    pub sink: Arc<dyn ProgressSink>,
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Result<Self, FetchError> {
        let client = build_client(&config)?;
        Ok(Self {
            config,
            client,
            sink: Arc::new(LogProgressSink),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub(crate) fn emit(&self, event: RunEvent) {
        self.sink.emit(event);
    }
}

fn build_client(config: &EngineConfig) -> Result<reqwest::Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

    stream_debug!(
        "Building HTTP client redirect_limit={} accept_invalid_certs={}",
        config.redirect_limit,
        config.accept_invalid_certs
    );

    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .connect_timeout(config.request_timeout)
        .redirect(reqwest::redirect::Policy::limited(config.redirect_limit))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}
