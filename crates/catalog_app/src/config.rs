use std::path::PathBuf;
use std::time::Duration;

use stream_engine::{CatalogForm, EngineConfig};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Playlist,
    Page,
}

impl SourceKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "playlist" | "m3u" => Some(Self::Playlist),
            "page" | "events" => Some(Self::Page),
            _ => None,
        }
    }

    fn default_output(self) -> &'static str {
        match self {
            Self::Playlist => "streams.json",
            Self::Page => "events.json",
        }
    }

    pub fn form(self) -> CatalogForm {
        match self {
            Self::Playlist => CatalogForm::Playlist,
            Self::Page => CatalogForm::Page,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name}={value:?} is invalid: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Run settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub source_url: String,
    pub kind: SourceKind,
    pub output_file: PathBuf,
    pub workers: usize,
    pub request_timeout: Duration,
    pub polite_delay: Duration,
    /// `None` keeps the engine's built-in list.
    pub gated_hosts: Option<Vec<String>>,
    /// Variable name of the obfuscated manifest array in player pages.
    pub obfuscated_array: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

        let source_url = get("SOURCE_URL").ok_or(ConfigError::Missing("SOURCE_URL"))?;
        match Url::parse(&source_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("SOURCE_URL", &source_url, "expected an http(s) url")),
            Err(err) => return Err(invalid("SOURCE_URL", &source_url, err)),
        }

        let kind = match get("SOURCE_KIND") {
            Some(raw) => SourceKind::parse(&raw)
                .ok_or_else(|| invalid("SOURCE_KIND", &raw, "expected `playlist` or `page`"))?,
            None => SourceKind::Playlist,
        };

        let output_file = get("OUTPUT_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(kind.default_output()));

        let workers = parse_number(get("MAX_WORKERS"), "MAX_WORKERS", 3)?;
        if workers == 0 {
            return Err(invalid("MAX_WORKERS", "0", "at least one worker is required"));
        }
        let timeout_secs = parse_number(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 15)?;
        if timeout_secs == 0 {
            return Err(invalid("REQUEST_TIMEOUT_SECS", "0", "timeout must be positive"));
        }
        let delay_ms = parse_number(get("REQUEST_DELAY_MS"), "REQUEST_DELAY_MS", 500)?;

        let gated_hosts = get("GATED_HOSTS").map(|raw| {
            raw.split(',')
                .map(|host| host.trim().to_ascii_lowercase())
                .filter(|host| !host.is_empty())
                .collect()
        });

        Ok(Self {
            source_url,
            kind,
            output_file,
            workers: workers as usize,
            request_timeout: Duration::from_secs(timeout_secs),
            polite_delay: Duration::from_millis(delay_ms),
            gated_hosts,
            obfuscated_array: get("OBFUSCATED_ARRAY"),
            log_file: get("LOG_FILE").map(PathBuf::from),
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig {
            workers: self.workers,
            request_timeout: self.request_timeout,
            polite_delay: self.polite_delay,
            obfuscated_array: self.obfuscated_array.clone(),
            ..EngineConfig::default()
        };
        // Leave room for the HEAD probe, the GET and an embed fetch.
        config.item_timeout = config.item_timeout.max(self.request_timeout * 4);
        if let Some(hosts) = &self.gated_hosts {
            config.gated_hosts = hosts.clone();
        }
        config
    }
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number(raw: Option<String>, name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match raw {
        Some(raw) => raw.parse::<u64>().map_err(|err| invalid(name, &raw, err)),
        None => Ok(default),
    }
}
