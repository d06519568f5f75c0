use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum number of characters kept from a free-form error message.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 50;

/// Reachability classification of one entry.
///
/// Rendered as a stable string (`working`, `error_404`, ...) through
/// `Display`, and serialized as that same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum StreamStatus {
    Working,
    Unknown,
    InvalidFormat,
    Timeout,
    ConnectionError,
    Error(ErrorDetail),
    NoStreamFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorDetail {
    HttpStatus(u16),
    Message(String),
}

impl StreamStatus {
    pub fn http_status(code: u16) -> Self {
        StreamStatus::Error(ErrorDetail::HttpStatus(code))
    }

    /// Free-form error, truncated to [`MAX_ERROR_MESSAGE_CHARS`].
    pub fn message(message: impl AsRef<str>) -> Self {
        StreamStatus::Error(ErrorDetail::Message(truncate_chars(
            message.as_ref(),
            MAX_ERROR_MESSAGE_CHARS,
        )))
    }

    pub fn is_working(&self) -> bool {
        matches!(self, StreamStatus::Working)
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Working => write!(f, "working"),
            StreamStatus::Unknown => write!(f, "unknown"),
            StreamStatus::InvalidFormat => write!(f, "invalid_format"),
            StreamStatus::Timeout => write!(f, "timeout"),
            StreamStatus::ConnectionError => write!(f, "connection_error"),
            StreamStatus::Error(ErrorDetail::HttpStatus(code)) => write!(f, "error_{code}"),
            StreamStatus::Error(ErrorDetail::Message(message)) => write!(f, "error_{message}"),
            StreamStatus::NoStreamFound => write!(f, "no_stream_url_found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized status {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for StreamStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "working" => StreamStatus::Working,
            "unknown" => StreamStatus::Unknown,
            "invalid_format" => StreamStatus::InvalidFormat,
            "timeout" => StreamStatus::Timeout,
            "connection_error" => StreamStatus::ConnectionError,
            "no_stream_url_found" => StreamStatus::NoStreamFound,
            other => {
                let detail = other
                    .strip_prefix("error_")
                    .ok_or_else(|| UnknownStatus(other.to_string()))?;
                // Three-digit numbers are HTTP codes; anything else is a message.
                match detail.parse::<u16>() {
                    Ok(code) if detail.len() == 3 => StreamStatus::http_status(code),
                    _ => StreamStatus::Error(ErrorDetail::Message(detail.to_string())),
                }
            }
        };
        Ok(status)
    }
}

impl From<StreamStatus> for String {
    fn from(status: StreamStatus) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for StreamStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, UnknownStatus> {
        value.parse()
    }
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => input[..idx].to_string(),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_stable_vocabulary() {
        assert_eq!(StreamStatus::Working.to_string(), "working");
        assert_eq!(StreamStatus::Unknown.to_string(), "unknown");
        assert_eq!(StreamStatus::InvalidFormat.to_string(), "invalid_format");
        assert_eq!(StreamStatus::Timeout.to_string(), "timeout");
        assert_eq!(StreamStatus::ConnectionError.to_string(), "connection_error");
        assert_eq!(StreamStatus::http_status(404).to_string(), "error_404");
        assert_eq!(StreamStatus::NoStreamFound.to_string(), "no_stream_url_found");
    }

    #[test]
    fn messages_are_truncated_on_char_boundary() {
        let long = "é".repeat(80);
        let status = StreamStatus::message(&long);
        match status {
            StreamStatus::Error(ErrorDetail::Message(msg)) => {
                assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_CHARS)
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn parses_rendered_strings_back() {
        for status in [
            StreamStatus::Working,
            StreamStatus::InvalidFormat,
            StreamStatus::http_status(503),
            StreamStatus::message("too many redirects"),
            StreamStatus::NoStreamFound,
        ] {
            assert_eq!(status.to_string().parse::<StreamStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<StreamStatus>().is_err());
    }
}
