//! Decoder for the "sorted base64 char codes" scheme some player pages use
//! to hide their manifest URL:
//!
//! ```text
//! var parts = [[3,"MTE2Mjk="],[1,"MTE2MTc="],...];
//! function a(){ return 11000; }
//! function b(){ return 500; }
//! ```
//!
//! Each chunk decodes to text holding a number; subtracting the sum of the
//! two function results gives one character of the URL, in index order.
use std::sync::LazyLock;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use regex::Regex;
use stream_logging::stream_debug;

static ARRAY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\bvar|\blet|\bconst)?\s*([A-Za-z_$][\w$]*)\s*=\s*\[\s*((?:\[\s*\d+\s*,\s*[\x22'][^\x22']*[\x22']\s*\]\s*,?\s*)+)\]")
        .expect("hardcoded regex pattern is valid")
});

static PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[\s*(\d+)\s*,\s*["']([A-Za-z0-9+/=_-]*)["']\s*\]"#)
        .expect("hardcoded regex pattern is valid")
});

static KEY_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function\s+[A-Za-z_$][\w$]*\s*\(\s*\)\s*\{\s*return\s+(-?\d+)\s*;?\s*\}")
        .expect("hardcoded regex pattern is valid")
});

static FIRST_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("hardcoded regex pattern is valid"));

const MANIFEST_MARKER: &str = ".m3u8";

/// Why a markup snippet could not be decoded. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeMiss {
    NoArray,
    MissingKeyFunctions,
    NotAManifest(String),
}

#[derive(Debug, Clone, Default)]
pub struct ObfuscationDecoder {
    array_name: Option<String>,
}

impl ObfuscationDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only consider the array assigned to `name`.
    pub fn with_array_name(name: impl Into<String>) -> Self {
        Self {
            array_name: Some(name.into()),
        }
    }

    /// Pinned to `name` when one is given, otherwise any array.
    pub fn for_array(name: Option<&str>) -> Self {
        Self {
            array_name: name.map(str::to_string),
        }
    }

    /// The manifest URL hidden in `markup`, if any.
    pub fn decode(&self, markup: &str) -> Option<String> {
        match self.try_decode(markup) {
            Ok(url) => Some(url),
            Err(miss) => {
                stream_debug!("Obfuscated manifest not decoded: {:?}", miss);
                None
            }
        }
    }

    pub fn try_decode(&self, markup: &str) -> Result<String, DecodeMiss> {
        let mut pairs = self.find_pairs(markup).ok_or(DecodeMiss::NoArray)?;
        let key = find_key(markup).ok_or(DecodeMiss::MissingKeyFunctions)?;

        pairs.sort_by_key(|(index, _)| *index);
        let decoded: String = pairs
            .iter()
            .filter_map(|(_, chunk)| decode_char(chunk, key))
            .collect();

        if decoded.starts_with("http") && decoded.contains(MANIFEST_MARKER) {
            Ok(decoded)
        } else {
            Err(DecodeMiss::NotAManifest(decoded))
        }
    }

    fn find_pairs<'a>(&self, markup: &'a str) -> Option<Vec<(u64, &'a str)>> {
        ARRAY_DECL
            .captures_iter(markup)
            .filter(|caps| match &self.array_name {
                Some(name) => &caps[1] == name.as_str(),
                None => true,
            })
            .find_map(|caps| {
                let body = caps.get(2)?.as_str();
                let pairs: Vec<_> = PAIR
                    .captures_iter(body)
                    .filter_map(|pair| {
                        let index = pair[1].parse::<u64>().ok()?;
                        Some((index, pair.get(2)?.as_str()))
                    })
                    .collect();
                (!pairs.is_empty()).then_some(pairs)
            })
    }
}

/// Sum of the integers returned by the first two zero-argument functions.
fn find_key(markup: &str) -> Option<i64> {
    let mut values = KEY_FUNCTION
        .captures_iter(markup)
        .filter_map(|caps| caps[1].parse::<i64>().ok());
    let first = values.next()?;
    let second = values.next()?;
    first.checked_add(second)
}

fn decode_char(chunk: &str, key: i64) -> Option<char> {
    let raw = STANDARD
        .decode(chunk)
        .or_else(|_| STANDARD_NO_PAD.decode(chunk.trim_end_matches('=')))
        .ok()?;
    let text = String::from_utf8_lossy(&raw);
    let code = FIRST_DIGITS.find(&text)?.as_str().parse::<i64>().ok()?;
    let scalar = u32::try_from(code.checked_sub(key)?).ok()?;
    char::from_u32(scalar)
}
