use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
    /// Malformed sequences were replaced with U+FFFD.
    pub lossy: bool,
}

/// Decodes a response body to UTF-8: BOM, then `Content-Type` charset, then
/// `chardetng` detection. Never fails; malformed input is decoded lossily
/// since pages and playlists are untrusted anyway.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> DecodedText {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(encoding) = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, encoding);
    }

    // Plain ASCII/UTF-8 is by far the common case for playlists.
    if std::str::from_utf8(bytes).is_ok() {
        return decode_with(bytes, UTF_8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> DecodedText {
    let (text, used, had_errors) = encoding.decode(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding_label: used.name().to_string(),
        lossy: had_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::{charset_param, decode_body};

    #[test]
    fn charset_header_wins_over_detection() {
        let decoded = decode_body(b"caf\xe9", Some("text/html; Charset=\"ISO-8859-1\""));
        assert_eq!(decoded.text, "café");
        assert!(!decoded.lossy);
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let decoded = decode_body(b"\xEF\xBB\xBF#EXTM3U", Some("audio/x-mpegurl"));
        assert_eq!(decoded.text, "#EXTM3U");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn invalid_bytes_decode_lossily() {
        let decoded = decode_body(b"ok\xff\xfe\xfd", Some("text/plain; charset=utf-8"));
        assert!(decoded.text.starts_with("ok"));
        assert!(decoded.lossy);
    }

    #[test]
    fn charset_param_is_case_insensitive() {
        assert_eq!(charset_param("text/html;CHARSET=utf-8").as_deref(), Some("utf-8"));
        assert_eq!(charset_param("text/html"), None);
    }
}
