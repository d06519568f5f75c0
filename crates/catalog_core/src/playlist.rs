use stream_logging::stream_info;

use crate::entry::DEFAULT_GROUP;
use crate::{CandidateEntry, CandidateKind, EntryId};

const ENTRY_MARKER: &str = "#EXTINF:";
const LOGO_ATTR: &str = "tvg-logo";
const GROUP_ATTR: &str = "group-title";
const UNNAMED: &str = "Unknown Channel";

#[derive(Debug, Clone, PartialEq, Eq)]
struct EntryHeader {
    duration: i64,
    attributes: String,
    name: String,
}

/// Parses an extended M3U playlist into one candidate per
/// (`#EXTINF` line, URL line) pair, in file order.
///
/// A metadata line that is never followed by a URL line is dropped. Other
/// comment lines between the two are ignored.
pub fn parse_playlist(content: &str) -> Vec<CandidateEntry> {
    let mut entries = Vec::new();
    let mut pending: Option<EntryHeader> = None;

    for line in content.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix(ENTRY_MARKER) {
            pending = parse_header(rest);
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some(header) = pending.take() {
                let id = entries.len() as EntryId + 1;
                entries.push(into_candidate(id, header, line));
            }
        }
    }

    stream_info!("Parsed {} channels from playlist", entries.len());
    entries
}

fn into_candidate(id: EntryId, header: EntryHeader, url: &str) -> CandidateEntry {
    let logo = attribute_value(&header.attributes, LOGO_ATTR).unwrap_or_default();
    let group = attribute_value(&header.attributes, GROUP_ATTR).unwrap_or_else(|| DEFAULT_GROUP.to_string());
    let label = if header.name.is_empty() {
        UNNAMED.to_string()
    } else {
        header.name
    };

    CandidateEntry {
        group: Some(group),
        logo,
        duration: Some(header.duration),
        attributes: header.attributes,
        ..CandidateEntry::new(id, label, url, CandidateKind::Playlist)
    }
}

/// `<duration>[ <attributes>],<name>`; the name starts after the first comma
/// outside of a quoted attribute value.
fn parse_header(rest: &str) -> Option<EntryHeader> {
    let digits_end = rest
        .char_indices()
        .find(|&(idx, ch)| !(ch.is_ascii_digit() || (idx == 0 && ch == '-')))
        .map(|(idx, _)| idx)
        .unwrap_or(rest.len());
    let duration = rest[..digits_end].parse::<i64>().ok()?;

    let tail = &rest[digits_end..];
    let comma = find_unquoted_comma(tail)?;
    let attributes = &tail[..comma];
    if !attributes.is_empty() && !attributes.starts_with(char::is_whitespace) {
        return None;
    }

    Some(EntryHeader {
        duration,
        attributes: attributes.trim().to_string(),
        name: tail[comma + 1..].trim().to_string(),
    })
}

fn find_unquoted_comma(text: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (idx, ch) in text.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some(idx),
            _ => {}
        }
    }
    None
}

fn attribute_value(attributes: &str, key: &str) -> Option<String> {
    let needle = format!("{key}=\"");
    let start = attributes.find(&needle)? + needle.len();
    let len = attributes[start..].find('"')?;
    Some(attributes[start..start + len].to_string())
}

#[cfg(test)]
mod tests {
    use super::{attribute_value, parse_header};

    #[test]
    fn header_with_attributes_and_commas_in_quotes() {
        let header =
            parse_header(r#"-1 tvg-logo="a,b.png" group-title="News",CNN, International"#).unwrap();
        assert_eq!(header.duration, -1);
        assert_eq!(header.attributes, r#"tvg-logo="a,b.png" group-title="News""#);
        assert_eq!(header.name, "CNN, International");
    }

    #[test]
    fn header_without_duration_is_rejected() {
        assert!(parse_header("abc,Name").is_none());
        assert!(parse_header("10Name").is_none());
    }

    #[test]
    fn attribute_lookup_is_exact() {
        let attrs = r#"tvg-logo="" group-title="Sports""#;
        assert_eq!(attribute_value(attrs, "tvg-logo").as_deref(), Some(""));
        assert_eq!(attribute_value(attrs, "group-title").as_deref(), Some("Sports"));
        assert_eq!(attribute_value(attrs, "tvg-id"), None);
    }
}
