use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// `HH:MM - description`, with the description bounded to reject garbage.
static TIMED_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}:\d{2})\s*-\s*([^<>\r\n]{3,120})(?:<|\r|\n|$)")
        .expect("hardcoded regex pattern is valid")
});

const MIN_DESCRIPTION_CHARS: usize = 3;

/// Event titles in document order, deduplicated.
pub fn extract_titles(markup: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    TIMED_TITLE
        .captures_iter(markup)
        .filter_map(|caps| {
            let description = caps[2].trim();
            if description.chars().count() < MIN_DESCRIPTION_CHARS {
                return None;
            }
            Some(format!("{} - {}", &caps[1], description.replace("&amp;", "&")))
        })
        .filter(|title| seen.insert(title.clone()))
        .collect()
}

/// Label for the candidate at `index`: the title at the same position, else
/// `Event N`. Position is the only link between the two lists.
pub fn label_for(titles: &[String], index: usize) -> String {
    titles
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("Event {}", index + 1))
}
