use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::ResolvedEntry;

/// Final, ordered result of one run. Counts always agree with `entries`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    generated_at: DateTime<Utc>,
    total: usize,
    working: usize,
    entries: Vec<ResolvedEntry>,
}

impl Catalog {
    /// Sorts `entries` for presentation and computes the counters.
    ///
    /// Order: working entries first, then by group (missing group sorts as
    /// empty), then by label. Comparison is byte-wise and the sort is stable.
    pub fn assemble(mut entries: Vec<ResolvedEntry>, generated_at: DateTime<Utc>) -> Self {
        entries.sort_by(presentation_order);
        let working = entries.iter().filter(|entry| entry.is_working()).count();
        Self {
            generated_at,
            total: entries.len(),
            working,
            entries,
        }
    }

    pub fn assemble_now(entries: Vec<ResolvedEntry>) -> Self {
        Self::assemble(entries, Utc::now())
    }

    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self::assemble(Vec::new(), generated_at)
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn working(&self) -> usize {
        self.working
    }

    pub fn entries(&self) -> &[ResolvedEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Share of working entries in percent; 0 for an empty catalog.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.working as f64 * 100.0 / self.total as f64
        }
    }

    pub fn into_entries(self) -> Vec<ResolvedEntry> {
        self.entries
    }
}

fn presentation_order(a: &ResolvedEntry, b: &ResolvedEntry) -> Ordering {
    (!a.is_working())
        .cmp(&!b.is_working())
        .then_with(|| a.candidate.group_or_empty().cmp(b.candidate.group_or_empty()))
        .then_with(|| a.candidate.label.cmp(&b.candidate.label))
}
