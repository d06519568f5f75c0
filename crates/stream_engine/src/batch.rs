use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use catalog_core::{CandidateEntry, ResolvedEntry, StreamStatus};
use chrono::Utc;
use futures_util::FutureExt;
use stream_logging::{stream_error, stream_info, stream_warn};
use tokio::sync::mpsc;

use crate::{EngineContext, RunEvent};

/// Turns one candidate into its checked entry. Implementations report every
/// failure through the entry's status instead of returning an error.
#[async_trait::async_trait]
pub trait CandidateResolver: Send + Sync {
    async fn resolve(&self, candidate: &CandidateEntry) -> ResolvedEntry;
}

/// Splits `candidates` into at most `workers` contiguous batches of
/// `ceil(n / workers)` entries.
pub fn partition_batches(candidates: Vec<CandidateEntry>, workers: usize) -> Vec<Vec<CandidateEntry>> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let size = candidates.len().div_ceil(workers.max(1));
    candidates.chunks(size).map(<[CandidateEntry]>::to_vec).collect()
}

/// Checks candidates on `workers` concurrent tasks, one batch each.
///
/// Results arrive in batch completion order; every input candidate yields
/// exactly one entry, including when its check panics or overruns.
pub struct BatchRunner {
    ctx: EngineContext,
}

impl BatchRunner {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        candidates: Vec<CandidateEntry>,
        resolver: Arc<dyn CandidateResolver>,
    ) -> Vec<ResolvedEntry> {
        let total = candidates.len();
        let batches = partition_batches(candidates, self.ctx.config.workers);
        stream_info!("Processing {} candidates in {} batches", total, batches.len());

        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Vec<ResolvedEntry>)>();
        let mut outstanding = BTreeMap::new();

        for (index, batch) in batches.into_iter().enumerate() {
            outstanding.insert(index, batch.clone());
            let tx = tx.clone();
            let ctx = self.ctx.clone();
            let resolver = resolver.clone();
            tokio::spawn(async move {
                let results = run_batch(&ctx, index, batch, resolver.as_ref()).await;
                let _ = tx.send((index, results));
            });
        }
        drop(tx);

        let mut resolved = Vec::with_capacity(total);
        while let Some((index, results)) = rx.recv().await {
            outstanding.remove(&index);
            resolved.extend(results);
        }

        for (index, batch) in outstanding {
            stream_error!("Batch {} ended without reporting; marking {} entries", index, batch.len());
            let now = Utc::now();
            resolved.extend(batch.into_iter().map(|candidate| {
                ResolvedEntry::unresolved(candidate, StreamStatus::message("worker aborted"), now)
            }));
        }

        resolved
    }
}

async fn run_batch(
    ctx: &EngineContext,
    batch: usize,
    candidates: Vec<CandidateEntry>,
    resolver: &dyn CandidateResolver,
) -> Vec<ResolvedEntry> {
    ctx.emit(RunEvent::BatchStarted {
        batch,
        size: candidates.len(),
    });

    let delay = ctx.config.polite_delay;
    let mut results = Vec::with_capacity(candidates.len());
    for (position, candidate) in candidates.iter().enumerate() {
        if position > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let entry = resolve_guarded(resolver, candidate, ctx.config.item_timeout).await;
        ctx.emit(RunEvent::EntryChecked {
            batch,
            id: entry.candidate.id,
            label: entry.candidate.label.clone(),
            status: entry.status.clone(),
        });
        results.push(entry);
    }

    ctx.emit(RunEvent::BatchCompleted {
        batch,
        resolved: results.len(),
    });
    results
}

async fn resolve_guarded(
    resolver: &dyn CandidateResolver,
    candidate: &CandidateEntry,
    deadline: Duration,
) -> ResolvedEntry {
    let attempt = AssertUnwindSafe(resolver.resolve(candidate)).catch_unwind();
    match tokio::time::timeout(deadline, attempt).await {
        Ok(Ok(entry)) => entry,
        Ok(Err(_)) => {
            stream_warn!("Check of {} panicked", candidate.source_url);
            ResolvedEntry::unresolved(candidate.clone(), StreamStatus::message("internal fault"), Utc::now())
        }
        Err(_) => {
            stream_warn!("Check of {} exceeded {:?}", candidate.source_url, deadline);
            ResolvedEntry::unresolved(candidate.clone(), StreamStatus::Timeout, Utc::now())
        }
    }
}
