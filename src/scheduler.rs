use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn, Instrument};

use crate::context::RunContext;
use crate::types::{ProbeResult, ProbeStatus, SharedRecord};

/// One schedulable piece of probing work: a single candidate (deep) or a
/// sub-batch (shallow). `index` is the unit's position in submission order.
#[derive(Debug, Clone)]
pub struct ProbeUnit {
    pub index: usize,
    pub records: Vec<SharedRecord>,
}

impl ProbeUnit {
    /// One unit per candidate.
    pub fn singles(candidates: &[SharedRecord]) -> Vec<ProbeUnit> {
        candidates
            .iter()
            .enumerate()
            .map(|(index, record)| ProbeUnit {
                index,
                records: vec![record.clone()],
            })
            .collect()
    }

    /// Consecutive blocks of at most `size` candidates. `None` or a size that
    /// covers everything yields a single unit.
    pub fn blocks(candidates: &[SharedRecord], size: Option<usize>) -> Vec<ProbeUnit> {
        let size = match size {
            Some(n) if n > 0 && n < candidates.len() => n,
            _ => candidates.len().max(1),
        };
        candidates
            .chunks(size)
            .enumerate()
            .map(|(index, chunk)| ProbeUnit {
                index,
                records: chunk.to_vec(),
            })
            .collect()
    }
}

/// Runs probe units with a concurrency cap and a per-unit timeout.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    concurrency: usize,
    unit_timeout: Duration,
}

impl Scheduler {
    pub fn new(concurrency: usize, unit_timeout: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            unit_timeout,
        }
    }

    pub fn unit_timeout(&self) -> Duration {
        self.unit_timeout
    }

    /// 并发执行所有单元
    ///
    /// Every unit is attempted exactly once. A unit that overruns its timeout
    /// is dropped and each of its records is reported as `Timeout`; siblings
    /// keep running. Returns once every unit has a terminal result, in
    /// completion order.
    pub async fn run<F, Fut>(&self, units: Vec<ProbeUnit>, ctx: &RunContext, work: F) -> Vec<ProbeResult>
    where
        F: Fn(ProbeUnit) -> Fut,
        Fut: Future<Output = Vec<ProbeResult>>,
    {
        let total: usize = units.iter().map(|u| u.records.len()).sum();
        let pb = ctx.progress_bar(total as u64, "Probing...");
        let unit_timeout = self.unit_timeout;

        let tasks = units.into_iter().map(|unit| {
            let records = unit.records.clone();
            let index = unit.index;
            let fut = work(unit);
            let pb = pb.clone();
            async move {
                let results = match tokio::time::timeout(unit_timeout, fut).await {
                    Ok(results) => reconcile(index, &records, results),
                    Err(_) => {
                        debug!(unit = index, "probe unit timed out after {:?}", unit_timeout);
                        records.into_iter().map(ProbeResult::timeout).collect()
                    }
                };
                pb.inc(results.len() as u64);
                results
            }
        });

        let collected: Vec<ProbeResult> = stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .flat_map(stream::iter)
            .collect::<Vec<_>>()
            .instrument(ctx.span().clone())
            .await;

        pb.finish_and_clear();

        debug_assert_eq!(collected.len(), total);
        collected
    }
}

/// Exactly one result per record of the unit, in record order. Records the
/// work left out become `Error`; duplicates and foreign records are dropped.
fn reconcile(index: usize, records: &[SharedRecord], results: Vec<ProbeResult>) -> Vec<ProbeResult> {
    let returned = results.len();
    let mut by_url: HashMap<String, ProbeResult> = HashMap::with_capacity(returned);
    for result in results {
        by_url.entry(result.record.url.clone()).or_insert(result);
    }

    let reconciled: Vec<ProbeResult> = records
        .iter()
        .map(|record| {
            by_url.remove(&record.url).unwrap_or_else(|| {
                ProbeResult::failed(record.clone(), ProbeStatus::Error("no result reported".to_string()))
            })
        })
        .collect();

    if returned != records.len() || !by_url.is_empty() {
        warn!(
            unit = index,
            expected = records.len(),
            got = returned,
            "probe unit returned a mismatched result set"
        );
    }
    reconciled
}
