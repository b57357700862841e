use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::{MetricDirection, ProbeResult, RankedList};

/// Order successful results by metric and keep the best `count`.
///
/// Exact metric ties fall back to ascending URL so identical measurements
/// always produce the same list. Failed results are dropped, duplicate URLs
/// keep their best-placed entry, and `None` disables truncation.
pub fn select(results: &[ProbeResult], direction: MetricDirection, count: Option<usize>) -> RankedList {
    let mut ok: Vec<(&ProbeResult, f64)> = results
        .iter()
        .filter(|r| r.is_success())
        .filter_map(|r| r.metric.map(|m| (r, m)))
        .collect();

    ok.sort_by(|(a, ma), (b, mb)| {
        let by_metric = match direction {
            MetricDirection::LowerIsBetter => ma.total_cmp(mb),
            MetricDirection::HigherIsBetter => mb.total_cmp(ma),
        };
        match by_metric {
            Ordering::Equal => a.record.url.cmp(&b.record.url),
            other => other,
        }
    });

    let mut seen = HashSet::new();
    let limit = count.unwrap_or(usize::MAX);
    let entries = ok
        .into_iter()
        .filter(|(r, _)| seen.insert(r.record.url.as_str()))
        .take(limit)
        .map(|(r, _)| r.record.clone())
        .collect();

    RankedList::from_entries(entries)
}
