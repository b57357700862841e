use tracing::{debug, info, Instrument};

use crate::config::SelectionOptions;
use crate::context::RunContext;
use crate::filter;
use crate::ranker;
use crate::traits::ProbeStrategy;
use crate::types::{CandidateSet, SelectionOutcome};

/// One selection run: filter, probe, rank.
pub struct MirrorSelector {
    options: SelectionOptions,
    strategy: Box<dyn ProbeStrategy>,
}

impl MirrorSelector {
    pub fn new(options: SelectionOptions, strategy: Box<dyn ProbeStrategy>) -> Self {
        Self { options, strategy }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Never fails: no candidates or no successful probes give an empty
    /// `ranked` list and the caller decides what to tell the user.
    pub async fn select(&self, candidates: &CandidateSet, ctx: &RunContext) -> SelectionOutcome {
        let filtered = filter::apply(candidates, &self.options);
        if filtered.is_empty() {
            return SelectionOutcome::default();
        }

        info!(
            parent: ctx.span(),
            "probing {} of {} mirrors ({})",
            filtered.len(),
            candidates.len(),
            self.strategy.name()
        );
        let results = self
            .strategy
            .probe(&filtered, ctx)
            .instrument(ctx.span().clone())
            .await;

        let ranked = ranker::select(&results, self.strategy.direction(), self.strategy.requested_count());
        let discarded: Vec<_> = results.into_iter().filter(|r| !r.is_success()).collect();
        for r in &discarded {
            debug!(parent: ctx.span(), "discarded {}: {}", r.record.url, r.status);
        }

        SelectionOutcome {
            considered: filtered.len(),
            ranked,
            discarded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyKind;
    use crate::error::ProbeError;
    use crate::scheduler::Scheduler;
    use crate::strategies::deep::DeepProbe;
    use crate::strategies::interactive::PassThrough;
    use crate::traits::{ProbeTransport, Transfer};
    use crate::types::{MirrorRecord, ProbeStatus, Protocol};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    /// Throughput proportional to the digit in the host name.
    struct DigitTransport;

    #[async_trait]
    impl ProbeTransport for DigitTransport {
        async fn fetch(&self, url: &str, _budget: u64) -> std::result::Result<Transfer, ProbeError> {
            let digit = url
                .chars()
                .find(|c| c.is_ascii_digit())
                .and_then(|c| c.to_digit(10))
                .unwrap_or(0) as u64;
            if digit == 0 {
                return Err(ProbeError::Unreachable("no route to host".into()));
            }
            Ok(Transfer {
                bytes: digit * 1024,
                elapsed: Duration::from_secs(1),
            })
        }
    }

    fn candidates() -> CandidateSet {
        CandidateSet::new(vec![
            MirrorRecord::new("one", "http://m1.de/").unwrap().with_country("Germany", Some("DE")),
            MirrorRecord::new("three", "http://m3.de/").unwrap().with_country("Germany", Some("DE")),
            MirrorRecord::new("dead", "http://mx.de/").unwrap().with_country("Germany", Some("DE")),
            MirrorRecord::new("two", "http://m2.fr/").unwrap().with_country("France", Some("FR")),
            MirrorRecord::new("ftp", "ftp://m9.de/").unwrap().with_country("Germany", Some("DE")),
        ])
    }

    fn deep(count: usize) -> Box<dyn ProbeStrategy> {
        Box::new(DeepProbe::new(
            Arc::new(DigitTransport),
            Scheduler::new(4, Duration::from_secs(2)),
            "distfiles/mirrorselect-test",
            100 * 1024,
            count,
        ))
    }

    #[tokio::test]
    async fn deep_run_ranks_and_logs_failures() {
        let opts = SelectionOptions {
            protocol: Some(Protocol::Http),
            country: Some("DE".into()),
            servers: 5,
            ..SelectionOptions::default()
        };
        let selector = MirrorSelector::new(opts, deep(5));

        let outcome = selector.select(&candidates(), &RunContext::detached()).await;
        assert_eq!(outcome.considered, 3);
        assert_eq!(outcome.ranked.urls(), vec!["http://m3.de/", "http://m1.de/"]);
        assert_eq!(outcome.discarded.len(), 1);
        assert!(matches!(outcome.discarded[0].status, ProbeStatus::Unreachable(_)));
    }

    #[tokio::test]
    async fn deep_run_never_counts_ftp_as_failed() {
        let opts = SelectionOptions {
            strategy: StrategyKind::Deep,
            country: Some("DE".into()),
            servers: 5,
            ..SelectionOptions::default()
        };
        let selector = MirrorSelector::new(opts, deep(5));

        let outcome = selector.select(&candidates(), &RunContext::detached()).await;
        assert_eq!(outcome.considered, 3);
        assert!(outcome.discarded.iter().all(|r| r.record.protocol == Protocol::Http));
        assert!(!outcome.ranked.urls().contains(&"ftp://m9.de/".to_string()));
    }

    #[tokio::test]
    async fn no_matching_candidates_is_empty_not_error() {
        let opts = SelectionOptions {
            country: Some("Narnia".into()),
            ..SelectionOptions::default()
        };
        let selector = MirrorSelector::new(opts, deep(1));
        let outcome = selector.select(&candidates(), &RunContext::detached()).await;
        assert_eq!(outcome.considered, 0);
        assert!(outcome.ranked.is_empty());
    }

    #[tokio::test]
    async fn selection_is_reproducible() {
        let selector = MirrorSelector::new(SelectionOptions::default(), Box::new(PassThrough));
        let first = selector.select(&candidates(), &RunContext::detached()).await;
        let second = selector.select(&candidates(), &RunContext::detached()).await;
        assert_eq!(first.ranked, second.ranked);
        assert_eq!(first.ranked.len(), 5);
        assert_eq!(selector.strategy_name(), "interactive");
    }
}
