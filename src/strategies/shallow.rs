use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::scheduler::{ProbeUnit, Scheduler};
use crate::traits::{ProbeStrategy, RankingOracle};
use crate::types::{MetricDirection, ProbeResult, ProbeStatus, SharedRecord};

/// Comparative ranking through an external oracle, optionally in blocks.
///
/// Blocks run one after another and their rankings are concatenated in block
/// order; the union is never re-ranked. The metric is the global position in
/// that concatenation.
pub struct ShallowProbe {
    oracle: Arc<dyn RankingOracle>,
    scheduler: Scheduler,
    block_size: Option<usize>,
    count: usize,
}

impl ShallowProbe {
    /// `scheduler` should have a concurrency of 1 so blocks stay sequential.
    pub fn new(oracle: Arc<dyn RankingOracle>, scheduler: Scheduler, block_size: Option<usize>, count: usize) -> Self {
        Self {
            oracle,
            scheduler,
            block_size,
            count,
        }
    }

    async fn rank_block(&self, unit: ProbeUnit, offset: usize) -> Vec<ProbeResult> {
        let urls: Vec<String> = unit.records.iter().map(|r| r.url.clone()).collect();
        let wanted = self.count.min(urls.len());

        let ranked = match self.oracle.rank(&urls, wanted).await {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!("{} failed for block {}: {}", self.oracle.name(), unit.index, e);
                let reason = e.to_string();
                return unit
                    .records
                    .into_iter()
                    .map(|r| ProbeResult::failed(r, ProbeStatus::OracleFailure(reason.clone())))
                    .collect();
            }
        };

        let mut position: HashMap<&str, usize> = HashMap::new();
        for url in &ranked {
            if !urls.iter().any(|u| u == url) {
                warn!("{} returned unknown url {}", self.oracle.name(), url);
                continue;
            }
            let next = position.len();
            position.entry(url.as_str()).or_insert(next);
        }
        debug!(block = unit.index, ranked = position.len(), "block ranked");

        unit.records
            .iter()
            .map(|r| match position.get(r.url.as_str()) {
                Some(&pos) => ProbeResult::success(r.clone(), (offset + pos) as f64),
                None => ProbeResult::failed(r.clone(), ProbeStatus::Unreachable("not ranked by oracle".into())),
            })
            .collect()
    }
}

#[async_trait]
impl ProbeStrategy for ShallowProbe {
    fn name(&self) -> &'static str {
        "shallow"
    }

    fn direction(&self) -> MetricDirection {
        MetricDirection::LowerIsBetter
    }

    fn requested_count(&self) -> Option<usize> {
        Some(self.count)
    }

    async fn probe(&self, candidates: &[SharedRecord], ctx: &RunContext) -> Vec<ProbeResult> {
        let units = ProbeUnit::blocks(candidates, self.block_size);
        // Offsets are fixed up front, so completion order cannot change ranks.
        let offsets: Vec<usize> = units
            .iter()
            .scan(0, |acc, u| {
                let start = *acc;
                *acc += u.records.len();
                Some(start)
            })
            .collect();
        debug!(
            "shallow ranking {} mirrors in {} block(s) via {}",
            candidates.len(),
            units.len(),
            self.oracle.name()
        );

        self.scheduler
            .run(units, ctx, |unit| {
                let offset = offsets[unit.index];
                self.rank_block(unit, offset)
            })
            .await
    }
}
