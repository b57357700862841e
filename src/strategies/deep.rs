use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::context::RunContext;
use crate::scheduler::{ProbeUnit, Scheduler};
use crate::traits::{ProbeStrategy, ProbeTransport};
use crate::types::{MetricDirection, ProbeResult, ProbeStatus, Protocol, SharedRecord};
use crate::utils;

/// Timed partial download per mirror; the metric is throughput in KiB/s.
pub struct DeepProbe {
    transport: Arc<dyn ProbeTransport>,
    scheduler: Scheduler,
    probe_path: String,
    byte_budget: u64,
    count: usize,
}

impl DeepProbe {
    pub fn new(
        transport: Arc<dyn ProbeTransport>,
        scheduler: Scheduler,
        probe_path: &str,
        byte_budget: u64,
        count: usize,
    ) -> Self {
        Self {
            transport,
            scheduler,
            probe_path: probe_path.to_string(),
            byte_budget,
            count,
        }
    }
}

async fn probe_one(
    transport: &dyn ProbeTransport,
    record: SharedRecord,
    probe_path: &str,
    byte_budget: u64,
) -> ProbeResult {
    if record.protocol != Protocol::Http {
        let reason = format!("unsupported protocol {}", record.protocol);
        return ProbeResult::failed(record, ProbeStatus::Error(reason));
    }

    let url = utils::probe_url(&record.url, probe_path);
    match transport.fetch(&url, byte_budget).await {
        Ok(t) if t.bytes == 0 => ProbeResult::failed(record, ProbeStatus::Error("empty response".into())),
        Ok(t) => {
            let secs = t.elapsed.as_secs_f64().max(1e-6);
            let kib_per_sec = t.bytes as f64 / 1024.0 / secs;
            debug!("{}: {} bytes in {:?} ({:.1} KiB/s)", record.url, t.bytes, t.elapsed, kib_per_sec);
            ProbeResult::success(record, kib_per_sec)
        }
        Err(e) => {
            debug!("{}: {}", record.url, e);
            ProbeResult::failed(record, e.into())
        }
    }
}

#[async_trait]
impl ProbeStrategy for DeepProbe {
    fn name(&self) -> &'static str {
        "deep"
    }

    fn direction(&self) -> MetricDirection {
        MetricDirection::HigherIsBetter
    }

    fn requested_count(&self) -> Option<usize> {
        Some(self.count)
    }

    async fn probe(&self, candidates: &[SharedRecord], ctx: &RunContext) -> Vec<ProbeResult> {
        debug!(
            "deep probing {} mirrors, {} bytes each, timeout {:?}",
            candidates.len(),
            self.byte_budget,
            self.scheduler.unit_timeout()
        );

        self.scheduler
            .run(ProbeUnit::singles(candidates), ctx, |unit| {
                let transport = self.transport.clone();
                async move {
                    let mut results = Vec::with_capacity(unit.records.len());
                    for record in unit.records {
                        results.push(
                            probe_one(transport.as_ref(), record, &self.probe_path, self.byte_budget).await,
                        );
                    }
                    results
                }
            })
            .await
    }
}
