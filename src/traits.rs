use async_trait::async_trait;
use std::time::Duration;

use crate::context::RunContext;
use crate::error::{ProbeError, Result};
use crate::types::{MetricDirection, ProbeResult, SharedRecord};

/// ProbeStrategy: 所有测速策略必须实现的接口
#[async_trait]
pub trait ProbeStrategy: Send + Sync {
    /// 策略名称 (如 "deep", "shallow")
    fn name(&self) -> &'static str;

    /// Whether a larger metric is better or worse.
    fn direction(&self) -> MetricDirection;

    /// How many entries the ranker keeps. `None` keeps every success.
    fn requested_count(&self) -> Option<usize>;

    /// Probe every candidate once.
    /// Must return exactly one result per candidate; failures are encoded
    /// in `ProbeResult::status`, never returned as errors.
    async fn probe(&self, candidates: &[SharedRecord], ctx: &RunContext) -> Vec<ProbeResult>;
}

/// External comparative ranking (netselect or a latency test).
#[async_trait]
pub trait RankingOracle: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rank `urls` and return at most `count` of them, best first.
    /// An `Err` fails the whole call.
    async fn rank(&self, urls: &[String], count: usize) -> Result<Vec<String>>;
}

/// Outcome of one bounded partial download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Network access used by the deep probe.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Fetch at most `byte_budget` bytes from `url`, timing the transfer.
    async fn fetch(&self, url: &str, byte_budget: u64) -> std::result::Result<Transfer, ProbeError>;
}
