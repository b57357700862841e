use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::traits::RankingOracle;

/// Ranks hosts by HEAD round-trip time. Used when netselect is unavailable.
pub struct LatencyOracle {
    client: Client,
}

impl LatencyOracle {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 单个源测速逻辑
    async fn check_latency(&self, url: &str) -> Option<u128> {
        let start = Instant::now();

        // 使用 HEAD 请求而不是 GET，只获取元数据，速度更快且省流量
        match self.client.head(url).send().await {
            Ok(resp) if resp.status().is_success() => Some(start.elapsed().as_micros()),
            Ok(resp) => {
                // 虽然连上了，但返回 404/500 等错误，视为不可用
                debug!("{} answered {}", url, resp.status());
                None
            }
            Err(e) => {
                debug!("{} failed: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl RankingOracle for LatencyOracle {
    fn name(&self) -> &'static str {
        "latency"
    }

    async fn rank(&self, urls: &[String], count: usize) -> Result<Vec<String>> {
        let tasks = urls.iter().map(|url| async move {
            self.check_latency(url).await.map(|latency| (latency, url))
        });

        // 并发执行所有 Future
        let mut measured: Vec<(u128, &String)> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .collect();

        // 排序: 延迟低的在前, 相同延迟按 URL
        measured.sort();

        Ok(measured
            .into_iter()
            .take(count)
            .map(|(_, url)| url.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, local_client};
    use std::time::Duration;

    #[tokio::test]
    async fn only_healthy_hosts_are_ranked_fastest_first() -> Result<()> {
        let addr = test_support::serve().await;
        let closed = test_support::closed_port().await;
        let urls = vec![
            format!("http://{}/slow", addr),
            format!("http://{}/missing", addr),
            format!("http://{}/ok", closed),
            format!("http://{}/ok", addr),
        ];
        let oracle = LatencyOracle::new(local_client(Duration::from_secs(5)));

        let ranked = oracle.rank(&urls, 10).await?;
        assert_eq!(ranked, vec![urls[3].clone(), urls[0].clone()]);

        let top = oracle.rank(&urls, 1).await?;
        assert_eq!(top, vec![urls[3].clone()]);
        Ok(())
    }

    #[tokio::test]
    async fn nothing_reachable_ranks_empty() -> Result<()> {
        let closed = test_support::closed_port().await;
        let oracle = LatencyOracle::new(local_client(Duration::from_secs(2)));
        let ranked = oracle.rank(&[format!("http://{}/", closed)], 5).await?;
        assert!(ranked.is_empty());
        Ok(())
    }
}
