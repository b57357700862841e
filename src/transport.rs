use async_trait::async_trait;
use reqwest::header::RANGE;
use reqwest::Client;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};

use crate::error::{ProbeError, Result};
use crate::traits::{ProbeTransport, Transfer};
use crate::types::AddressFamily;

/// Bind the client to the wildcard address of the requested family, which
/// makes every connection use that family.
fn local_address(family: AddressFamily) -> Option<IpAddr> {
    match family {
        AddressFamily::V4 => Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        AddressFamily::V6 => Some(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
        AddressFamily::Either => None,
    }
}

/// Build a client with a hard request timeout. 设置超时，防止慢源阻塞整个流程
pub fn build_client(family: AddressFamily, timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .local_address(local_address(family))
        .user_agent(concat!("mirrorselect/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Partial HTTP(S) download used by the deep probe.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn fetch(&self, url: &str, byte_budget: u64) -> std::result::Result<Transfer, ProbeError> {
        let budget = byte_budget.max(1);
        let start = Instant::now();

        let mut resp = self
            .client
            .get(url)
            .header(RANGE, format!("bytes=0-{}", budget - 1))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProbeError::Protocol(format!("HTTP {}", resp.status())));
        }

        // 只读取预算内的字节, 不下载整个文件
        let mut bytes = 0u64;
        while let Some(chunk) = resp.chunk().await? {
            bytes += chunk.len() as u64;
            if bytes >= budget {
                break;
            }
        }

        Ok(Transfer {
            bytes: bytes.min(budget),
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, local_client, BIG_BODY};

    fn transport(timeout: Duration) -> HttpTransport {
        HttpTransport::new(local_client(timeout))
    }

    #[tokio::test]
    async fn oversized_body_is_cut_at_the_byte_budget() {
        let addr = test_support::serve().await;
        let budget = 100 * 1024;

        let transfer = transport(Duration::from_secs(5))
            .fetch(&format!("http://{}/big", addr), budget)
            .await
            .unwrap();

        assert!((budget as usize) < BIG_BODY);
        assert_eq!(transfer.bytes, budget);
        assert!(transfer.elapsed > Duration::ZERO);
    }

    #[tokio::test]
    async fn http_error_status_is_a_protocol_error() {
        let addr = test_support::serve().await;
        let err = transport(Duration::from_secs(5))
            .fetch(&format!("http://{}/missing", addr), 1024)
            .await
            .unwrap_err();
        assert_eq!(err, ProbeError::Protocol("HTTP 404 Not Found".to_string()));
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let addr = test_support::closed_port().await;
        let err = transport(Duration::from_secs(5))
            .fetch(&format!("http://{}/big", addr), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Unreachable(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn stalled_server_is_a_timeout() {
        let addr = test_support::serve().await;
        let err = transport(Duration::from_millis(200))
            .fetch(&format!("http://{}/hang", addr), 1024)
            .await
            .unwrap_err();
        assert_eq!(err, ProbeError::Timeout);
    }

    #[test]
    fn family_picks_the_bind_address() {
        assert_eq!(local_address(AddressFamily::V4), Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)));
        assert_eq!(local_address(AddressFamily::V6), Some(IpAddr::V6(Ipv6Addr::UNSPECIFIED)));
        assert_eq!(local_address(AddressFamily::Either), None);
        assert!(build_client(AddressFamily::V4, Duration::from_secs(1)).is_ok());
    }
}
