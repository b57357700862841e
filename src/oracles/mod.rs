pub mod latency;
pub mod netselect;

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{OracleKind, Tuning};
use crate::error::Result;
use crate::traits::RankingOracle;
use crate::transport;
use crate::types::AddressFamily;
use crate::utils;

/// Pick the ranking oracle for shallow mode.
pub fn get_oracle(tuning: &Tuning, family: AddressFamily) -> Result<Arc<dyn RankingOracle>> {
    let latency = || -> Result<Arc<dyn RankingOracle>> {
        let timeout = Duration::from_secs(tuning.latency_timeout_secs.max(1));
        let client = transport::build_client(family, timeout)?;
        Ok(Arc::new(latency::LatencyOracle::new(client)))
    };

    match tuning.oracle {
        OracleKind::Netselect => Ok(Arc::new(netselect::NetselectOracle::new("netselect", family))),
        OracleKind::Latency => latency(),
        OracleKind::Auto => match utils::have_bin("netselect") {
            Some(bin) => {
                info!("using netselect at {:?}", bin);
                Ok(Arc::new(netselect::NetselectOracle::new(bin, family)))
            }
            None => {
                warn!("netselect not found on PATH, falling back to HEAD latency ranking");
                latency()
            }
        },
    }
}
