pub mod deep;
pub mod interactive;
pub mod shallow;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{SelectionOptions, StrategyKind, Tuning};
use crate::error::Result;
use crate::oracles;
use crate::scheduler::Scheduler;
use crate::traits::ProbeStrategy;
use crate::transport::{self, HttpTransport};

/// Build the strategy once per run. "All mirrors" mode shares the
/// interactive pass-through, it only skips the prompt.
pub fn get_strategy(opts: &SelectionOptions, tuning: &Tuning) -> Result<Box<dyn ProbeStrategy>> {
    if opts.all_mirrors {
        return Ok(Box::new(interactive::PassThrough));
    }

    match opts.strategy {
        StrategyKind::Interactive => Ok(Box::new(interactive::PassThrough)),
        StrategyKind::Deep => {
            let timeout = Duration::from_secs(opts.timeout_secs);
            let client = transport::build_client(opts.family, timeout)?;
            Ok(Box::new(deep::DeepProbe::new(
                Arc::new(HttpTransport::new(client)),
                Scheduler::new(tuning.concurrency, timeout),
                &tuning.probe_path,
                tuning.byte_budget,
                opts.servers,
            )))
        }
        StrategyKind::Shallow => {
            let oracle = oracles::get_oracle(tuning, opts.family)?;
            // 分块依次执行, 避免路由器拦截突发请求
            let scheduler = Scheduler::new(1, Duration::from_secs(tuning.oracle_timeout_secs.max(1)));
            Ok(Box::new(shallow::ShallowProbe::new(
                oracle,
                scheduler,
                opts.block_size,
                opts.servers,
            )))
        }
    }
}
