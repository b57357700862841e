mod config;
mod context;
mod error;
mod filter;
mod oracles;
mod ranker;
mod scheduler;
mod selector;
mod strategies;
#[cfg(test)]
mod test_support;
mod traits;
mod transport;
mod types;
mod utils;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use config::{SelectionOptions, StrategyKind};
use context::RunContext;
use selector::MirrorSelector;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use types::{AddressFamily, Protocol};

#[derive(Parser)]
#[command(name = "mirrorselect", version)]
#[command(about = "Select the fastest download or rsync mirrors", long_about = None)]
#[command(group(ArgGroup::new("kind").args(["ftp", "http", "rsync"])))]
#[command(group(ArgGroup::new("family").args(["ipv4", "ipv6"])))]
#[command(group(ArgGroup::new("verbosity").args(["debug", "quiet"])))]
struct Cli {
    /// Present every filtered mirror without probing (rsync: rotation server only).
    /// Takes precedence over -i and -D.
    #[arg(short = 'a', long = "all-mirrors")]
    all_mirrors: bool,

    /// Choose mirrors by hand from the filtered list
    #[arg(short, long)]
    interactive: bool,

    /// Deep mode: time a 100k download from each mirror
    #[arg(short = 'D', long, conflicts_with = "interactive")]
    deep: bool,

    /// Only consider ftp mirrors
    #[arg(short = 'F', long)]
    ftp: bool,

    /// Only consider http(s) mirrors
    #[arg(short = 'H', long)]
    http: bool,

    /// Select an rsync mirror (requires -i or -a)
    #[arg(short, long)]
    rsync: bool,

    /// Only use IPv4
    #[arg(short = '4', long)]
    ipv4: bool,

    /// Only use IPv6
    #[arg(short = '6', long)]
    ipv6: bool,

    /// Only use mirrors from this country (name or code, e.g. 'South Korea')
    #[arg(short, long)]
    country: Option<String>,

    /// Only use mirrors from this region (e.g. 'North America')
    #[arg(short = 'R', long)]
    region: Option<String>,

    /// Split hosts into blocks of this size for the ranking oracle
    #[arg(short, long = "blocksize")]
    block_size: Option<usize>,

    /// Per-mirror timeout for deep mode, in seconds
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    /// Number of servers to select
    #[arg(short, long, default_value_t = 1)]
    servers: usize,

    /// Read candidate mirrors from this JSON file
    #[arg(short, long)]
    mirrors: Option<PathBuf>,

    /// Read tuning from this TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug output
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn options(&self) -> SelectionOptions {
        let strategy = if self.interactive {
            StrategyKind::Interactive
        } else if self.deep {
            StrategyKind::Deep
        } else {
            StrategyKind::Shallow
        };

        let protocol = if self.ftp {
            Some(Protocol::Ftp)
        } else if self.http {
            Some(Protocol::Http)
        } else {
            None
        };

        let family = if self.ipv4 {
            AddressFamily::V4
        } else if self.ipv6 {
            AddressFamily::V6
        } else {
            AddressFamily::Either
        };

        SelectionOptions {
            strategy,
            protocol,
            family,
            country: self.country.clone(),
            region: self.region.clone(),
            block_size: self.block_size,
            timeout_secs: self.timeout,
            servers: self.servers,
            rsync: self.rsync,
            all_mirrors: self.all_mirrors,
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so stdout carries only the result line.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let opts = cli.options();
    opts.validate()?;

    let tuning = config::load_tuning(cli.config.as_deref()).context("Failed to load tuning")?;
    let candidates =
        config::load_candidates(cli.mirrors.as_deref()).context("Failed to load the mirror list")?;
    if candidates.is_empty() {
        warn!("The mirror list is empty");
        return Ok(());
    }
    debug!("{} candidate mirrors loaded", candidates.len());

    let urls = select_urls(&opts, &tuning, &candidates, !cli.quiet).await?;

    if urls.is_empty() {
        warn!("No search results found. Check your filter settings and re-run mirrorselect");
        return Ok(());
    }

    println!("{}", utils::render_assignment(&urls, opts.rsync));
    Ok(())
}

async fn select_urls(
    opts: &SelectionOptions,
    tuning: &config::Tuning,
    candidates: &types::CandidateSet,
    progress: bool,
) -> Result<Vec<String>> {
    let strategy = strategies::get_strategy(opts, tuning)?;
    let selector = MirrorSelector::new(opts.clone(), strategy);
    let ctx = RunContext::new(selector.strategy_name(), progress);

    let outcome = selector.select(candidates, &ctx).await;
    if outcome.considered == 0 {
        return Ok(Vec::new());
    }
    if outcome.ranked.is_empty() {
        warn!(
            "All {} mirrors failed to respond. Please check your network connection.",
            outcome.considered
        );
        return Ok(Vec::new());
    }

    if opts.all_mirrors {
        let mut urls = outcome.ranked.urls();
        // sync-uri 只支持单个地址
        if opts.rsync {
            urls.truncate(1);
        }
        return Ok(urls);
    }

    if opts.strategy == StrategyKind::Interactive {
        let stdin = std::io::stdin();
        let picked = strategies::interactive::prompt_selection(
            &outcome.ranked,
            opts.rsync,
            stdin.lock(),
            std::io::stderr(),
        )?;
        return Ok(picked);
    }

    info!("Selected {} mirror(s)", outcome.ranked.len());
    for (i, record) in outcome.ranked.entries().iter().enumerate() {
        info!("#{} {} ({})", i + 1, record.url, record.name);
    }
    if !outcome.discarded.is_empty() {
        info!("{} of {} mirrors were discarded", outcome.discarded.len(), outcome.considered);
    }
    Ok(outcome.ranked.urls())
}
