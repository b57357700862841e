use crate::error::{MirrorError, Result};
use crate::types::{AddressFamily, CandidateSet, MirrorRecord, Protocol};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// Include the JSON file at compile time
const MIRRORS_JSON: &str = include_str!("../assets/mirrors.json");

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROBE_PATH: &str = "distfiles/mirrorselect-test";
const DEFAULT_BYTE_BUDGET: u64 = 100 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Shallow,
    Deep,
    Interactive,
}

/// What the user asked for on the command line.
#[derive(Debug, Clone)]
pub struct SelectionOptions {
    pub strategy: StrategyKind,
    pub protocol: Option<Protocol>,
    pub family: AddressFamily,
    pub country: Option<String>,
    pub region: Option<String>,
    /// Shallow only.
    pub block_size: Option<usize>,
    /// Deep only.
    pub timeout_secs: u64,
    pub servers: usize,
    pub rsync: bool,
    pub all_mirrors: bool,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Shallow,
            protocol: None,
            family: AddressFamily::Either,
            country: None,
            region: None,
            block_size: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            servers: 1,
            rsync: false,
            all_mirrors: false,
        }
    }
}

impl SelectionOptions {
    /// Reject flag combinations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(MirrorError::InvalidOptions(msg.to_string()));

        if self.servers == 0 {
            return invalid("the number of servers must be at least 1");
        }
        if self.block_size == Some(0) {
            return invalid("the block size must be at least 1");
        }
        if self.timeout_secs == 0 {
            return invalid("the timeout must be at least 1 second");
        }
        if self.strategy == StrategyKind::Deep && self.protocol == Some(Protocol::Ftp) && !self.all_mirrors {
            return invalid("deep mode can only time http(s) downloads; drop --ftp or --deep");
        }
        if self.rsync && self.protocol.is_some() {
            return invalid("choose at most one of --http, --ftp and --rsync");
        }
        if self.rsync && !(self.strategy == StrategyKind::Interactive || self.all_mirrors) {
            return invalid("rsync servers can only be selected with --interactive or --all-mirrors");
        }
        if self.strategy == StrategyKind::Interactive && (self.block_size.is_some() || self.servers > 1) {
            return invalid("--interactive cannot be combined with --blocksize or --servers");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleKind {
    /// netselect when installed, otherwise the HEAD latency test.
    #[default]
    Auto,
    Netselect,
    Latency,
}

/// Operator-level knobs read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub concurrency: usize,
    pub probe_path: String,
    pub byte_budget: u64,
    pub oracle: OracleKind,
    pub oracle_timeout_secs: u64,
    pub latency_timeout_secs: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            concurrency: 8,
            probe_path: DEFAULT_PROBE_PATH.to_string(),
            byte_budget: DEFAULT_BYTE_BUDGET,
            oracle: OracleKind::Auto,
            oracle_timeout_secs: 60,
            latency_timeout_secs: 3,
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mirrorselect").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Load tuning from an explicit path, else `<config dir>/config.toml`,
/// else defaults. An explicit path that does not exist is an error.
pub fn load_tuning(path: Option<&Path>) -> Result<Tuning> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_dir().map(|d| d.join("config.toml")) {
            Some(p) if p.exists() => p,
            _ => return Ok(Tuning::default()),
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let tuning: Tuning = toml::from_str(&content)?;
    debug!("loaded tuning from {:?}: {:?}", path, tuning);
    Ok(tuning)
}

#[derive(Debug, Deserialize)]
struct RawMirror {
    #[serde(default)]
    name: Option<String>,
    url: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default = "default_true")]
    ipv4: bool,
    #[serde(default = "default_true")]
    ipv6: bool,
}

fn default_true() -> bool {
    true
}

/// Parse a JSON mirror list. Entries with an unsupported scheme are skipped.
pub fn parse_candidates(json: &str) -> Result<CandidateSet> {
    let raw: Vec<RawMirror> = serde_json::from_str(json)?;
    let mut records = Vec::with_capacity(raw.len());

    for entry in raw {
        let name = entry.name.as_deref().unwrap_or(&entry.url);
        let Some(mut record) = MirrorRecord::new(name, &entry.url) else {
            warn!("skipping mirror with unsupported scheme: {}", entry.url);
            continue;
        };
        if let Some(country) = entry.country.as_deref() {
            record = record.with_country(country, entry.country_code.as_deref());
        } else {
            record.country_code = entry.country_code;
        }
        if let Some(region) = entry.region.as_deref() {
            record = record.with_region(region);
        }
        records.push(record.with_families(entry.ipv4, entry.ipv6));
    }

    Ok(CandidateSet::new(records))
}

/// Retrieve the candidate mirror list
/// Strategy:
/// 1. An explicit `--mirrors` file
/// 2. User Config (~/.config/mirrorselect/mirrors.json)
/// 3. Fallback to built-in assets/mirrors.json
pub fn load_candidates(path: Option<&Path>) -> Result<CandidateSet> {
    if let Some(path) = path {
        let content = std::fs::read_to_string(path)?;
        info!("using mirror list: {:?}", path);
        return parse_candidates(&content);
    }

    if let Some(local) = config_dir().map(|d| d.join("mirrors.json")) {
        if local.exists() {
            match std::fs::read_to_string(&local)
                .map_err(MirrorError::from)
                .and_then(|c| parse_candidates(&c))
            {
                Ok(set) => {
                    info!("loaded mirrors from local config: {:?}", local);
                    return Ok(set);
                }
                Err(e) => warn!("ignoring unreadable {:?}: {}", local, e),
            }
        }
    }

    parse_candidates(MIRRORS_JSON)
}
