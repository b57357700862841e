use std::fmt;
use std::sync::Arc;

/// 镜像协议 (https 归入 http)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Ftp,
    Rsync,
}

impl Protocol {
    /// Derive the protocol from a URL scheme. Returns `None` for anything
    /// the selector does not know how to handle.
    pub fn from_url(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once("://")?;
        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Some(Protocol::Http),
            "ftp" => Some(Protocol::Ftp),
            "rsync" => Some(Protocol::Rsync),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Http => "http",
            Protocol::Ftp => "ftp",
            Protocol::Rsync => "rsync",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFamily {
    V4,
    V6,
    #[default]
    Either,
}

/// 镜像源定义
///
/// Built once by the loader and shared read-only between probe units.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorRecord {
    pub name: String,
    pub url: String,
    pub protocol: Protocol,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub region_tag: Option<String>,
    pub ipv4: bool,
    pub ipv6: bool,
}

impl MirrorRecord {
    /// Returns `None` when the URL scheme is not one of http(s), ftp or rsync.
    pub fn new(name: &str, url: &str) -> Option<Self> {
        let protocol = Protocol::from_url(url)?;
        Some(Self {
            name: name.to_string(),
            url: url.to_string(),
            protocol,
            country: None,
            country_code: None,
            region: None,
            region_tag: None,
            ipv4: true,
            ipv6: true,
        })
    }

    pub fn with_country(mut self, country: &str, code: Option<&str>) -> Self {
        self.country = Some(country.to_string());
        self.country_code = code.map(str::to_string);
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region_tag = Some(region_tag(region));
        self.region = Some(region.to_string());
        self
    }

    pub fn with_families(mut self, ipv4: bool, ipv6: bool) -> Self {
        self.ipv4 = ipv4;
        self.ipv6 = ipv6;
        self
    }
}

/// Grouping key for a region: lowercased, non-alphanumeric runs become `-`.
/// "North America" and "north-america" share the tag `north-america`.
pub fn region_tag(region: &str) -> String {
    let mut tag = String::with_capacity(region.len());
    let mut pending_dash = false;
    for c in region.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !tag.is_empty() {
                tag.push('-');
            }
            pending_dash = false;
            tag.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    tag
}

pub type SharedRecord = Arc<MirrorRecord>;

/// Immutable input to one selection run.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    records: Vec<SharedRecord>,
}

impl CandidateSet {
    pub fn new(records: Vec<MirrorRecord>) -> Self {
        Self {
            records: records.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn records(&self) -> &[SharedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeStatus {
    Success,
    Timeout,
    Unreachable(String),
    Error(String),
    OracleFailure(String),
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Success => f.write_str("ok"),
            ProbeStatus::Timeout => f.write_str("timeout"),
            ProbeStatus::Unreachable(reason) => write!(f, "unreachable ({})", reason),
            ProbeStatus::Error(reason) => write!(f, "error ({})", reason),
            ProbeStatus::OracleFailure(reason) => write!(f, "oracle failure ({})", reason),
        }
    }
}

/// 测速结果: exactly one per candidate per run.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub record: SharedRecord,
    pub metric: Option<f64>,
    pub status: ProbeStatus,
}

impl ProbeResult {
    pub fn success(record: SharedRecord, metric: f64) -> Self {
        Self {
            record,
            metric: Some(metric),
            status: ProbeStatus::Success,
        }
    }

    pub fn failed(record: SharedRecord, status: ProbeStatus) -> Self {
        Self {
            record,
            metric: None,
            status,
        }
    }

    pub fn timeout(record: SharedRecord) -> Self {
        Self::failed(record, ProbeStatus::Timeout)
    }

    pub fn is_success(&self) -> bool {
        self.status == ProbeStatus::Success && self.metric.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricDirection {
    /// Latency or rank position.
    LowerIsBetter,
    /// Throughput.
    HigherIsBetter,
}

/// Final, de-duplicated selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedList {
    entries: Vec<SharedRecord>,
}

impl RankedList {
    pub(crate) fn from_entries(entries: Vec<SharedRecord>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SharedRecord] {
        &self.entries
    }

    pub fn urls(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.url.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of one selection run. `discarded` holds every non-success result.
#[derive(Debug, Clone, Default)]
pub struct SelectionOutcome {
    pub considered: usize,
    pub ranked: RankedList,
    pub discarded: Vec<ProbeResult>,
}
