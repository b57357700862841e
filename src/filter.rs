use std::collections::HashSet;
use tracing::debug;

use crate::config::{SelectionOptions, StrategyKind};
use crate::types::{region_tag, AddressFamily, CandidateSet, MirrorRecord, Protocol, SharedRecord};

/// Narrow the candidate set to what the user asked for.
///
/// Without an explicit protocol, rsync hosts are only considered in rsync
/// mode and download hosts only outside of it. Deep mode only keeps http(s)
/// hosts, since nothing else can be timed. URLs are de-duplicated ignoring a
/// trailing slash; the first occurrence wins.
pub fn apply(candidates: &CandidateSet, opts: &SelectionOptions) -> Vec<SharedRecord> {
    let region = opts.region.as_deref().map(region_tag);
    let mut seen = HashSet::new();

    let kept: Vec<SharedRecord> = candidates
        .records()
        .iter()
        .filter(|r| protocol_matches(r, opts))
        .filter(|r| family_matches(r, opts.family))
        .filter(|r| country_matches(r, opts.country.as_deref()))
        .filter(|r| match &region {
            Some(tag) => r.region_tag.as_deref() == Some(tag.as_str()),
            None => true,
        })
        .filter(|r| seen.insert(r.url.trim_end_matches('/').to_string()))
        .cloned()
        .collect();

    debug!(total = candidates.len(), kept = kept.len(), "filtered candidates");
    kept
}

fn protocol_matches(record: &MirrorRecord, opts: &SelectionOptions) -> bool {
    if opts.rsync {
        return record.protocol == Protocol::Rsync;
    }
    if opts.strategy == StrategyKind::Deep && !opts.all_mirrors && record.protocol != Protocol::Http {
        return false;
    }
    match opts.protocol {
        Some(p) => record.protocol == p,
        None => record.protocol != Protocol::Rsync,
    }
}

fn family_matches(record: &MirrorRecord, family: AddressFamily) -> bool {
    match family {
        AddressFamily::V4 => record.ipv4,
        AddressFamily::V6 => record.ipv6,
        AddressFamily::Either => true,
    }
}

fn country_matches(record: &MirrorRecord, wanted: Option<&str>) -> bool {
    let Some(wanted) = wanted else {
        return true;
    };
    let wanted = wanted.trim();
    record
        .country
        .iter()
        .chain(record.country_code.iter())
        .any(|c| c.eq_ignore_ascii_case(wanted))
}
