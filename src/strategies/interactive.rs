use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io::{BufRead, Write};

use crate::context::RunContext;
use crate::error::Result;
use crate::traits::ProbeStrategy;
use crate::types::{MetricDirection, ProbeResult, RankedList, SharedRecord};

/// No measurement: every candidate succeeds with the same metric, so the
/// ranker orders them by URL and keeps them all.
pub struct PassThrough;

#[async_trait]
impl ProbeStrategy for PassThrough {
    fn name(&self) -> &'static str {
        "interactive"
    }

    fn direction(&self) -> MetricDirection {
        MetricDirection::LowerIsBetter
    }

    fn requested_count(&self) -> Option<usize> {
        None
    }

    async fn probe(&self, candidates: &[SharedRecord], _ctx: &RunContext) -> Vec<ProbeResult> {
        candidates
            .iter()
            .map(|r| ProbeResult::success(r.clone(), 0.0))
            .collect()
    }
}

/// Print the list and let the user pick entries by number.
///
/// Accepts indices separated by spaces or commas, or `all`. An empty line
/// selects nothing. Bad input re-prompts; end of input returns what was
/// chosen so far (nothing). With `single` only one entry may be picked.
/// The returned URLs keep the order of the list, not of the input.
pub fn prompt_selection<R: BufRead, W: Write>(
    list: &RankedList,
    single: bool,
    mut input: R,
    mut out: W,
) -> Result<Vec<String>> {
    let entries = list.entries();
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    for (i, r) in entries.iter().enumerate() {
        let place = match (&r.country, &r.region) {
            (Some(c), Some(reg)) => format!("{}, {}", c, reg),
            (Some(c), None) => c.clone(),
            (None, Some(reg)) => reg.clone(),
            (None, None) => String::new(),
        };
        writeln!(out, "{:>3}) {:<55} {:<28} {}", i + 1, r.url, r.name, place)?;
    }

    let hint = if single { "one number" } else { "numbers separated by spaces, or 'all'" };
    let mut line = String::new();
    loop {
        write!(out, "Select mirrors ({}): ", hint)?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(Vec::new());
        }

        match parse_choice(line.trim(), entries.len(), single) {
            Ok(picked) => {
                return Ok(picked.into_iter().map(|i| entries[i].url.clone()).collect());
            }
            Err(msg) => writeln!(out, "{}", msg)?,
        }
    }
}

/// Zero-based indices, sorted and unique.
fn parse_choice(answer: &str, len: usize, single: bool) -> std::result::Result<Vec<usize>, String> {
    if answer.is_empty() {
        return Ok(Vec::new());
    }
    if answer.eq_ignore_ascii_case("all") {
        if single && len > 1 {
            return Err("Only one mirror can be selected.".to_string());
        }
        return Ok((0..len).collect());
    }

    let mut picked = BTreeSet::new();
    for token in answer.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()) {
        match token.parse::<usize>() {
            Ok(n) if (1..=len).contains(&n) => {
                picked.insert(n - 1);
            }
            _ => return Err(format!("'{}' is not a number between 1 and {}.", token, len)),
        }
    }

    if single && picked.len() > 1 {
        return Err("Only one mirror can be selected.".to_string());
    }
    Ok(picked.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranker;
    use crate::types::MirrorRecord;
    use std::io::Cursor;
    use std::sync::Arc;

    async fn list(urls: &[&str]) -> RankedList {
        let recs: Vec<SharedRecord> = urls
            .iter()
            .map(|u| Arc::new(MirrorRecord::new(u, u).unwrap().with_country("Germany", None)))
            .collect();
        let strategy = PassThrough;
        let results = strategy.probe(&recs, &RunContext::detached()).await;
        ranker::select(&results, strategy.direction(), strategy.requested_count())
    }

    #[tokio::test]
    async fn pass_through_sorts_by_url_untruncated() {
        let ranked = list(&["http://c.org/", "http://a.org/", "ftp://b.org/"]).await;
        assert_eq!(ranked.urls(), vec!["ftp://b.org/", "http://a.org/", "http://c.org/"]);
    }

    #[tokio::test]
    async fn picks_are_returned_in_list_order() -> Result<()> {
        let ranked = list(&["http://a.org/", "http://b.org/", "http://c.org/"]).await;
        let mut out = Vec::new();
        let picked = prompt_selection(&ranked, false, Cursor::new("3, 1\n"), &mut out)?;
        assert_eq!(picked, vec!["http://a.org/", "http://c.org/"]);

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("  1) http://a.org/"));
        assert!(shown.contains("Germany"));
        Ok(())
    }

    #[tokio::test]
    async fn bad_input_reprompts() -> Result<()> {
        let ranked = list(&["http://a.org/", "http://b.org/"]).await;
        let mut out = Vec::new();
        let picked = prompt_selection(&ranked, false, Cursor::new("7\nxyz\nall\n"), &mut out)?;
        assert_eq!(picked.len(), 2);

        let shown = String::from_utf8(out).unwrap();
        assert_eq!(shown.matches("Select mirrors").count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn single_mode_rejects_multiple() -> Result<()> {
        let ranked = list(&["rsync://a.org/gentoo-portage", "rsync://b.org/gentoo-portage"]).await;
        let mut out = Vec::new();
        let picked = prompt_selection(&ranked, true, Cursor::new("1 2\n2\n"), &mut out)?;
        assert_eq!(picked, vec!["rsync://b.org/gentoo-portage"]);
        Ok(())
    }

    #[tokio::test]
    async fn eof_or_blank_selects_nothing() -> Result<()> {
        let ranked = list(&["http://a.org/"]).await;
        assert!(prompt_selection(&ranked, false, Cursor::new(""), Vec::new())?.is_empty());
        assert!(prompt_selection(&ranked, false, Cursor::new("\n"), Vec::new())?.is_empty());
        Ok(())
    }
}
