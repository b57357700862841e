use async_trait::async_trait;
use regex::Regex;
use std::ffi::OsString;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MirrorError, Result};
use crate::traits::RankingOracle;
use crate::types::AddressFamily;

/// netselect prints this score for hosts it could not reach.
const UNREACHABLE_SCORE: u64 = 9999;

/// Ranks hosts by running the `netselect` utility.
pub struct NetselectOracle {
    program: OsString,
    family: AddressFamily,
}

impl NetselectOracle {
    pub fn new(program: impl Into<OsString>, family: AddressFamily) -> Self {
        Self {
            program: program.into(),
            family,
        }
    }

    fn args(&self, urls: &[String], count: usize) -> Vec<String> {
        let mut args = vec![format!("-s{}", count)];
        match self.family {
            AddressFamily::V4 => args.push("-4".to_string()),
            AddressFamily::V6 => args.push("-6".to_string()),
            AddressFamily::Either => {}
        }
        args.extend(urls.iter().cloned());
        args
    }
}

/// Parse `<score> <url>` lines, best first. Anything else is skipped.
pub fn parse_output(stdout: &str) -> Result<Vec<String>> {
    let re = Regex::new(r"^\s*(?P<score>\d+)\s+(?P<url>\S+)\s*$")?;

    let ranked = stdout
        .lines()
        .filter_map(|line| re.captures(line))
        .filter(|caps| {
            caps["score"]
                .parse::<u64>()
                .map(|s| s < UNREACHABLE_SCORE)
                .unwrap_or(false)
        })
        .map(|caps| caps["url"].to_string())
        .collect();

    Ok(ranked)
}

#[async_trait]
impl RankingOracle for NetselectOracle {
    fn name(&self) -> &'static str {
        "netselect"
    }

    async fn rank(&self, urls: &[String], count: usize) -> Result<Vec<String>> {
        if urls.is_empty() || count == 0 {
            return Ok(Vec::new());
        }

        let output = Command::new(&self.program)
            .args(self.args(urls, count))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MirrorError::Oracle(format!(
                "netselect exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("netselect output:\n{}", stdout);
        parse_output(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scores_and_skips_noise() -> Result<()> {
        let out = "Running netselect to choose 3 out of 4 addresses.\n\
                   ....\n\
                   \x20  123 http://a.org/gentoo/\n\
                   \x20  456 ftp://b.org/gentoo/\n\
                   9999 http://dead.org/\n\
                   garbage line\n";
        assert_eq!(
            parse_output(out)?,
            vec!["http://a.org/gentoo/", "ftp://b.org/gentoo/"]
        );
        Ok(())
    }

    #[test]
    fn args_carry_count_and_family() {
        let oracle = NetselectOracle::new("netselect", AddressFamily::V6);
        let urls = vec!["http://a.org/".to_string()];
        assert_eq!(oracle.args(&urls, 3), vec!["-s3", "-6", "http://a.org/"]);
    }

    #[tokio::test]
    async fn missing_program_is_an_oracle_error() {
        let oracle = NetselectOracle::new("/nonexistent/netselect", AddressFamily::Either);
        let res = oracle.rank(&["http://a.org/".to_string()], 1).await;
        assert!(res.is_err());
    }
}
