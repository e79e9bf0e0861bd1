//! Branch listings
//!
//! [`parse_for_each_ref`] reads a delimited `git for-each-ref` format and is
//! the one operations use. [`parse_branch_verbose`] reads human `git branch
//! -vv` text and only exists as a fallback for output without delimiters.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::records::FIELD_SEPARATOR;

/// `--format` for [`parse_for_each_ref`]:
/// full refname, object id, HEAD marker, upstream, tracking annotation.
pub const BRANCH_FORMAT: &str =
    "%(refname)%1f%(objectname)%1f%(HEAD)%1f%(upstream:short)%1f%(upstream:track)";

static AHEAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"ahead (\d+)").unwrap());
static BEHIND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"behind (\d+)").unwrap());
static VERBOSE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<mark>[* +]) (?P<name>\(.*?\)|\S+)\s+(?P<hash>[0-9a-f]{4,})(?:\s+\[(?P<track>[^\]]*)\])?")
        .unwrap()
});

/// One local or remote-tracking branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Short name (`main`, `origin/main`)
    pub name: String,
    pub commit_hash: String,
    pub current: bool,
    pub upstream: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    /// Upstream configured but deleted on the remote
    pub upstream_gone: bool,
    /// Remote-tracking branch rather than a local one
    pub remote: bool,
}

fn tracking_counts(track: &str) -> (u32, u32) {
    let count = |re: &Regex| {
        re.captures(track)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(0)
    };
    (count(&AHEAD_RE), count(&BEHIND_RE))
}

/// Parse [`BRANCH_FORMAT`] output, one ref per line.
pub fn parse_for_each_ref(output: &str) -> Vec<BranchInfo> {
    let mut branches = Vec::new();

    for line in output.lines() {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() < 3 {
            continue;
        }

        let refname = fields[0].trim();
        let (name, remote) = if let Some(local) = refname.strip_prefix("refs/heads/") {
            (local, false)
        } else if let Some(remote) = refname.strip_prefix("refs/remotes/") {
            if remote.ends_with("/HEAD") {
                continue;
            }
            (remote, true)
        } else {
            (refname, false)
        };
        if name.is_empty() {
            continue;
        }

        let track = fields.get(4).copied().unwrap_or("");
        let (ahead, behind) = tracking_counts(track);
        let upstream = fields
            .get(3)
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        branches.push(BranchInfo {
            name: name.to_string(),
            commit_hash: fields[1].trim().to_string(),
            current: fields[2].trim() == "*",
            upstream,
            ahead,
            behind,
            upstream_gone: track.contains("gone"),
            remote,
        });
    }

    branches
}

/// Parse `git branch -vv` text. Kept for output that lacks the delimited
/// format; not extended.
pub fn parse_branch_verbose(output: &str) -> Vec<BranchInfo> {
    output
        .lines()
        .filter_map(|line| VERBOSE_LINE_RE.captures(line))
        .filter_map(|caps| {
            let name = caps.name("name")?.as_str();
            if name.starts_with('(') {
                // "(HEAD detached at abc1234)"
                return None;
            }
            let track = caps.name("track").map_or("", |m| m.as_str());
            let upstream = if track.is_empty() {
                None
            } else {
                Some(track.split(':').next().unwrap_or(track).trim().to_string())
            };
            let (ahead, behind) = tracking_counts(track);
            let remote = name.starts_with("remotes/");
            Some(BranchInfo {
                name: name.strip_prefix("remotes/").unwrap_or(name).to_string(),
                commit_hash: caps["hash"].to_string(),
                current: &caps["mark"] == "*",
                upstream,
                ahead,
                behind,
                upstream_gone: track.ends_with(": gone"),
                remote,
            })
        })
        .collect()
}
