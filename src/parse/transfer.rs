//! Ref updates reported by `git push --porcelain` and `git fetch`

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static FETCH_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ (?P<flag>[ +\-*!=t]) (?P<summary>\[[^\]]+\]|\S+)\s+(?P<from>\S+)\s+->\s+(?P<to>\S+)")
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefUpdateKind {
    FastForward,
    Forced,
    Deleted,
    New,
    Rejected,
    UpToDate,
    TagUpdate,
}

impl RefUpdateKind {
    fn from_flag(flag: char) -> Option<Self> {
        Some(match flag {
            ' ' => Self::FastForward,
            '+' => Self::Forced,
            '-' => Self::Deleted,
            '*' => Self::New,
            '!' => Self::Rejected,
            '=' => Self::UpToDate,
            't' => Self::TagUpdate,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdate {
    pub kind: RefUpdateKind,
    pub from: String,
    pub to: String,
    /// `abc..def`, `[new branch]`, `[rejected] (non-fast-forward)`, ...
    pub summary: String,
}

/// Parse `flag \t from:to \t summary` lines from `git push --porcelain`.
pub fn parse_push_porcelain(output: &str) -> Vec<RefUpdate> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            let flag = fields.next()?;
            let refs = fields.next()?;
            let summary = fields.next().unwrap_or("");
            let mut flag_chars = flag.chars();
            let kind = RefUpdateKind::from_flag(flag_chars.next()?)?;
            if flag_chars.next().is_some() {
                return None;
            }
            let (from, to) = refs.split_once(':').unwrap_or((refs, refs));
            Some(RefUpdate {
                kind,
                from: from.to_string(),
                to: to.to_string(),
                summary: summary.trim().to_string(),
            })
        })
        .collect()
}

/// Parse the ref-update lines `git fetch` (and `pull`) print on stderr.
pub fn parse_fetch_updates(output: &str) -> Vec<RefUpdate> {
    output
        .lines()
        .filter_map(|line| FETCH_LINE_RE.captures(line))
        .filter_map(|caps| {
            let kind = RefUpdateKind::from_flag(caps["flag"].chars().next()?)?;
            Some(RefUpdate {
                kind,
                from: caps["from"].to_string(),
                to: caps["to"].to_string(),
                summary: caps["summary"].to_string(),
            })
        })
        .collect()
}
