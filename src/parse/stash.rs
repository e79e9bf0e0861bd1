//! `git stash list` records

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::records::split_records;

/// `--format` for [`parse_stash_list`]: selector, commit, reflog subject.
pub const STASH_FORMAT: &str = "%gd%x1f%H%x1f%gs%x1e";

static SELECTOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\d+)\}").unwrap());
static SUBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:WIP on|On) ([^:]+): (.*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashEntry {
    pub index: u32,
    /// `stash@{N}`
    pub reference: String,
    pub hash: String,
    /// Branch the stash was taken on, when git recorded one
    pub branch: Option<String>,
    pub message: String,
}

pub fn parse_stash_list(output: &str) -> Vec<StashEntry> {
    split_records(output, 3)
        .into_iter()
        .enumerate()
        .map(|(position, fields)| {
            let reference = fields[0].trim().to_string();
            let index = SELECTOR_RE
                .captures(&reference)
                .and_then(|c| c[1].parse().ok())
                .unwrap_or(position as u32);
            let subject = fields[2];
            let (branch, message) = match SUBJECT_RE.captures(subject) {
                Some(caps) => (Some(caps[1].to_string()), caps[2].to_string()),
                None => (None, subject.to_string()),
            };
            StashEntry {
                index,
                reference,
                hash: fields[1].trim().to_string(),
                branch,
                message,
            }
        })
        .collect()
}
