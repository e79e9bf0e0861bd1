//! `git reflog` records

use serde::{Deserialize, Serialize};

use super::records::split_records;

/// `--format` for [`parse_reflog`]: commit, selector, committer date, reflog subject.
pub const REFLOG_FORMAT: &str = "%H%x1f%gd%x1f%cI%x1f%gs%x1e";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflogEntry {
    pub hash: String,
    /// `HEAD@{N}`
    pub selector: String,
    pub date: String,
    /// Leading verb of the subject (`commit`, `checkout`, `reset`, ...)
    pub action: String,
    pub message: String,
}

pub fn parse_reflog(output: &str) -> Vec<ReflogEntry> {
    split_records(output, 4)
        .into_iter()
        .map(|fields| {
            let subject = fields[3];
            let (action, message) = match subject.split_once(": ") {
                Some((action, message)) => (action.to_string(), message.to_string()),
                None => (String::new(), subject.to_string()),
            };
            ReflogEntry {
                hash: fields[0].trim().to_string(),
                selector: fields[1].to_string(),
                date: fields[2].to_string(),
                action,
                message,
            }
        })
        .collect()
}
