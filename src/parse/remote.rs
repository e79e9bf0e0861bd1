//! `git remote -v` parser

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static REMOTE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)\s+(\S+)\s+\((fetch|push)\)").unwrap());

/// A configured remote with its fetch and push URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInfo {
    pub name: String,
    pub fetch_url: Option<String>,
    pub push_url: Option<String>,
}

/// Fold `name url (fetch|push)` lines into one entry per remote, in order of
/// first appearance.
pub fn parse_remotes(output: &str) -> Vec<RemoteInfo> {
    let mut remotes: Vec<RemoteInfo> = Vec::new();

    for caps in output.lines().filter_map(|line| REMOTE_LINE_RE.captures(line)) {
        let name = &caps[1];
        let url = caps[2].to_string();
        let index = match remotes.iter().position(|r| r.name == name) {
            Some(index) => index,
            None => {
                remotes.push(RemoteInfo {
                    name: name.to_string(),
                    ..RemoteInfo::default()
                });
                remotes.len() - 1
            }
        };
        let remote = &mut remotes[index];
        if &caps[3] == "fetch" {
            remote.fetch_url = Some(url);
        } else {
            remote.push_url = Some(url);
        }
    }

    remotes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_and_push_folded() {
        let output = "origin\thttps://example.com/a.git (fetch)\norigin\thttps://example.com/a.git (push)\nupstream\tgit@example.com:b.git (fetch)\nupstream\tno_push (push)\n";
        let remotes = parse_remotes(output);
        assert_eq!(remotes.len(), 2);
        assert_eq!(remotes[0].name, "origin");
        assert_eq!(remotes[0].fetch_url.as_deref(), Some("https://example.com/a.git"));
        assert_eq!(remotes[0].push_url.as_deref(), Some("https://example.com/a.git"));
        assert_eq!(remotes[1].fetch_url.as_deref(), Some("git@example.com:b.git"));
        assert_eq!(remotes[1].push_url.as_deref(), Some("no_push"));
    }

    #[test]
    fn test_no_remotes() {
        assert!(parse_remotes("").is_empty());
        assert!(parse_remotes("origin\n").is_empty());
    }
}
