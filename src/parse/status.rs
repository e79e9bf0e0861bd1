//! `git status --porcelain=v2 --branch` parser

use serde::{Deserialize, Serialize};

/// Paths grouped by kind of change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    /// Rendered as `"old -> new"`
    pub renamed: Vec<String>,
    pub copied: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.modified.is_empty()
            && self.deleted.is_empty()
            && self.renamed.is_empty()
            && self.copied.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len() + self.renamed.len() + self.copied.len()
    }

    /// File one status letter under `path`. Unknown letters and `.` are ignored.
    pub(crate) fn record(&mut self, code: char, path: &str) {
        let bucket = match code {
            'A' => &mut self.added,
            'M' | 'T' => &mut self.modified,
            'D' => &mut self.deleted,
            'R' => &mut self.renamed,
            'C' => &mut self.copied,
            _ => return,
        };
        bucket.push(path.to_string());
    }
}

/// Working tree state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    /// `None` when HEAD is detached
    pub current_branch: Option<String>,
    /// `None` before the first commit
    pub head_commit: Option<String>,
    pub upstream: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    pub staged_changes: ChangeSet,
    pub unstaged_changes: ChangeSet,
    pub untracked_files: Vec<String>,
    pub conflicted_files: Vec<String>,
    pub is_clean: bool,
}

/// Parse porcelain v2 output. Never fails; unknown lines are skipped.
pub fn parse_status(output: &str) -> StatusResult {
    let mut result = StatusResult::default();
    let mut dirty = false;

    for line in output.lines() {
        if let Some(header) = line.strip_prefix("# ") {
            parse_header(header, &mut result);
            continue;
        }

        let mut chars = line.chars();
        let tag = chars.next();
        match tag {
            Some('1') => {
                // 1 <XY> <sub> <mH> <mI> <mW> <hH> <hI> <path>
                let parts: Vec<&str> = line.splitn(9, ' ').collect();
                if parts.len() < 3 {
                    continue;
                }
                let path = parts[parts.len() - 1];
                record_xy(&mut result, parts[1], path);
                dirty = true;
            }
            Some('2') => {
                // 2 <XY> <sub> <mH> <mI> <mW> <hH> <hI> <Xscore> <path>\t<origPath>
                let parts: Vec<&str> = line.splitn(10, ' ').collect();
                if parts.len() < 3 {
                    continue;
                }
                let paths = parts[parts.len() - 1];
                let rendered = match paths.split_once('\t') {
                    Some((new, old)) => format!("{} -> {}", old, new),
                    None => paths.to_string(),
                };
                record_xy(&mut result, parts[1], &rendered);
                dirty = true;
            }
            Some('u') => {
                // u <XY> <sub> <m1> <m2> <m3> <mW> <h1> <h2> <h3> <path>
                let parts: Vec<&str> = line.splitn(11, ' ').collect();
                if parts.len() < 3 {
                    continue;
                }
                result
                    .conflicted_files
                    .push(parts[parts.len() - 1].to_string());
                dirty = true;
            }
            Some('?') => {
                if let Some(path) = line.get(2..).filter(|p| !p.is_empty()) {
                    result.untracked_files.push(path.to_string());
                    dirty = true;
                }
            }
            _ => {}
        }
    }

    result.is_clean = !dirty
        && result.staged_changes.is_empty()
        && result.unstaged_changes.is_empty()
        && result.untracked_files.is_empty()
        && result.conflicted_files.is_empty();
    result
}

fn parse_header(header: &str, result: &mut StatusResult) {
    if let Some(head) = header.strip_prefix("branch.head ") {
        result.current_branch = match head.trim() {
            "(detached)" | "" => None,
            name => Some(name.to_string()),
        };
    } else if let Some(oid) = header.strip_prefix("branch.oid ") {
        result.head_commit = match oid.trim() {
            "(initial)" | "" => None,
            oid => Some(oid.to_string()),
        };
    } else if let Some(upstream) = header.strip_prefix("branch.upstream ") {
        result.upstream = Some(upstream.trim().to_string());
    } else if let Some(ab) = header.strip_prefix("branch.ab ") {
        for part in ab.split_whitespace() {
            if let Some(n) = part.strip_prefix('+') {
                result.ahead = n.parse().unwrap_or(0);
            } else if let Some(n) = part.strip_prefix('-') {
                result.behind = n.parse().unwrap_or(0);
            }
        }
    }
}

/// X is the index (staged) state, Y the worktree (unstaged) state.
fn record_xy(result: &mut StatusResult, xy: &str, path: &str) {
    let mut codes = xy.chars();
    if let Some(x) = codes.next() {
        result.staged_changes.record(x, path);
    }
    if let Some(y) = codes.next() {
        result.unstaged_changes.record(y, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_clean_default() {
        let status = parse_status("");
        assert!(status.is_clean);
        assert_eq!(status.current_branch, None);
        assert!(status.untracked_files.is_empty());
    }

    #[test]
    fn test_branch_header_only_is_clean() {
        let status = parse_status("# branch.head main\n");
        assert_eq!(status.current_branch.as_deref(), Some("main"));
        assert!(status.is_clean);
        assert!(status.untracked_files.is_empty());
        assert!(status.conflicted_files.is_empty());
    }

    #[test]
    fn test_full_headers() {
        let output = "# branch.oid 1234567890abcdef1234567890abcdef12345678\n# branch.head feature\n# branch.upstream origin/feature\n# branch.ab +3 -1\n";
        let status = parse_status(output);
        assert_eq!(status.current_branch.as_deref(), Some("feature"));
        assert_eq!(
            status.head_commit.as_deref(),
            Some("1234567890abcdef1234567890abcdef12345678")
        );
        assert_eq!(status.upstream.as_deref(), Some("origin/feature"));
        assert_eq!(status.ahead, 3);
        assert_eq!(status.behind, 1);
        assert!(status.is_clean);
    }

    #[test]
    fn test_detached_and_initial() {
        let status = parse_status("# branch.oid (initial)\n# branch.head (detached)\n");
        assert_eq!(status.current_branch, None);
        assert_eq!(status.head_commit, None);
    }

    #[test]
    fn test_worktree_modification_is_unstaged() {
        let status = parse_status("# branch.head main\n1 .M N... 100644 100644 100644 abc abc path/a.txt\n");
        assert_eq!(status.unstaged_changes.modified, vec!["path/a.txt"]);
        assert_eq!(status.unstaged_changes.len(), 1);
        assert!(status.staged_changes.is_empty());
        assert!(!status.is_clean);
    }

    #[test]
    fn test_abbreviated_entry_line() {
        let status = parse_status("1 M. N... ... ... ... ... path/a.txt");
        assert_eq!(status.staged_changes.modified, vec!["path/a.txt"]);
        assert_eq!(status.staged_changes.len() + status.unstaged_changes.len(), 1);
        assert!(!status.is_clean);
    }

    #[test]
    fn test_codes_applied_independently() {
        let status = parse_status("1 AM N... 000000 100644 100644 0000 abcd new file.txt\n");
        assert_eq!(status.staged_changes.added, vec!["new file.txt"]);
        assert_eq!(status.unstaged_changes.modified, vec!["new file.txt"]);
    }

    #[test]
    fn test_rename_entry() {
        let status = parse_status("2 R. N... 100644 100644 100644 abc abc R100 new.rs\told.rs\n");
        assert_eq!(status.staged_changes.renamed, vec!["old.rs -> new.rs"]);
    }

    #[test]
    fn test_unmerged_and_untracked() {
        let output = "u UU N... 100644 100644 100644 100644 a b c conflicted.txt\n? notes.md\n! ignored.log\n";
        let status = parse_status(output);
        assert_eq!(status.conflicted_files, vec!["conflicted.txt"]);
        assert_eq!(status.untracked_files, vec!["notes.md"]);
        assert!(!status.is_clean);
    }

    #[test]
    fn test_deleted_and_type_change() {
        let status = parse_status("1 D. N... 100644 000000 000000 abc 000 gone.txt\n1 .T N... 100644 100644 120000 abc abc link\n");
        assert_eq!(status.staged_changes.deleted, vec!["gone.txt"]);
        assert_eq!(status.unstaged_changes.modified, vec!["link"]);
    }

    #[test]
    fn test_garbage_lines_ignored() {
        let status = parse_status("1\nnonsense\n2 \n\n");
        assert!(status.staged_changes.is_empty());
        assert!(status.is_clean);
    }
}
