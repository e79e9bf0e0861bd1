//! `git worktree list --porcelain` parser

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One linked or main worktree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    /// `None` for bare repositories
    pub head: Option<String>,
    /// Short branch name; `None` when detached or bare
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
    pub locked: bool,
    pub lock_reason: Option<String>,
    pub prunable: bool,
}

/// Parse porcelain blocks. Attribute lines before the first `worktree` line
/// are ignored.
pub fn parse_worktrees(output: &str) -> Vec<WorktreeInfo> {
    let mut worktrees = Vec::new();
    let mut current: Option<WorktreeInfo> = None;

    for line in output.lines() {
        let (key, value) = match line.split_once(' ') {
            Some((key, value)) => (key, Some(value)),
            None => (line, None),
        };

        if key == "worktree" {
            if let Some(done) = current.take() {
                worktrees.push(done);
            }
            current = value.map(|path| WorktreeInfo {
                path: PathBuf::from(path),
                ..WorktreeInfo::default()
            });
            continue;
        }

        let Some(worktree) = current.as_mut() else {
            continue;
        };
        match key {
            "HEAD" => worktree.head = value.map(str::to_string),
            "branch" => {
                worktree.branch = value.map(|b| b.strip_prefix("refs/heads/").unwrap_or(b).to_string())
            }
            "bare" => worktree.bare = true,
            "detached" => worktree.detached = true,
            "locked" => {
                worktree.locked = true;
                worktree.lock_reason = value.filter(|r| !r.is_empty()).map(str::to_string);
            }
            "prunable" => worktree.prunable = true,
            _ => {}
        }
    }

    if let Some(done) = current {
        worktrees.push(done);
    }
    worktrees
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_main_and_linked() {
        let output = r#"worktree /home/user/project
HEAD abc123def456
branch refs/heads/main

worktree /home/user/project-wt
HEAD def789abc123
branch refs/heads/feature/auth

"#;

        let worktrees = parse_worktrees(output);
        assert_eq!(worktrees.len(), 2);
        assert_eq!(worktrees[0].path, PathBuf::from("/home/user/project"));
        assert_eq!(worktrees[0].branch.as_deref(), Some("main"));
        assert_eq!(worktrees[1].head.as_deref(), Some("def789abc123"));
        assert_eq!(worktrees[1].branch.as_deref(), Some("feature/auth"));
    }

    #[test]
    fn test_bare_detached_locked_prunable() {
        let output = "worktree /srv/repo.git\nbare\n\nworktree /tmp/wt1\nHEAD 111\ndetached\nlocked on usb drive\n\nworktree /tmp/wt2\nHEAD 222\nbranch refs/heads/x\nlocked\nprunable gitdir file points to non-existent location\n";
        let worktrees = parse_worktrees(output);
        assert_eq!(worktrees.len(), 3);
        assert!(worktrees[0].bare);
        assert_eq!(worktrees[0].head, None);
        assert!(worktrees[1].detached);
        assert_eq!(worktrees[1].branch, None);
        assert_eq!(worktrees[1].lock_reason.as_deref(), Some("on usb drive"));
        assert!(worktrees[2].locked);
        assert_eq!(worktrees[2].lock_reason, None);
        assert!(worktrees[2].prunable);
    }

    #[test]
    fn test_path_with_spaces_and_stray_lines() {
        let worktrees = parse_worktrees("HEAD orphan\nworktree /tmp/my repo\nHEAD 1\n");
        assert_eq!(worktrees.len(), 1);
        assert_eq!(worktrees[0].path, PathBuf::from("/tmp/my repo"));
    }

    #[test]
    fn test_empty() {
        assert!(parse_worktrees("").is_empty());
    }
}
