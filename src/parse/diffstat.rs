//! `--stat` output parser (diff, show, merge, pull, commit)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static FILE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(.+?)\s+\|\s+(\d+)\s*([+-]*)\s*$").unwrap());
static BINARY_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(.+?)\s+\|\s+Bin\b").unwrap());
static FILES_CHANGED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) files? changed").unwrap());
static INSERTIONS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) insertions?\(\+\)").unwrap());
static DELETIONS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) deletions?\(-\)").unwrap());

/// Per-file line counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub path: String,
    pub additions: u32,
    pub deletions: u32,
    pub binary: bool,
}

/// Whole-diff statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStat {
    pub files: Vec<FileStat>,
    pub files_changed: u32,
    pub additions: u32,
    pub deletions: u32,
}

impl DiffStat {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.files_changed == 0
    }
}

/// Totals from a `N files changed, M insertions(+), K deletions(-)` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatSummary {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

/// Parse a summary line; `None` if the line is not one.
pub fn parse_summary_line(line: &str) -> Option<StatSummary> {
    let files_changed = capture_u32(&FILES_CHANGED_RE, line)?;
    Some(StatSummary {
        files_changed,
        insertions: capture_u32(&INSERTIONS_RE, line).unwrap_or(0),
        deletions: capture_u32(&DELETIONS_RE, line).unwrap_or(0),
    })
}

fn capture_u32(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Parse stat lines.
///
/// Per-file counts come from the `+`/`-` graph characters. When a summary
/// line is present its totals replace the per-file sums, since the graph is
/// scaled for wide changes.
pub fn parse_diff_stat(output: &str) -> DiffStat {
    let mut stat = DiffStat::default();
    let mut summary = None;

    for line in output.lines() {
        if let Some(found) = parse_summary_line(line) {
            summary = Some(found);
            continue;
        }

        if let Some(caps) = FILE_LINE_RE.captures(line) {
            let graph = caps.get(3).map_or("", |m| m.as_str());
            stat.files.push(FileStat {
                path: caps[1].to_string(),
                additions: graph.chars().filter(|c| *c == '+').count() as u32,
                deletions: graph.chars().filter(|c| *c == '-').count() as u32,
                binary: false,
            });
        } else if let Some(caps) = BINARY_LINE_RE.captures(line) {
            stat.files.push(FileStat {
                path: caps[1].to_string(),
                additions: 0,
                deletions: 0,
                binary: true,
            });
        }
    }

    match summary {
        Some(summary) => {
            stat.files_changed = summary.files_changed;
            stat.additions = summary.insertions;
            stat.deletions = summary.deletions;
        }
        None => {
            stat.files_changed = stat.files.len() as u32;
            stat.additions = stat.files.iter().map(|f| f.additions).sum();
            stat.deletions = stat.files.iter().map(|f| f.deletions).sum();
        }
    }

    stat
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_file_counts_graph_chars() {
        let stat = parse_diff_stat(" a.txt | 3 ++-");
        assert_eq!(
            stat.files,
            vec![FileStat {
                path: "a.txt".to_string(),
                additions: 2,
                deletions: 1,
                binary: false,
            }]
        );
        assert_eq!(stat.additions, 2);
        assert_eq!(stat.deletions, 1);
        assert_eq!(stat.files_changed, 1);
    }

    #[test]
    fn test_summary_overrides_per_file_sum() {
        let stat = parse_diff_stat(" a.txt | 3 ++-\n 1 file changed, 10 insertions(+), 4 deletions(-)\n");
        assert_eq!(stat.files.len(), 1);
        assert_eq!(stat.additions, 10);
        assert_eq!(stat.deletions, 4);
    }

    #[test]
    fn test_summary_with_only_insertions() {
        let summary = parse_summary_line(" 2 files changed, 5 insertions(+)").unwrap();
        assert_eq!(summary.files_changed, 2);
        assert_eq!(summary.insertions, 5);
        assert_eq!(summary.deletions, 0);
    }

    #[test]
    fn test_binary_and_rename_lines() {
        let output = " img.png          | Bin 0 -> 1024 bytes\n src/{a.rs => b.rs} | 0\n";
        let stat = parse_diff_stat(output);
        assert_eq!(stat.files.len(), 2);
        assert!(stat.files[0].binary);
        assert_eq!(stat.files[0].path, "img.png");
        assert_eq!(stat.files[1].path, "src/{a.rs => b.rs}");
        assert_eq!(stat.files[1].additions, 0);
    }

    #[test]
    fn test_path_with_spaces() {
        let stat = parse_diff_stat(" docs/my file.md | 1 +\n");
        assert_eq!(stat.files[0].path, "docs/my file.md");
    }

    #[test]
    fn test_empty_and_garbage() {
        assert_eq!(parse_diff_stat(""), DiffStat::default());
        assert!(parse_diff_stat("Fast-forward\nUpdating abc..def\n").is_empty());
    }
}
