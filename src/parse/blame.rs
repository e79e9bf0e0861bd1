//! `git blame --porcelain` parser

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Attribution of one line of the final file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameLine {
    /// 1-based line number in the blamed revision
    pub line_number: u32,
    pub hash: String,
    pub author: String,
    pub author_email: String,
    /// Author time as RFC 3339 in the author's zone; empty if git omitted it
    pub date: String,
    pub summary: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
struct CommitMeta {
    author: String,
    author_email: String,
    author_time: Option<i64>,
    author_tz: Option<String>,
    summary: String,
}

impl CommitMeta {
    fn date(&self) -> String {
        let Some(time) = self.author_time else {
            return String::new();
        };
        let offset = self
            .author_tz
            .as_deref()
            .and_then(parse_tz)
            .or_else(|| FixedOffset::east_opt(0));
        match (DateTime::from_timestamp(time, 0), offset) {
            (Some(utc), Some(offset)) => utc.with_timezone(&offset).to_rfc3339(),
            _ => String::new(),
        }
    }
}

/// `+0130` / `-0800` to a fixed offset.
fn parse_tz(tz: &str) -> Option<FixedOffset> {
    let sign = match tz.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits = tz.get(1..5)?;
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4)?.parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn is_header(line: &str) -> Option<(&str, u32)> {
    let mut parts = line.split(' ');
    let hash = parts.next()?;
    if hash.len() < 40 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let _original = parts.next()?;
    let final_line = parts.next()?.parse().ok()?;
    Some((hash, final_line))
}

/// Parse porcelain output. Commit metadata is emitted once per commit, so
/// later lines from the same commit reuse it.
pub fn parse_blame(output: &str) -> Vec<BlameLine> {
    let mut metadata: HashMap<String, CommitMeta> = HashMap::new();
    let mut lines = Vec::new();
    let mut current: Option<(String, u32)> = None;

    for line in output.lines() {
        if let Some(content) = line.strip_prefix('\t') {
            if let Some((hash, line_number)) = current.take() {
                let meta = metadata.get(&hash).cloned().unwrap_or_default();
                lines.push(BlameLine {
                    line_number,
                    date: meta.date(),
                    author: meta.author,
                    author_email: meta.author_email,
                    summary: meta.summary,
                    hash,
                    content: content.to_string(),
                });
            }
            continue;
        }

        if let Some((hash, line_number)) = is_header(line) {
            metadata.entry(hash.to_string()).or_default();
            current = Some((hash.to_string(), line_number));
            continue;
        }

        let Some((hash, _)) = current.as_ref() else {
            continue;
        };
        let Some(meta) = metadata.get_mut(hash) else {
            continue;
        };
        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        match key {
            "author" => meta.author = value.to_string(),
            "author-mail" => {
                meta.author_email = value.trim_start_matches('<').trim_end_matches('>').to_string()
            }
            "author-time" => meta.author_time = value.parse().ok(),
            "author-tz" => meta.author_tz = Some(value.to_string()),
            "summary" => meta.summary = value.to_string(),
            _ => {}
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "1111111111111111111111111111111111111111";
    const HASH_B: &str = "2222222222222222222222222222222222222222";

    fn sample() -> String {
        format!(
            "{a} 1 1 2\nauthor Ada\nauthor-mail <ada@example.com>\nauthor-time 1700000000\nauthor-tz +0100\ncommitter Ada\nsummary Initial\nfilename src/lib.rs\n\tfn main() {{\n{a} 2 2\nfilename src/lib.rs\n\t}}\n{b} 3 3 1\nauthor Bob\nauthor-mail <bob@example.com>\nauthor-time 1700003600\nauthor-tz -0800\nsummary Tweak\nfilename src/lib.rs\n\t// tail\n",
            a = HASH_A,
            b = HASH_B
        )
    }

    #[test]
    fn test_metadata_reused_for_repeated_commit() {
        let lines = parse_blame(&sample());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].author, "Ada");
        assert_eq!(lines[0].content, "fn main() {");
        assert_eq!(lines[1].line_number, 2);
        assert_eq!(lines[1].author, "Ada");
        assert_eq!(lines[1].summary, "Initial");
        assert_eq!(lines[1].content, "}");
        assert_eq!(lines[2].hash, HASH_B);
        assert_eq!(lines[2].author_email, "bob@example.com");
    }

    #[test]
    fn test_dates_in_author_zone() {
        let lines = parse_blame(&sample());
        assert_eq!(lines[0].date, "2023-11-14T23:13:20+01:00");
        assert_eq!(lines[2].date, "2023-11-14T15:13:20-08:00");
    }

    #[test]
    fn test_parse_tz() {
        assert_eq!(parse_tz("+0530"), FixedOffset::east_opt(5 * 3600 + 30 * 60));
        assert_eq!(parse_tz("bogus"), None);
    }

    #[test]
    fn test_empty_blame() {
        assert!(parse_blame("").is_empty());
    }
}
