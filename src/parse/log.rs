//! Commit log records (`git log`, `git show`)

use serde::{Deserialize, Serialize};

use super::records::split_records;

/// `--format` for [`parse_log`]: hash, author name, author email, ISO date, subject.
pub const LOG_FORMAT: &str = "%H%x1f%an%x1f%ae%x1f%aI%x1f%s%x1e";

/// `--format` for [`parse_show_header`]: the log fields plus parents and body.
pub const SHOW_FORMAT: &str = "%H%x1f%an%x1f%ae%x1f%aI%x1f%s%x1f%P%x1f%b%x1e";

const LOG_FIELDS: usize = 5;

/// One commit as seen by `git log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    /// Author date, strict ISO 8601
    pub date: String,
    pub subject: String,
}

impl CommitRecord {
    fn from_fields(fields: &[&str]) -> Self {
        Self {
            hash: fields[0].trim().to_string(),
            author_name: fields[1].to_string(),
            author_email: fields[2].to_string(),
            date: fields[3].to_string(),
            subject: fields[4].to_string(),
        }
    }

    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(7)]
    }
}

/// Parse [`LOG_FORMAT`] output in input order. Records with fewer than five
/// fields are dropped.
pub fn parse_log(output: &str) -> Vec<CommitRecord> {
    split_records(output, LOG_FIELDS)
        .iter()
        .map(|fields| CommitRecord::from_fields(fields))
        .collect()
}

/// Header part of `git show --format=SHOW_FORMAT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowHeader {
    pub commit: CommitRecord,
    pub parents: Vec<String>,
    pub body: String,
}

/// Split `git show` output into the commit header and whatever follows it
/// (stat or patch text). Returns `None` when no complete header is present.
pub fn parse_show_header(output: &str) -> Option<(ShowHeader, &str)> {
    let (header, rest) = output.split_once(super::records::RECORD_SEPARATOR)?;
    let fields: Vec<&str> = header
        .trim_start_matches(['\n', '\r'])
        .split(super::records::FIELD_SEPARATOR)
        .collect();
    if fields.len() < LOG_FIELDS {
        return None;
    }

    let parents = fields
        .get(5)
        .map(|p| p.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let body = fields
        .get(6)
        .map(|b| b.trim_end().to_string())
        .unwrap_or_default();

    Some((
        ShowHeader {
            commit: CommitRecord::from_fields(&fields),
            parents,
            body,
        },
        rest.trim_start_matches(['\n', '\r']),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str, subject: &str) -> String {
        format!(
            "{}\x1fAda Lovelace\x1fada@example.com\x1f2024-01-01T12:00:00+00:00\x1f{}\x1e\n",
            hash, subject
        )
    }

    #[test]
    fn test_two_records_in_order() {
        let output = format!("{}{}", record("aaa", "first"), record("bbb", "second"));
        let commits = parse_log(&output);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "aaa");
        assert_eq!(commits[0].subject, "first");
        assert_eq!(commits[1].hash, "bbb");
        assert_eq!(commits[1].author_email, "ada@example.com");
    }

    #[test]
    fn test_four_field_record_dropped() {
        let output = format!(
            "{}ccc\x1fBob\x1fbob@example.com\x1f2024-01-02\x1e",
            record("aaa", "kept")
        );
        let commits = parse_log(&output);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].subject, "kept");
    }

    #[test]
    fn test_subject_with_pipes_and_tabs() {
        let commits = parse_log(&record("abc", "fix | weird\tsubject"));
        assert_eq!(commits[0].subject, "fix | weird\tsubject");
    }

    #[test]
    fn test_empty_log() {
        assert!(parse_log("").is_empty());
    }

    #[test]
    fn test_short_hash() {
        let commits = parse_log(&record("0123456789abcdef", "s"));
        assert_eq!(commits[0].short_hash(), "0123456");
    }

    #[test]
    fn test_show_header_and_rest() {
        let output = "abc\x1fAda\x1fada@example.com\x1f2024-01-01T00:00:00Z\x1fSubject\x1fp1 p2\x1fBody line\n\x1e\n\n a.txt | 2 +-\n 1 file changed, 1 insertion(+), 1 deletion(-)\n";
        let (header, rest) = parse_show_header(output).unwrap();
        assert_eq!(header.commit.subject, "Subject");
        assert_eq!(header.parents, vec!["p1", "p2"]);
        assert_eq!(header.body, "Body line");
        assert!(rest.starts_with(" a.txt"));
    }

    #[test]
    fn test_show_header_missing() {
        assert!(parse_show_header("").is_none());
        assert!(parse_show_header("a\x1fb\x1e").is_none());
    }
}
