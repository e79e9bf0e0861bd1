//! Control-character delimited records
//!
//! Formats passed to `--format` end every record with `%x1e` and separate
//! fields with `%x1f`. Neither byte can occur in commit subjects, names or
//! ref names, so no escaping is needed.

/// Record separator (ASCII RS)
pub const RECORD_SEPARATOR: char = '\x1e';
/// Field separator (ASCII US)
pub const FIELD_SEPARATOR: char = '\x1f';

/// Split `output` into records of at least `min_fields` fields.
///
/// Leading/trailing line breaks around each record (added by git between
/// entries) are stripped. Blank records and records with too few fields are
/// dropped.
pub fn split_records(output: &str, min_fields: usize) -> Vec<Vec<&str>> {
    output
        .split(RECORD_SEPARATOR)
        .map(|record| record.trim_matches(|c| c == '\n' || c == '\r'))
        .filter(|record| !record.is_empty())
        .map(|record| record.split(FIELD_SEPARATOR).collect::<Vec<_>>())
        .filter(|fields| fields.len() >= min_fields)
        .collect()
}
