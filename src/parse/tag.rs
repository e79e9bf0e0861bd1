//! `git tag --list` parser

/// One tag name per non-empty line, surrounding whitespace trimmed.
pub fn parse_tags(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
