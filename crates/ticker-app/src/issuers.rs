//! Issuer list files: one account id per line.

use crate::error::AppResult;
use std::collections::HashSet;
use std::path::Path;

/// Read issuers from `path`, ignoring blank lines and keeping the first
/// occurrence of each.
pub fn read_issuers(path: impl AsRef<Path>) -> AppResult<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_issuers(&content))
}

pub fn parse_issuers(content: &str) -> Vec<String> {
    dedup(
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string),
    )
}

/// Drop repeats, preserving first-seen order.
pub fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_and_duplicates() {
        let content = "GAAA\n\n  GBBB  \nGAAA\r\n\nGCCC\n";
        assert_eq!(parse_issuers(content), vec!["GAAA", "GBBB", "GCCC"]);
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issuers.txt");
        std::fs::write(&path, "GX\nGY\nGX\n").unwrap();
        assert_eq!(read_issuers(&path).unwrap(), vec!["GX", "GY"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(read_issuers("/nonexistent/issuers.txt").is_err());
    }
}
