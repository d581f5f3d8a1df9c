//! Label discovery: find catalog accession numbers and their descriptions.
//!
//! A label is an accession number such as `1998.5.12a` followed by whatever
//! free text shares its line, e.g. `1998.5.12a Ceramic bowl, glazed`. The
//! description stops at the end of the line or where the next accession
//! number on the same line begins, so a run-together line such as
//! `1998.5.12a Bowl 2001.3.4 Vase` still yields two labels.
//!
//! Order matters downstream: pairing is positional, so labels are returned
//! in the order they first appear, with later duplicates dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// `<4 digits>.<1-3 digits>.<1-3 digits>[a-z][word/hyphen chars]`
static ACCESSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}\.\d{1,3}\.\d{1,3}[a-z]?[\w-]*").expect("valid regex"));

/// Extract the ordered, de-duplicated labels from document text.
///
/// Returns an empty vector when nothing matches.
pub fn extract_labels(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels = Vec::new();

    for line in text.lines() {
        let starts: Vec<usize> = ACCESSION_RE.find_iter(line).map(|m| m.start()).collect();

        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(line.len());
            let label = line[start..end].trim();
            if label.is_empty() {
                continue;
            }
            if seen.insert(label.to_string()) {
                labels.push(label.to_string());
            }
        }
    }

    labels
}
