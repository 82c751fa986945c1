//! Summary-line detection.

use super::patterns::SUMMARY_KEYWORDS;

/// Whether a line is a total/summary line rather than a billable item.
///
/// Case-insensitive, unanchored substring match against the summary
/// keywords. A word that merely contains a keyword ("Subtotalin") matches
/// too.
pub fn is_summary_line(line: &str) -> bool {
    let low = line.to_lowercase();
    SUMMARY_KEYWORDS.iter().any(|k| low.contains(k))
}
