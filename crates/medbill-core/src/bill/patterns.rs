//! Keyword sets and regex patterns for bill line parsing.

use lazy_static::lazy_static;
use regex::Regex;

/// Phrases marking a total/summary line.
pub const SUMMARY_KEYWORDS: &[&str] = &[
    "total",
    "sub total",
    "subtotal",
    "grand total",
    "net total",
    "round off",
    "roundoff",
];

/// Phrases marking a pharmacy page. Checked first.
pub const PHARMACY_KEYWORDS: &[&str] = &["pharmacy", "medicine", "tablet"];

/// Phrases marking a final bill page.
pub const FINAL_BILL_KEYWORDS: &[&str] = &["final bill", "bill summary", "grand total"];

/// Characters stripped from both ends of an item name.
pub const NAME_TRIM_CHARS: &[char] = &[' ', '-', ':', '\t'];

lazy_static! {
    // Optional sign, integer part, optional fraction
    pub static ref NUMBER: Regex = Regex::new(
        r"-?\d+(?:\.\d+)?"
    ).unwrap();
}
