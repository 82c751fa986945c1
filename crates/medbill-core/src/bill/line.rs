//! Heuristic decomposition of a single bill line into an item.

use tracing::trace;

use crate::models::bill::{BillItem, PLACEHOLDER_NAME};

use super::patterns::{NAME_TRIM_CHARS, NUMBER};
use super::summary::is_summary_line;

/// Parse one line into a bill item.
///
/// Returns `None` for lines that are not items: blank lines, summary lines,
/// lines lacking either a digit or a letter, and lines with a number that
/// does not parse as `f64`.
///
/// Numbers are assigned from the end of the line: the last is the amount;
/// with three or more, the two before it are quantity and rate (earlier
/// numbers are dropped); with exactly two, the first is the quantity. The
/// name is whatever precedes the first number.
pub fn parse_line(line: &str) -> Option<BillItem> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if is_summary_line(line) {
        trace!("skipping summary line: {}", line);
        return None;
    }

    if !line.chars().any(char::is_numeric) || !line.chars().any(char::is_alphabetic) {
        return None;
    }

    let matches: Vec<_> = NUMBER.find_iter(line).collect();
    let first = matches.first()?;

    let numbers = matches
        .iter()
        .map(|m| m.as_str().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .ok()?;

    let amount = *numbers.last()?;
    let (quantity, rate) = match numbers.len() {
        n if n >= 3 => (numbers[n - 3], numbers[n - 2]),
        2 => (numbers[0], 0.0),
        _ => (0.0, 0.0),
    };

    let name = line[..first.start()].trim_matches(NAME_TRIM_CHARS);
    let name = if name.is_empty() { PLACEHOLDER_NAME } else { name };

    Some(BillItem {
        name: name.to_string(),
        quantity,
        rate,
        amount,
    })
}
