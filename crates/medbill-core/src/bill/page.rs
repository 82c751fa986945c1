//! Page type classification.

use crate::models::bill::PageType;

use super::patterns::{FINAL_BILL_KEYWORDS, PHARMACY_KEYWORDS};

/// Guess a page's type from its lines.
///
/// Pharmacy keywords win over final-bill keywords when both appear.
pub fn classify_page<S: AsRef<str>>(lines: &[S]) -> PageType {
    let text = lines
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if PHARMACY_KEYWORDS.iter().any(|k| text.contains(k)) {
        PageType::Pharmacy
    } else if FINAL_BILL_KEYWORDS.iter().any(|k| text.contains(k)) {
        PageType::FinalBill
    } else {
        PageType::BillDetail
    }
}
