//! Bill data models and the extraction response schema.

use serde::{Deserialize, Serialize};

/// Placeholder name used when a line yields no text before its first number.
pub const PLACEHOLDER_NAME: &str = "ITEM";

/// A single billable line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    /// Item description as it appears on the bill. Never empty.
    #[serde(rename = "item_name")]
    pub name: String,

    /// Quantity (0 when the line carries no quantity column).
    #[serde(rename = "item_quantity")]
    pub quantity: f64,

    /// Per-unit rate (0 when the line carries no rate column).
    #[serde(rename = "item_rate")]
    pub rate: f64,

    /// Line amount.
    #[serde(rename = "item_amount")]
    pub amount: f64,
}

impl BillItem {
    /// Create an item, substituting the placeholder for a blank name.
    pub fn new(name: impl Into<String>, quantity: f64, rate: f64, amount: f64) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            PLACEHOLDER_NAME.to_string()
        } else {
            name
        };
        Self {
            name,
            quantity,
            rate,
            amount,
        }
    }
}

/// Page type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PageType {
    /// Itemized charges (the fallback type).
    #[default]
    #[serde(rename = "Bill Detail")]
    BillDetail,

    /// Final summary of all charges.
    #[serde(rename = "Final Bill")]
    FinalBill,

    /// Medicine / drug bill.
    #[serde(rename = "Pharmacy")]
    Pharmacy,
}

impl PageType {
    /// Label as it appears in responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::BillDetail => "Bill Detail",
            PageType::FinalBill => "Final Bill",
            PageType::Pharmacy => "Pharmacy",
        }
    }

    /// Map a free-form label onto a page type.
    ///
    /// The trimmed, lowercased label is searched for "bill detail",
    /// "final bill" and "pharmacy" in that order; anything else is
    /// `BillDetail`.
    pub fn normalize(raw: &str) -> Self {
        let s = raw.trim().to_lowercase();
        if s.contains("bill detail") {
            PageType::BillDetail
        } else if s.contains("final bill") {
            PageType::FinalBill
        } else if s.contains("pharmacy") {
            PageType::Pharmacy
        } else {
            PageType::BillDetail
        }
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Items extracted from one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-based page number, stringified.
    pub page_no: String,

    /// Page type tag.
    pub page_type: PageType,

    /// Items in source line order.
    pub bill_items: Vec<BillItem>,
}

/// LLM token usage, summed over all calls for a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.total_tokens += rhs.total_tokens;
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

/// Request body of the extraction endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    /// URL of the bill document.
    pub document: String,
}

/// Response body of the extraction endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub is_success: bool,
    pub token_usage: TokenUsage,
    pub data: ExtractResponseData,
}

/// Page-wise items plus their total count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponseData {
    pub pagewise_line_items: Vec<PageResult>,
    pub total_item_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blank_name_becomes_placeholder() {
        assert_eq!(BillItem::new("  ", 1.0, 2.0, 2.0).name, "ITEM");
        assert_eq!(BillItem::new("X-Ray", 1.0, 2.0, 2.0).name, "X-Ray");
    }

    #[test]
    fn test_page_type_normalize() {
        assert_eq!(PageType::normalize(" PHARMACY "), PageType::Pharmacy);
        assert_eq!(PageType::normalize("Final Bill"), PageType::FinalBill);
        assert_eq!(PageType::normalize("final bill / pharmacy"), PageType::FinalBill);
        assert_eq!(PageType::normalize("invoice"), PageType::BillDetail);
        assert_eq!(PageType::normalize(""), PageType::BillDetail);
    }

    #[test]
    fn test_item_serializes_with_item_prefix() {
        let item = BillItem::new("Paracetamol", 2.0, 10.5, 21.0);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["item_name"], "Paracetamol");
        assert_eq!(json["item_quantity"], 2.0);
        assert_eq!(json["item_rate"], 10.5);
        assert_eq!(json["item_amount"], 21.0);
    }

    #[test]
    fn test_page_type_serializes_as_label() {
        let json = serde_json::to_string(&PageType::FinalBill).unwrap();
        assert_eq!(json, "\"Final Bill\"");
        let back: PageType = serde_json::from_str("\"Pharmacy\"").unwrap();
        assert_eq!(back, PageType::Pharmacy);
    }

    #[test]
    fn test_token_usage_add_assign() {
        let mut total = TokenUsage::default();
        total += TokenUsage {
            total_tokens: 30,
            input_tokens: 20,
            output_tokens: 10,
        };
        total += TokenUsage {
            total_tokens: 5,
            input_tokens: 3,
            output_tokens: 2,
        };
        assert_eq!(total.total_tokens, 35);
        assert_eq!(total.input_tokens, 23);
        assert_eq!(total.output_tokens, 12);
    }
}
