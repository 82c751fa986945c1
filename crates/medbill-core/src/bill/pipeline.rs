//! Page-wise extraction: the heuristic pipeline and the extractor capability.

use std::future::Future;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::Result;
use crate::models::bill::{
    BillItem, ExtractResponse, ExtractResponseData, PageResult, PageType, TokenUsage,
};
use crate::models::config::{ExtractorKind, MedbillConfig};

#[cfg(feature = "remote")]
use crate::llm::LlmExtractor;

use super::line::parse_line;
use super::page::classify_page;

/// Page type and items extracted from one page's text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageExtraction {
    pub page_type: PageType,
    pub items: Vec<BillItem>,
    pub usage: TokenUsage,
}

/// Capability turning one page's text into a page type and items.
pub trait PageExtractor {
    /// Extract a page. `page_no` is 1-based.
    fn extract_page(
        &self,
        page_no: usize,
        text: &str,
    ) -> impl Future<Output = Result<PageExtraction>> + Send;
}

/// Rule-based extractor. Pure and deterministic; never reports token usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Classify the page and parse every line, keeping items in line order.
    pub fn extract_text(&self, text: &str) -> PageExtraction {
        let lines: Vec<&str> = text.lines().collect();
        let page_type = classify_page(&lines);
        let items: Vec<BillItem> = lines.iter().filter_map(|l| parse_line(l)).collect();

        PageExtraction {
            page_type,
            items,
            usage: TokenUsage::default(),
        }
    }
}

impl PageExtractor for HeuristicExtractor {
    async fn extract_page(&self, page_no: usize, text: &str) -> Result<PageExtraction> {
        let extraction = self.extract_text(text);
        debug!(
            "page {}: {} -> {} items",
            page_no,
            extraction.page_type,
            extraction.items.len()
        );
        Ok(extraction)
    }
}

/// Extractor chosen at runtime.
pub enum Extractor {
    Heuristic(HeuristicExtractor),
    #[cfg(feature = "remote")]
    Llm(LlmExtractor),
}

impl Extractor {
    /// Build the extractor named by the configuration.
    pub fn from_config(config: &MedbillConfig) -> Result<Self> {
        match config.extractor {
            ExtractorKind::Heuristic => Ok(Extractor::Heuristic(HeuristicExtractor::new())),
            #[cfg(feature = "remote")]
            ExtractorKind::Llm => Ok(Extractor::Llm(LlmExtractor::new(config.llm.clone())?)),
            #[cfg(not(feature = "remote"))]
            ExtractorKind::Llm => Err(crate::error::BillError::Config(
                "LLM extractor requires the `remote` feature".to_string(),
            )),
        }
    }

    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Extractor::Heuristic(_) => "heuristic",
            #[cfg(feature = "remote")]
            Extractor::Llm(_) => "llm",
        }
    }
}

impl PageExtractor for Extractor {
    async fn extract_page(&self, page_no: usize, text: &str) -> Result<PageExtraction> {
        match self {
            Extractor::Heuristic(e) => e.extract_page(page_no, text).await,
            #[cfg(feature = "remote")]
            Extractor::Llm(e) => e.extract_page(page_no, text).await,
        }
    }
}

/// Page-wise results for a whole document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentExtraction {
    pub pages: Vec<PageResult>,
    pub usage: TokenUsage,
}

impl DocumentExtraction {
    /// Number of items across all pages.
    pub fn total_item_count(&self) -> usize {
        self.pages.iter().map(|p| p.bill_items.len()).sum()
    }

    /// Wrap into the endpoint's response body.
    pub fn into_response(self) -> ExtractResponse {
        let total_item_count = self.total_item_count();
        ExtractResponse {
            is_success: true,
            token_usage: self.usage,
            data: ExtractResponseData {
                pagewise_line_items: self.pages,
                total_item_count,
            },
        }
    }
}

/// Run the heuristic pipeline over page texts.
///
/// Every page yields a `PageResult`, numbered from 1, even when no items
/// are found.
pub fn extract_pages<S: AsRef<str>>(pages: &[S]) -> Vec<PageResult> {
    let extractor = HeuristicExtractor::new();
    pages
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            let extraction = extractor.extract_text(text.as_ref());
            PageResult {
                page_no: (idx + 1).to_string(),
                page_type: extraction.page_type,
                bill_items: extraction.items,
            }
        })
        .collect()
}

/// Run any extractor over page texts in order, summing token usage.
///
/// The first failing page fails the document.
pub async fn extract_document<E, S>(extractor: &E, pages: &[S]) -> Result<DocumentExtraction>
where
    E: PageExtractor,
    S: AsRef<str>,
{
    let start = Instant::now();
    let mut result = DocumentExtraction::default();

    for (idx, text) in pages.iter().enumerate() {
        let page_no = idx + 1;
        let extraction = extractor.extract_page(page_no, text.as_ref()).await?;
        result.usage += extraction.usage;
        result.pages.push(PageResult {
            page_no: page_no.to_string(),
            page_type: extraction.page_type,
            bill_items: extraction.items,
        });
    }

    info!(
        "Extracted {} items from {} pages in {}ms",
        result.total_item_count(),
        result.pages.len(),
        start.elapsed().as_millis()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE_ONE: &str = "CITY HOSPITAL\n\
        Room rent 2 1500 3000\n\
        Consultation Fee 500\n\
        X-Ray chest 1 800 800\n\
        Total 4300";

    const PAGE_TWO: &str = "Terms and conditions apply\nThank you for choosing us";

    #[test]
    fn test_two_page_document() {
        let results = extract_pages(&[PAGE_ONE, PAGE_TWO]);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].page_no, "1");
        assert_eq!(results[0].bill_items.len(), 3);
        assert_eq!(results[0].bill_items[0].name, "Room rent");
        assert_eq!(results[0].bill_items[2].name, "X-Ray chest");
        assert_eq!(results[1].page_no, "2");
        assert_eq!(results[1].page_type, PageType::BillDetail);
        assert!(results[1].bill_items.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let pages = [PAGE_ONE, PAGE_TWO];
        assert_eq!(extract_pages(&pages), extract_pages(&pages));
    }

    #[test]
    fn test_crlf_lines() {
        let results = extract_pages(&["Syringe 5 10 50\r\nGauze 2 20 40\r\n"]);
        assert_eq!(results[0].bill_items.len(), 2);
        assert_eq!(results[0].bill_items[1].amount, 40.0);
    }

    #[tokio::test]
    async fn test_extract_document_matches_pure_pipeline() {
        let pages = vec![PAGE_ONE.to_string(), PAGE_TWO.to_string()];
        let extractor = Extractor::Heuristic(HeuristicExtractor::new());

        let doc = extract_document(&extractor, &pages).await.unwrap();
        assert_eq!(doc.pages, extract_pages(&pages));
        assert_eq!(doc.usage, TokenUsage::default());
        assert_eq!(doc.total_item_count(), 3);

        let response = doc.into_response();
        assert!(response.is_success);
        assert_eq!(response.data.total_item_count, 3);
    }

    struct FixedUsage;

    impl PageExtractor for FixedUsage {
        async fn extract_page(&self, page_no: usize, _text: &str) -> Result<PageExtraction> {
            Ok(PageExtraction {
                page_type: PageType::FinalBill,
                items: vec![BillItem::new(format!("page {}", page_no), 1.0, 1.0, 1.0)],
                usage: TokenUsage {
                    total_tokens: 10,
                    input_tokens: 7,
                    output_tokens: 3,
                },
            })
        }
    }

    #[tokio::test]
    async fn test_usage_is_summed() {
        let doc = extract_document(&FixedUsage, &["a", "b", "c"]).await.unwrap();
        assert_eq!(doc.usage.total_tokens, 30);
        assert_eq!(doc.usage.input_tokens, 21);
        assert_eq!(doc.usage.output_tokens, 9);
        assert_eq!(doc.pages[2].bill_items[0].name, "page 3");
    }

    #[test]
    fn test_extractor_from_default_config() {
        let extractor = Extractor::from_config(&MedbillConfig::default()).unwrap();
        assert_eq!(extractor.name(), "heuristic");
    }
}
