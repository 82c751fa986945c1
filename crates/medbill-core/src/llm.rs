//! LLM-backed page extractor using an OpenAI-compatible chat completions API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::bill::{PageExtraction, PageExtractor};
use crate::error::{BillError, LlmError, Result};
use crate::models::bill::{BillItem, PageType, TokenUsage};
use crate::models::config::LlmConfig;

const SYSTEM_PROMPT: &str = "You are an expert system for extracting line items from medical bills and invoices. \
You will be given OCR text from a single page.\n\
Your job is to:\n\
1. Identify all billable line items (treatments, tests, medicines, services, etc.).\n\
2. Exclude summary lines like Sub-total, Total, Grand Total, GST, discounts, taxes.\n\
3. For each item, extract:\n\
   - item_name (as it appears in the bill; minor OCR errors may be corrected)\n\
   - item_quantity (1 if it is obviously a single item and no quantity is written, otherwise 0)\n\
   - item_rate (per-unit rate if available, otherwise 0)\n\
   - item_amount (net amount after discounts as per bill)\n\
4. Identify the page type: one of 'Bill Detail', 'Final Bill', or 'Pharmacy'.\n\
   Use 'Pharmacy' for a medicine / drug / pharmacy bill. \
   Use 'Final Bill' for a final summary of all charges. \
   Otherwise use 'Bill Detail'.\n\
Return STRICT JSON with keys: page_type, items.\n\
DO NOT include any explanation or extra keys.\n";

const RESPONSE_SHAPE: &str = "Respond in this JSON format:\n\
{\n\
  \"page_type\": \"Bill Detail | Final Bill | Pharmacy\",\n\
  \"items\": [\n\
    {\n\
      \"item_name\": \"string\",\n\
      \"item_quantity\": number,\n\
      \"item_rate\": number,\n\
      \"item_amount\": number\n\
    }\n\
  ]\n\
}\n";

/// Chat completions request body.
#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        let input_tokens = usage.prompt_tokens.unwrap_or(0);
        let output_tokens = usage.completion_tokens.unwrap_or(0);
        TokenUsage {
            input_tokens,
            output_tokens,
            total_tokens: usage.total_tokens.unwrap_or(input_tokens + output_tokens),
        }
    }
}

/// Page extractor that asks a chat model for the page type and items.
pub struct LlmExtractor {
    config: LlmConfig,
    api_key: String,
    http_client: reqwest::Client,
}

impl LlmExtractor {
    /// Create an extractor. Fails when no API key is configured.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| BillError::Config("OPENAI_API_KEY not set".to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BillError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            http_client,
        })
    }

    async fn complete(&self, page_no: usize, page_text: &str) -> Result<(String, TokenUsage)> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt(page_no, page_text),
                },
            ],
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let chat: ChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Response(e.to_string()))?;
        let usage = chat.usage.unwrap_or_default().into();

        let content = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Response("no choices in response".to_string()))?
            .message
            .content
            .ok_or_else(|| LlmError::Response("no content in response".to_string()))?;

        Ok((content, usage))
    }
}

impl PageExtractor for LlmExtractor {
    async fn extract_page(&self, page_no: usize, text: &str) -> Result<PageExtraction> {
        if text.trim().is_empty() {
            debug!("page {}: blank text, skipping LLM call", page_no);
            return Ok(PageExtraction::default());
        }

        let (content, usage) = self.complete(page_no, text).await?;
        let mut extraction = parse_content(&content);
        extraction.usage = usage;

        debug!(
            "page {}: {} -> {} items ({} tokens)",
            page_no,
            extraction.page_type,
            extraction.items.len(),
            usage.total_tokens
        );
        Ok(extraction)
    }
}

fn user_prompt(page_no: usize, page_text: &str) -> String {
    format!(
        "PAGE_NO: {}\nOCR_TEXT:\n-------------------\n{}\n-------------------\n\n{}",
        page_no, page_text, RESPONSE_SHAPE
    )
}

/// Interpret the model's JSON answer. Invalid JSON yields an empty
/// `Bill Detail` page.
fn parse_content(content: &str) -> PageExtraction {
    let data: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            warn!("LLM returned invalid JSON: {}", e);
            return PageExtraction::default();
        }
    };

    let page_type = data
        .get("page_type")
        .and_then(Value::as_str)
        .map(PageType::normalize)
        .unwrap_or_default();

    let items = data
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_item).collect())
        .unwrap_or_default();

    PageExtraction {
        page_type,
        items,
        usage: TokenUsage::default(),
    }
}

fn parse_item(value: &Value) -> Option<BillItem> {
    let name = value.get("item_name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    Some(BillItem {
        name: name.to_string(),
        quantity: lenient_number(value.get("item_quantity")),
        rate: lenient_number(value.get("item_rate")),
        amount: lenient_number(value.get("item_amount")),
    })
}

/// Read a number that may arrive as JSON number or as text with thousands
/// separators. Anything unreadable is 0.
fn lenient_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let cleaned = s.replace(',', "");
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                0.0
            } else {
                cleaned.parse().unwrap_or(0.0)
            }
        }
        _ => 0.0,
    }
}
