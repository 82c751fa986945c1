//! Rendering of extraction results.

use medbill_core::ExtractResponse;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per line item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn format_response(response: &ExtractResponse, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
        OutputFormat::Csv => format_csv(response),
        OutputFormat::Text => Ok(format_text(response)),
    }
}

fn format_csv(response: &ExtractResponse) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "page_no",
        "page_type",
        "item_name",
        "item_quantity",
        "item_rate",
        "item_amount",
    ])?;

    for page in &response.data.pagewise_line_items {
        for item in &page.bill_items {
            wtr.write_record([
                page.page_no.as_str(),
                page.page_type.as_str(),
                item.name.as_str(),
                &item.quantity.to_string(),
                &item.rate.to_string(),
                &item.amount.to_string(),
            ])?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(response: &ExtractResponse) -> String {
    let mut output = String::new();

    for page in &response.data.pagewise_line_items {
        output.push_str(&format!(
            "Page {} ({}): {} item(s)\n",
            page.page_no,
            page.page_type,
            page.bill_items.len()
        ));
        for item in &page.bill_items {
            output.push_str(&format!(
                "  {:<40} qty {:<6} rate {:<10} amount {}\n",
                item.name, item.quantity, item.rate, item.amount
            ));
        }
        output.push('\n');
    }

    let total_amount: f64 = response
        .data
        .pagewise_line_items
        .iter()
        .flat_map(|p| &p.bill_items)
        .map(|i| i.amount)
        .sum();

    output.push_str(&format!("Total items:  {}\n", response.data.total_item_count));
    output.push_str(&format!("Total amount: {}\n", total_amount));

    let usage = &response.token_usage;
    if usage.total_tokens > 0 {
        output.push_str(&format!(
            "Tokens:       {} ({} in, {} out)\n",
            usage.total_tokens, usage.input_tokens, usage.output_tokens
        ));
    }

    output
}
