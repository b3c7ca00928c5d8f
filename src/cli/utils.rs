use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Print a result: the serialized value under `data` for JSON, `text` otherwise.
pub fn output_value<T: Serialize>(output_format: &OutputFormat, data: &T, text: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let response = json!({
                "success": true,
                "data": serde_json::to_value(data)?
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("{}", text);
        }
    }
    Ok(())
}

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a list with one line per item in text mode
pub fn output_list<T: Serialize>(
    output_format: &OutputFormat,
    items: &[T],
    empty_message: &str,
    line: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_value(output_format, &items, ""),
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{}", empty_message);
            }
            for item in items {
                println!("{}", line(item));
            }
            Ok(())
        }
    }
}

/// `None` limits read as unlimited.
pub fn format_limit(limit: Option<i64>) -> String {
    limit.map(|l| l.to_string()).unwrap_or_else(|| "unlimited".to_string())
}
