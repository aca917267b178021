use chrono::{DateTime, SecondsFormat, Utc};
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::error::OperationError;

/// Pretty-printed JSON of a projection, as a single text block.
pub fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, OperationError> {
    let text = serde_json::to_string_pretty(value).map_err(OperationError::Serialize)?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

pub fn text_result(text: String) -> Result<CallToolResult, OperationError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Envelope for a failed operation: `{"error": message}` with the error flag set.
pub fn error_result(message: &str) -> CallToolResult {
    let body = serde_json::json!({ "error": message });
    let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| message.to_string());
    CallToolResult::error(vec![Content::text(text)])
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Epoch milliseconds as RFC 3339 UTC, e.g. `2024-01-01T00:00:00.000Z`.
pub fn iso_timestamp(millis: i64) -> String {
    from_millis(millis).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Epoch milliseconds in a human-oriented form for prompt text.
pub fn display_timestamp(millis: i64) -> String {
    from_millis(millis).format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
