//! Handler for `send_webhook` tool calls.

use mcp_types::CallToolResult;
use mcp_types::ContentBlock;
use mcp_types::TextContent;
use serde_json::Value;
use tracing::info;

use crate::webhook::WebhookResult;
use crate::webhook::WebhookSender;

pub(crate) async fn handle_send_webhook(arguments: Option<Value>) -> CallToolResult {
    let payload = match arguments.as_ref().and_then(|args| args.get("payload")) {
        Some(payload) => payload.clone(),
        None => {
            return error_result("Invalid send_webhook arguments: missing 'payload'".to_string());
        }
    };

    info!("Executing send_webhook");
    let sender = WebhookSender::new();
    let result = sender.send(payload).await;
    call_tool_result(&result)
}

fn call_tool_result(result: &WebhookResult) -> CallToolResult {
    let is_error = matches!(result, WebhookResult::Failed { .. });
    let structured = match serde_json::to_value(result) {
        Ok(value) => value,
        Err(e) => return error_result(format!("Error serializing webhook result: {e}")),
    };

    CallToolResult {
        content: vec![ContentBlock::TextContent(TextContent {
            r#type: "text".to_string(),
            text: structured.to_string(),
            annotations: None,
        })],
        is_error: Some(is_error),
        structured_content: Some(structured),
    }
}

pub(crate) fn error_result(text: String) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::TextContent(TextContent {
            r#type: "text".to_string(),
            text,
            annotations: None,
        })],
        is_error: Some(true),
        structured_content: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn delivered_result_is_not_an_error_even_when_non_2xx() {
        let result = call_tool_result(&WebhookResult::Delivered {
            status_code: 500,
            headers: HashMap::new(),
            content: json!("boom"),
        });
        assert_eq!(result.is_error, Some(false));
        assert_eq!(
            result.structured_content,
            Some(json!({"status_code": 500, "headers": {}, "content": "boom"}))
        );
    }

    #[test]
    fn failed_result_is_an_error() {
        let result = call_tool_result(&WebhookResult::Failed {
            error: "Error sending webhook: connection refused".to_string(),
        });
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            result.structured_content,
            Some(json!({"error": "Error sending webhook: connection refused"}))
        );
    }

    #[tokio::test]
    async fn missing_payload_argument_is_an_error() {
        let result = handle_send_webhook(Some(json!({}))).await;
        assert_eq!(result.is_error, Some(true));

        let result = handle_send_webhook(None).await;
        assert_eq!(result.is_error, Some(true));
    }
}
