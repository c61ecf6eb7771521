//! Webhook MCP tool definition.

use mcp_types::Tool;
use mcp_types::ToolInputSchema;
use serde_json::json;

pub(crate) const SEND_WEBHOOK_TOOL_NAME: &str = "send_webhook";

pub(crate) fn send_webhook_tool() -> Tool {
    Tool {
        name: SEND_WEBHOOK_TOOL_NAME.to_string(),
        description: Some(
            "Send a POST request to the configured webhook URL. The payload is \
             forwarded verbatim as the JSON body of the request."
                .to_string(),
        ),
        input_schema: ToolInputSchema {
            r#type: "object".to_string(),
            properties: Some(json!({
                "payload": {
                    "description": "Data to send to the webhook; any JSON value."
                }
            })),
            required: Some(vec!["payload".to_string()]),
        },
    }
}
