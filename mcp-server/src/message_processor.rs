use mcp_types::CallToolRequestParams;
use mcp_types::ClientNotification;
use mcp_types::ClientRequest;
use mcp_types::Implementation;
use mcp_types::JSONRPCError;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::ListToolsResult;
use mcp_types::ModelContextProtocolRequest;
use mcp_types::RequestId;
use mcp_types::ServerCapabilitiesTools;
use serde_json::json;
use std::sync::Arc;

use crate::error_code::INVALID_REQUEST_ERROR_CODE;
use crate::error_code::METHOD_NOT_FOUND_ERROR_CODE;
use crate::outgoing_message::OutgoingMessageSender;
use crate::webhook_tool::SEND_WEBHOOK_TOOL_NAME;
use crate::webhook_tool::send_webhook_tool;
use crate::webhook_tool_handler::error_result;
use crate::webhook_tool_handler::handle_send_webhook;

pub(crate) struct MessageProcessor {
    outgoing: Arc<OutgoingMessageSender>,
    initialized: bool,
}

impl MessageProcessor {
    /// Create a new `MessageProcessor`, retaining a handle to the outgoing
    /// `Sender` so handlers can enqueue messages to be written to stdout.
    pub(crate) fn new(outgoing: OutgoingMessageSender) -> Self {
        Self {
            outgoing: Arc::new(outgoing),
            initialized: false,
        }
    }

    pub(crate) async fn process_request(&mut self, request: JSONRPCRequest) {
        // Hold on to the ID so we can respond.
        let request_id = request.id.clone();
        let method = request.method.clone();

        let client_request = match ClientRequest::try_from(request) {
            Ok(client_request) => client_request,
            Err(e) => {
                tracing::warn!("failed to convert request: {e}");
                let error = JSONRPCErrorError {
                    code: METHOD_NOT_FOUND_ERROR_CODE,
                    message: format!("unsupported method '{method}'"),
                    data: None,
                };
                self.outgoing.send_error(request_id, error).await;
                return;
            }
        };

        // Dispatch to a dedicated handler for each request type.
        match client_request {
            ClientRequest::InitializeRequest(params) => {
                self.handle_initialize(request_id, params).await;
            }
            ClientRequest::PingRequest(params) => {
                self.handle_ping(request_id, params).await;
            }
            ClientRequest::ListToolsRequest(params) => {
                self.handle_list_tools(request_id, params).await;
            }
            ClientRequest::CallToolRequest(params) => {
                self.handle_call_tool(request_id, params).await;
            }
        }
    }

    /// Handle a standalone JSON-RPC response originating from the peer. This
    /// server issues no requests of its own, so there is nothing to pair it
    /// with.
    pub(crate) fn process_response(&mut self, response: JSONRPCResponse) {
        tracing::info!("<- response: {:?}", response);
    }

    /// Handle a fire-and-forget JSON-RPC notification.
    pub(crate) fn process_notification(&mut self, notification: JSONRPCNotification) {
        match ClientNotification::try_from(notification) {
            Ok(ClientNotification::InitializedNotification) => {
                tracing::info!("client sent notifications/initialized");
            }
            Ok(ClientNotification::CancelledNotification(params)) => {
                tracing::info!("notifications/cancelled -> params: {params:?}");
            }
            Err(e) => tracing::warn!("failed to convert notification: {e}"),
        }
    }

    /// Handle an error object received from the peer.
    pub(crate) fn process_error(&mut self, err: JSONRPCError) {
        tracing::error!("<- error: {:?}", err);
    }

    async fn handle_initialize(
        &mut self,
        id: RequestId,
        params: <mcp_types::InitializeRequest as ModelContextProtocolRequest>::Params,
    ) {
        tracing::info!("initialize -> params: {:?}", params);

        if self.initialized {
            // Already initialised: send JSON-RPC error response.
            let error = JSONRPCErrorError {
                code: INVALID_REQUEST_ERROR_CODE,
                message: "initialize called more than once".to_string(),
                data: None,
            };
            self.outgoing.send_error(id, error).await;
            return;
        }

        self.initialized = true;

        let result = mcp_types::InitializeResult {
            capabilities: mcp_types::ServerCapabilities {
                tools: Some(ServerCapabilitiesTools { list_changed: None }),
            },
            instructions: None,
            protocol_version: params.protocol_version,
            server_info: Implementation {
                name: "webhook-mcp-server".to_string(),
                title: Some("Webhook".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        self.send_response::<mcp_types::InitializeRequest>(id, result)
            .await;
    }

    async fn send_response<T>(&self, id: RequestId, result: T::Result)
    where
        T: ModelContextProtocolRequest,
    {
        self.outgoing.send_response::<T>(id, result).await;
    }

    async fn handle_ping(
        &self,
        id: RequestId,
        params: <mcp_types::PingRequest as ModelContextProtocolRequest>::Params,
    ) {
        tracing::info!("ping -> params: {:?}", params);
        let result = json!({});
        self.send_response::<mcp_types::PingRequest>(id, result)
            .await;
    }

    async fn handle_list_tools(
        &self,
        id: RequestId,
        params: <mcp_types::ListToolsRequest as ModelContextProtocolRequest>::Params,
    ) {
        tracing::trace!("tools/list -> {params:?}");
        let result = ListToolsResult {
            tools: vec![send_webhook_tool()],
            next_cursor: None,
        };

        self.send_response::<mcp_types::ListToolsRequest>(id, result)
            .await;
    }

    async fn handle_call_tool(&self, id: RequestId, params: CallToolRequestParams) {
        tracing::info!("tools/call -> params: {:?}", params);
        let CallToolRequestParams { name, arguments } = params;

        let result = match name.as_str() {
            SEND_WEBHOOK_TOOL_NAME => handle_send_webhook(arguments).await,
            _ => error_result(format!("Unknown tool '{name}'")),
        };

        self.send_response::<mcp_types::CallToolRequest>(id, result)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outgoing_message::OutgoingMessage;
    use mcp_types::JSONRPC_VERSION;
    use mcp_types::JSONRPCMessage;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn processor() -> (MessageProcessor, mpsc::UnboundedReceiver<OutgoingMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MessageProcessor::new(OutgoingMessageSender::new(tx)), rx)
    }

    fn request(id: i64, method: &str, params: Option<serde_json::Value>) -> JSONRPCRequest {
        JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.into(),
            id: RequestId::Integer(id),
            method: method.to_string(),
            params,
        }
    }

    fn initialize_request(id: i64) -> JSONRPCRequest {
        request(
            id,
            "initialize",
            Some(json!({
                "protocolVersion": "2025-06-18",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "0.0.1"}
            })),
        )
    }

    async fn next_message(rx: &mut mpsc::UnboundedReceiver<OutgoingMessage>) -> JSONRPCMessage {
        match rx.recv().await {
            Some(msg) => msg.into(),
            None => panic!("expected an outgoing message"),
        }
    }

    #[tokio::test]
    async fn initialize_echoes_protocol_version() {
        let (mut processor, mut rx) = processor();
        processor.process_request(initialize_request(1)).await;

        let JSONRPCMessage::Response(response) = next_message(&mut rx).await else {
            panic!("expected a response");
        };
        assert_eq!(response.id, RequestId::Integer(1));
        assert_eq!(response.result["protocolVersion"], json!("2025-06-18"));
        assert_eq!(
            response.result["serverInfo"]["name"],
            json!("webhook-mcp-server")
        );
    }

    #[tokio::test]
    async fn second_initialize_is_rejected() {
        let (mut processor, mut rx) = processor();
        processor.process_request(initialize_request(1)).await;
        let _ = next_message(&mut rx).await;

        processor.process_request(initialize_request(2)).await;
        let JSONRPCMessage::Error(error) = next_message(&mut rx).await else {
            panic!("expected an error");
        };
        assert_eq!(error.id, RequestId::Integer(2));
        assert_eq!(error.error.code, INVALID_REQUEST_ERROR_CODE);
    }

    #[tokio::test]
    async fn tools_list_contains_send_webhook() {
        let (mut processor, mut rx) = processor();
        processor.process_request(request(1, "tools/list", None)).await;

        let JSONRPCMessage::Response(response) = next_message(&mut rx).await else {
            panic!("expected a response");
        };
        assert_eq!(response.result["tools"][0]["name"], json!("send_webhook"));
    }

    #[tokio::test]
    async fn unknown_tool_reports_in_band_error() {
        let (mut processor, mut rx) = processor();
        processor
            .process_request(request(
                1,
                "tools/call",
                Some(json!({"name": "no_such_tool", "arguments": {}})),
            ))
            .await;

        let JSONRPCMessage::Response(response) = next_message(&mut rx).await else {
            panic!("expected a response");
        };
        assert_eq!(response.result["isError"], json!(true));
        assert_eq!(
            response.result["content"][0]["text"],
            json!("Unknown tool 'no_such_tool'")
        );
    }

    #[tokio::test]
    async fn unknown_method_reports_json_rpc_error() {
        let (mut processor, mut rx) = processor();
        processor.process_request(request(1, "resources/list", None)).await;

        let JSONRPCMessage::Error(error) = next_message(&mut rx).await else {
            panic!("expected an error");
        };
        assert_eq!(error.error.code, METHOD_NOT_FOUND_ERROR_CODE);
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let (mut processor, mut rx) = processor();
        processor.process_request(request(1, "ping", None)).await;

        let JSONRPCMessage::Response(response) = next_message(&mut rx).await else {
            panic!("expected a response");
        };
        assert_eq!(response.result, json!({}));
    }
}
