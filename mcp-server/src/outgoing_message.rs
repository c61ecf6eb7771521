//! Queue of messages flowing from the server to the client.

use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCError;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCResponse;
use mcp_types::ModelContextProtocolRequest;
use mcp_types::RequestId;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::error;

/// Handle handed to request handlers so they can enqueue replies for the
/// stdout writer task.
pub(crate) struct OutgoingMessageSender {
    sender: mpsc::UnboundedSender<OutgoingMessage>,
}

impl OutgoingMessageSender {
    pub(crate) fn new(sender: mpsc::UnboundedSender<OutgoingMessage>) -> Self {
        Self { sender }
    }

    pub(crate) async fn send_response<T>(&self, id: RequestId, result: T::Result)
    where
        T: ModelContextProtocolRequest,
    {
        match serde_json::to_value(result) {
            Ok(result) => {
                let _ = self.sender.send(OutgoingMessage::Response(OutgoingResponse {
                    id,
                    result,
                }));
            }
            Err(e) => error!("Failed to serialize response for {}: {e}", T::METHOD),
        }
    }

    pub(crate) async fn send_error(&self, id: RequestId, error: JSONRPCErrorError) {
        let _ = self
            .sender
            .send(OutgoingMessage::Error(OutgoingError { id, error }));
    }
}

/// Reply to a request: either a result or a JSON-RPC error.
pub(crate) enum OutgoingMessage {
    Response(OutgoingResponse),
    Error(OutgoingError),
}

pub(crate) struct OutgoingResponse {
    pub id: RequestId,
    pub result: Value,
}

pub(crate) struct OutgoingError {
    pub id: RequestId,
    pub error: JSONRPCErrorError,
}

impl From<OutgoingMessage> for JSONRPCMessage {
    fn from(outgoing_message: OutgoingMessage) -> Self {
        match outgoing_message {
            OutgoingMessage::Response(OutgoingResponse { id, result }) => {
                JSONRPCMessage::Response(JSONRPCResponse {
                    jsonrpc: JSONRPC_VERSION.into(),
                    id,
                    result,
                })
            }
            OutgoingMessage::Error(OutgoingError { id, error }) => {
                JSONRPCMessage::Error(JSONRPCError {
                    jsonrpc: JSONRPC_VERSION.into(),
                    id,
                    error,
                })
            }
        }
    }
}
