//! MCP server exposing a single webhook delivery tool over stdio.
#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::io::Result as IoResult;

use mcp_types::JSONRPCMessage;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::{self};
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error_code;
pub(crate) mod message_processor;
mod outgoing_message;
mod webhook;
mod webhook_tool;
mod webhook_tool_handler;

use crate::message_processor::MessageProcessor;
use crate::outgoing_message::OutgoingMessage;
use crate::outgoing_message::OutgoingMessageSender;

pub use crate::webhook::WebhookResult;

/// Size of the bounded channel used to communicate between tasks.
const CHANNEL_CAPACITY: usize = 128;

pub async fn run_main() -> IoResult<()> {
    // Install tracing subscriber. Diagnostics must go to stderr: stdout
    // carries the JSON-RPC stream.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Set up channels.
    let (incoming_tx, mut incoming_rx) = mpsc::channel::<JSONRPCMessage>(CHANNEL_CAPACITY);
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<OutgoingMessage>();

    // Task: read from stdin and write to `incoming_tx`.
    let stdin_reader_handle = tokio::spawn(async move {
        let stdin = io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await.unwrap_or_default() {
            match serde_json::from_str::<JSONRPCMessage>(&line) {
                Ok(msg) => {
                    if incoming_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to deserialize JSON-RPC message: {e}"),
            }
        }

        debug!("stdin reader finished (EOF)");
    });

    // Task: read from `outgoing_rx` and write to stdout, one message per line.
    let stdout_writer_handle = tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(outgoing_message) = outgoing_rx.recv().await {
            let msg: JSONRPCMessage = outgoing_message.into();
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if let Err(e) = stdout.write_all(json.as_bytes()).await {
                        error!("Failed to write to stdout: {e}");
                        break;
                    }
                    if let Err(e) = stdout.write_all(b"\n").await {
                        error!("Failed to write newline to stdout: {e}");
                        break;
                    }
                    if let Err(e) = stdout.flush().await {
                        error!("Failed to flush stdout: {e}");
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize JSON-RPC message: {e}"),
            }
        }
        info!("stdout writer exited (channel closed)");
    });

    // Task: dispatch incoming messages to the message processor.
    let processor_handle = tokio::spawn({
        let outgoing_message_sender = OutgoingMessageSender::new(outgoing_tx);
        let mut processor = MessageProcessor::new(outgoing_message_sender);
        async move {
            while let Some(msg) = incoming_rx.recv().await {
                match msg {
                    JSONRPCMessage::Request(r) => processor.process_request(r).await,
                    JSONRPCMessage::Response(r) => processor.process_response(r),
                    JSONRPCMessage::Notification(n) => processor.process_notification(n),
                    JSONRPCMessage::Error(e) => processor.process_error(e),
                }
            }
            info!("processor task exited (channel closed)");
        }
    });

    info!("webhook MCP server started on stdio transport");

    // EOF on stdin shuts the pipeline down: the reader drops `incoming_tx`,
    // the processor drains and drops the outgoing sender, the writer exits.
    let _ = stdin_reader_handle.await;
    let _ = processor_handle.await;
    let _ = stdout_writer_handle.await;

    Ok(())
}
