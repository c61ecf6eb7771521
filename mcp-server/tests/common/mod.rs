use std::process::Stdio;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::MCP_SCHEMA_VERSION;
use mcp_types::RequestId;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::Lines;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;

/// Drives the server binary over its stdio transport, the way a real MCP
/// client would.
pub struct McpProcess {
    #[allow(dead_code)]
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_request_id: i64,
}

impl McpProcess {
    /// Spawn the binary with exactly the given environment overrides; the
    /// ambient `WEBHOOK_URL`/`CONFIG_PATH` are cleared first so tests cannot
    /// pick up state from the developer's machine.
    pub async fn new(envs: &[(&str, &str)]) -> Result<Self> {
        let mut command = Command::new(env!("CARGO_BIN_EXE_webhook-mcp-server"));
        command
            .env_remove("WEBHOOK_URL")
            .env_remove("CONFIG_PATH")
            .envs(envs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn().context("spawn webhook-mcp-server")?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("failed to capture child stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("failed to capture child stdout"))?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_request_id: 1,
        })
    }

    /// Perform the `initialize` handshake.
    pub async fn initialize(&mut self) -> Result<()> {
        let id = self
            .send_request(
                "initialize",
                Some(json!({
                    "protocolVersion": MCP_SCHEMA_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "0.0.1"}
                })),
            )
            .await?;
        self.read_response(id).await?;
        self.send_notification("notifications/initialized", None)
            .await
    }

    pub async fn send_request(&mut self, method: &str, params: Option<Value>) -> Result<i64> {
        let id = self.next_request_id;
        self.next_request_id += 1;
        let request = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.into(),
            id: RequestId::Integer(id),
            method: method.to_string(),
            params,
        };
        self.write_message(&JSONRPCMessage::Request(request)).await?;
        Ok(id)
    }

    pub async fn send_notification(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.to_string(),
            params,
        };
        self.write_message(&JSONRPCMessage::Notification(notification))
            .await
    }

    /// Read frames until the response with the given id arrives.
    pub async fn read_response(&mut self, id: i64) -> Result<JSONRPCResponse> {
        let expected = RequestId::Integer(id);
        while let Some(line) = self.stdout.next_line().await? {
            match serde_json::from_str::<JSONRPCMessage>(&line)? {
                JSONRPCMessage::Response(response) if response.id == expected => {
                    return Ok(response);
                }
                JSONRPCMessage::Error(error) if error.id == expected => {
                    return Err(anyhow!("request {id} failed: {}", error.error.message));
                }
                other => {
                    eprintln!("skipping message while waiting for response {id}: {other:?}");
                }
            }
        }
        Err(anyhow!(
            "server closed stdout before responding to request {id}"
        ))
    }

    async fn write_message(&mut self, message: &JSONRPCMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.stdin.write_all(json.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }
}
