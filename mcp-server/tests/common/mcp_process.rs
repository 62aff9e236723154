use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::task::JoinHandle;

use anyhow::Context;
use pretty_assertions::assert_eq;
use rmcp::model::ClientCapabilities;
use rmcp::model::CustomNotification;
use rmcp::model::CustomRequest;
use rmcp::model::Implementation;
use rmcp::model::InitializeRequestParams;
use rmcp::model::JsonRpcError;
use rmcp::model::JsonRpcMessage;
use rmcp::model::JsonRpcNotification;
use rmcp::model::JsonRpcRequest;
use rmcp::model::JsonRpcResponse;
use rmcp::model::JsonRpcVersion2_0;
use rmcp::model::ProtocolVersion;
use rmcp::model::RequestId;
use serde_json::Value;
use serde_json::json;
use thinking_mcp_server::DISABLE_THOUGHT_LOGGING_ENV_VAR;
use thinking_mcp_server::SERVER_NAME;
use thinking_mcp_server::THINK_TOOL_NAME;
use tokio::process::Command;

use crate::DEFAULT_READ_TIMEOUT;

const BINARY_NAME: &str = "thinking-mcp-server";

type ClientMessage = JsonRpcMessage<CustomRequest, Value, CustomNotification>;

/// What the server left behind after its stdin was closed.
#[derive(Debug)]
pub struct ProcessExit {
    pub status: ExitStatus,
    pub stderr: Vec<String>,
}

pub struct McpProcess {
    next_request_id: AtomicI64,
    /// Retain this child process until the client is dropped. The Tokio runtime
    /// will make a "best effort" to reap the process after it exits, but it is
    /// not a guarantee. See the `kill_on_drop` documentation for details.
    process: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    stderr_task: Option<JoinHandle<Vec<String>>>,
}

impl McpProcess {
    /// Spawns the server with thought panels turned off so stderr only
    /// carries logs.
    pub async fn new() -> anyhow::Result<Self> {
        Self::new_with_env(&[(DISABLE_THOUGHT_LOGGING_ENV_VAR, Some("true"))]).await
    }

    /// Creates a new MCP process, allowing tests to override or remove
    /// specific environment variables for the child process only.
    ///
    /// Pass a tuple of (key, Some(value)) to set/override, or (key, None) to
    /// remove a variable from the child's environment.
    pub async fn new_with_env(env_overrides: &[(&str, Option<&str>)]) -> anyhow::Result<Self> {
        let program = cargo_bin(BINARY_NAME)?;
        let mut cmd = Command::new(program);

        cmd.arg("--color=never");
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.env("RUST_LOG", "debug");
        cmd.env_remove(DISABLE_THOUGHT_LOGGING_ENV_VAR);

        for (k, v) in env_overrides {
            match v {
                Some(val) => {
                    cmd.env(k, val);
                }
                None => {
                    cmd.env_remove(k);
                }
            }
        }

        let mut process = cmd
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("{BINARY_NAME} proc should start"))?;
        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| anyhow::format_err!("mcp should have stdin fd"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| anyhow::format_err!("mcp should have stdout fd"))?;
        let stdout = BufReader::new(stdout);

        // Forward child's stderr to our stderr so failures are visible even
        // when stdout/stderr are captured by the test harness, and keep a copy
        // for assertions after exit.
        let stderr_task = process.stderr.take().map(|stderr| {
            let mut stderr_reader = BufReader::new(stderr).lines();
            tokio::spawn(async move {
                let mut captured = Vec::new();
                while let Ok(Some(line)) = stderr_reader.next_line().await {
                    eprintln!("[mcp stderr] {line}");
                    captured.push(line);
                }
                captured
            })
        });

        Ok(Self {
            next_request_id: AtomicI64::new(0),
            process,
            stdin: Some(stdin),
            stdout,
            stderr_task,
        })
    }

    /// Performs the initialization handshake with the MCP server.
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        let params = InitializeRequestParams {
            meta: None,
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "thinking test".into(),
                title: None,
                version: "0.0.0".into(),
                description: None,
                icons: None,
                website_url: None,
            },
            protocol_version: ProtocolVersion::V_2025_03_26,
        };
        let request_id = self
            .send_request("initialize", Some(serde_json::to_value(params)?))
            .await?;

        let JsonRpcResponse {
            jsonrpc,
            id,
            result,
        } = self
            .read_stream_until_response_message(RequestId::Number(request_id))
            .await?;
        assert_eq!(jsonrpc, JsonRpcVersion2_0);
        assert_eq!(id, RequestId::Number(request_id));
        assert_eq!(result["serverInfo"]["name"], json!(SERVER_NAME));
        assert_eq!(
            result["serverInfo"]["version"],
            json!(env!("CARGO_PKG_VERSION"))
        );
        assert_eq!(
            result["protocolVersion"],
            json!(ProtocolVersion::V_2025_03_26)
        );
        assert_eq!(result["capabilities"]["tools"], json!({ "listChanged": true }));
        assert!(result["capabilities"]["resources"].is_object());

        // Send notifications/initialized to ack the response.
        self.send_jsonrpc_message(JsonRpcMessage::Notification(JsonRpcNotification {
            jsonrpc: JsonRpcVersion2_0,
            notification: CustomNotification::new("notifications/initialized", None),
        }))
        .await?;

        Ok(())
    }

    pub async fn send_list_tools_request(&mut self) -> anyhow::Result<i64> {
        self.send_request("tools/list", None).await
    }

    /// Sends a `tools/call` for `think`. `arguments` goes through untouched so
    /// tests can send malformed payloads.
    pub async fn send_think_tool_call(&mut self, arguments: Value) -> anyhow::Result<i64> {
        self.send_request(
            "tools/call",
            Some(json!({
                "name": THINK_TOOL_NAME,
                "arguments": arguments,
            })),
        )
        .await
    }

    pub async fn send_list_resources_request(&mut self) -> anyhow::Result<i64> {
        self.send_request("resources/list", None).await
    }

    pub async fn send_list_resource_templates_request(&mut self) -> anyhow::Result<i64> {
        self.send_request("resources/templates/list", None).await
    }

    pub async fn send_read_resource_request(&mut self, uri: &str) -> anyhow::Result<i64> {
        self.send_request("resources/read", Some(json!({ "uri": uri })))
            .await
    }

    pub async fn send_request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> anyhow::Result<i64> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);

        let message = JsonRpcMessage::Request(JsonRpcRequest {
            jsonrpc: JsonRpcVersion2_0,
            id: RequestId::Number(request_id),
            request: CustomRequest::new(method, params),
        });
        self.send_jsonrpc_message(message).await?;
        Ok(request_id)
    }

    /// Writes a raw line to the server, bypassing JSON-RPC framing.
    pub async fn send_raw_line(&mut self, line: &str) -> anyhow::Result<()> {
        let stdin = self.stdin()?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn send_jsonrpc_message(&mut self, message: ClientMessage) -> anyhow::Result<()> {
        eprintln!("writing message to stdin: {message:?}");
        let payload = serde_json::to_string(&message)?;
        self.send_raw_line(&payload).await
    }

    fn stdin(&mut self) -> anyhow::Result<&mut ChildStdin> {
        self.stdin
            .as_mut()
            .ok_or_else(|| anyhow::format_err!("stdin already closed"))
    }

    async fn read_jsonrpc_message(&mut self) -> anyhow::Result<ClientMessage> {
        let mut line = String::new();
        let read = self.stdout.read_line(&mut line).await?;
        if read == 0 {
            anyhow::bail!("server closed stdout");
        }
        let message = serde_json::from_str::<ClientMessage>(&line)
            .with_context(|| format!("stdout line should be JSON-RPC: {line}"))?;
        eprintln!("read message from stdout: {message:?}");
        Ok(message)
    }

    pub async fn read_stream_until_response_message(
        &mut self,
        request_id: RequestId,
    ) -> anyhow::Result<JsonRpcResponse<Value>> {
        eprintln!("in read_stream_until_response_message({request_id:?})");

        loop {
            let message = self.read_jsonrpc_message().await?;
            match message {
                JsonRpcMessage::Notification(_) => {
                    eprintln!("notification: {message:?}");
                }
                JsonRpcMessage::Request(_) => {
                    anyhow::bail!("unexpected JSONRPCMessage::Request: {message:?}");
                }
                JsonRpcMessage::Error(_) => {
                    anyhow::bail!("unexpected JSONRPCMessage::Error: {message:?}");
                }
                JsonRpcMessage::Response(jsonrpc_response) => {
                    if jsonrpc_response.id == request_id {
                        return Ok(jsonrpc_response);
                    }
                }
            }
        }
    }

    pub async fn read_stream_until_error_message(
        &mut self,
        request_id: RequestId,
    ) -> anyhow::Result<JsonRpcError> {
        eprintln!("in read_stream_until_error_message({request_id:?})");

        loop {
            let message = self.read_jsonrpc_message().await?;
            match message {
                JsonRpcMessage::Notification(_) => {
                    eprintln!("notification: {message:?}");
                }
                JsonRpcMessage::Request(_) => {
                    anyhow::bail!("unexpected JSONRPCMessage::Request: {message:?}");
                }
                JsonRpcMessage::Response(_) => {
                    anyhow::bail!("unexpected JSONRPCMessage::Response: {message:?}");
                }
                JsonRpcMessage::Error(err) => {
                    if err.id == request_id {
                        return Ok(err);
                    }
                }
            }
        }
    }

    /// Closes stdin and waits for the server to exit on its own, returning
    /// everything it wrote to stderr.
    pub async fn close_stdin_and_wait(mut self) -> anyhow::Result<ProcessExit> {
        drop(self.stdin.take());

        let status = tokio::time::timeout(DEFAULT_READ_TIMEOUT, self.process.wait())
            .await
            .context("server should exit after stdin closes")??;
        let stderr = match self.stderr_task.take() {
            Some(task) => tokio::time::timeout(DEFAULT_READ_TIMEOUT, task)
                .await
                .context("stderr should reach EOF after exit")??,
            None => Vec::new(),
        };
        Ok(ProcessExit { status, stderr })
    }
}

impl Drop for McpProcess {
    fn drop(&mut self) {
        // Tokio documents kill-on-drop as best-effort, so the child may still
        // be alive when teardown continues. Drop can't be async; request
        // termination and poll `try_wait()` for a bounded time instead.
        let _ = self.process.start_kill();

        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_secs(5);
        while start.elapsed() < timeout {
            match self.process.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => std::thread::sleep(std::time::Duration::from_millis(10)),
                Err(_) => return,
            }
        }
    }
}

/// Returns an absolute path to a binary target built for the current test
/// run.
fn cargo_bin(name: &str) -> anyhow::Result<PathBuf> {
    // Cargo replaces dashes in target names when exporting env vars.
    let keys = [
        format!("CARGO_BIN_EXE_{name}"),
        format!("CARGO_BIN_EXE_{}", name.replace('-', "_")),
    ];
    if let Some(path) = keys
        .iter()
        .filter_map(std::env::var_os)
        .map(PathBuf::from)
        .find(|path| path.is_absolute() && path.exists())
    {
        return Ok(path);
    }

    let cmd = assert_cmd::Command::cargo_bin(name)
        .with_context(|| format!("could not locate binary {name:?}; tried env vars {keys:?}"))?;
    let mut path = PathBuf::from(cmd.get_program());
    if !path.is_absolute() {
        path = std::env::current_dir()?.join(path);
    }
    anyhow::ensure!(path.exists(), "{name} resolved to {path:?}, but it does not exist");
    Ok(path)
}
