use mcp_test_support::DEFAULT_READ_TIMEOUT;
use mcp_test_support::McpProcess;
use pretty_assertions::assert_eq;
use rmcp::model::ErrorCode;
use rmcp::model::RequestId;
use serde_json::json;
use thinking_mcp_server::DISABLE_THOUGHT_LOGGING_ENV_VAR;
use tokio::time::timeout;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_lines_are_skipped() -> anyhow::Result<()> {
    let mut mcp = McpProcess::new().await?;

    mcp.send_raw_line("this is not json").await?;
    mcp.send_raw_line("").await?;
    timeout(DEFAULT_READ_TIMEOUT, mcp.initialize()).await??;

    let request_id = mcp.send_request("ping", None).await?;
    let response = timeout(
        DEFAULT_READ_TIMEOUT,
        mcp.read_stream_until_response_message(RequestId::Number(request_id)),
    )
    .await??;
    assert_eq!(response.result, json!({}));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_initialize_is_rejected() -> anyhow::Result<()> {
    let mut mcp = McpProcess::new().await?;
    timeout(DEFAULT_READ_TIMEOUT, mcp.initialize()).await??;

    let request_id = mcp
        .send_request(
            "initialize",
            Some(json!({
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "again", "version": "0.0.0" },
            })),
        )
        .await?;
    let err = timeout(
        DEFAULT_READ_TIMEOUT,
        mcp.read_stream_until_error_message(RequestId::Number(request_id)),
    )
    .await??;
    assert_eq!(err.error.code, ErrorCode::INVALID_REQUEST);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsupported_method_is_method_not_found() -> anyhow::Result<()> {
    let mut mcp = McpProcess::new().await?;
    timeout(DEFAULT_READ_TIMEOUT, mcp.initialize()).await??;

    let request_id = mcp.send_request("sampling/anything", None).await?;
    let err = timeout(
        DEFAULT_READ_TIMEOUT,
        mcp.read_stream_until_error_message(RequestId::Number(request_id)),
    )
    .await??;
    assert_eq!(err.error.code, ErrorCode::METHOD_NOT_FOUND);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn eof_prints_session_summary_when_logging_enabled() -> anyhow::Result<()> {
    let mut mcp = McpProcess::new_with_env(&[(DISABLE_THOUGHT_LOGGING_ENV_VAR, None)]).await?;
    timeout(DEFAULT_READ_TIMEOUT, mcp.initialize()).await??;

    let request_id = mcp
        .send_think_tool_call(json!({
            "thought": "Only thought",
            "nextThoughtNeeded": false,
            "thoughtNumber": 1,
            "totalThoughts": 1,
        }))
        .await?;
    timeout(
        DEFAULT_READ_TIMEOUT,
        mcp.read_stream_until_response_message(RequestId::Number(request_id)),
    )
    .await??;

    let exit = mcp.close_stdin_and_wait().await?;
    assert!(exit.status.success(), "{exit:?}");

    let stderr = exit.stderr.join("\n");
    assert!(stderr.contains("Sequential Thinking MCP Server Started"));
    assert!(stderr.contains("💭 Thought 1/1"));
    assert!(stderr.contains("📚 Thinking Session Summary"));
    assert!(stderr.contains("✅ Thought 1: Only thought"));
    assert!(stderr.contains("Status: Complete"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disabled_thought_logging_keeps_panels_off_stderr() -> anyhow::Result<()> {
    let mut mcp = McpProcess::new().await?;
    timeout(DEFAULT_READ_TIMEOUT, mcp.initialize()).await??;

    let request_id = mcp
        .send_think_tool_call(json!({
            "thought": "Quiet thought",
            "nextThoughtNeeded": false,
            "thoughtNumber": 1,
            "totalThoughts": 1,
        }))
        .await?;
    timeout(
        DEFAULT_READ_TIMEOUT,
        mcp.read_stream_until_response_message(RequestId::Number(request_id)),
    )
    .await??;

    let exit = mcp.close_stdin_and_wait().await?;
    assert!(exit.status.success(), "{exit:?}");
    let stderr = exit.stderr.join("\n");
    assert!(!stderr.contains("💭 Thought"));
    assert!(!stderr.contains("📚 Thinking Session Summary"));
    Ok(())
}
