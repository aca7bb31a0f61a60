use std::num::NonZeroU64;
use std::time::Duration;

use mcp::{Error, JsonObject, McpConnection, ServerConfig, ToolServer};

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

fn scripted_config() -> ServerConfig {
    ServerConfig::new("scripted", "sh").arg(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/scripted_server.sh"
    ))
}

async fn scripted_server() -> McpConnection {
    McpConnection::connect(scripted_config())
        .unwrap()
        .initialize()
        .await
        .unwrap()
}

#[tokio::test]
async fn lists_and_calls_tools() {
    let server = scripted_server().await;

    let names: Vec<String> = server
        .list_tools()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["echo", "fail", "die"]);

    let output = server
        .call_tool("echo", JsonObject::new(), CALL_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(output, "pong");

    server.close().await.unwrap();
}

#[tokio::test]
async fn tool_error_result_is_an_execution_failure() {
    let server = scripted_server().await;

    let err = server
        .call_tool("fail", JsonObject::new(), CALL_TIMEOUT)
        .await
        .unwrap_err();
    assert!(
        matches!(&err, Error::ToolExecution { tool, message } if tool == "fail" && message == "bad input"),
        "unexpected error: {err}"
    );
    assert_eq!(err.to_string(), "tool fail failed: bad input");
    assert!(server.is_usable());

    server.close().await.unwrap();
}

#[tokio::test]
async fn unadvertised_tool_fails_without_a_request() {
    let server = scripted_server().await;
    server.list_tools().await.unwrap();

    let err = server
        .call_tool("get_weather", JsonObject::new(), CALL_TIMEOUT)
        .await
        .unwrap_err();
    assert!(
        matches!(&err, Error::ToolNotFound { server, tool } if server == "scripted" && tool == "get_weather"),
        "unexpected error: {err}"
    );
    assert!(server.is_usable());

    server.close().await.unwrap();
}

#[tokio::test]
async fn server_exit_breaks_the_connection() {
    let server = scripted_server().await;

    let err = server
        .call_tool("die", JsonObject::new(), CALL_TIMEOUT)
        .await
        .unwrap_err();
    assert!(
        matches!(&err, Error::Transport { .. }),
        "unexpected error: {err}"
    );
    assert!(!server.is_usable());

    let err = server.list_tools().await.unwrap_err();
    assert!(
        err.to_string().contains("connection is closed or broken"),
        "unexpected error: {err}"
    );

    server.close().await.unwrap();
}

#[tokio::test]
async fn close_is_idempotent() {
    let server = scripted_server().await;

    server.close().await.unwrap();
    assert!(!server.is_usable());
    server.close().await.unwrap();
}

#[tokio::test]
async fn silent_server_fails_the_handshake_and_is_killed() {
    let config = ServerConfig::new("mute", "sleep")
        .arg("30")
        .with_timeout_secs(NonZeroU64::MIN);
    let pending = McpConnection::connect(config).unwrap();
    let pid = pending.id().unwrap();

    let err = pending.initialize().await.err().unwrap();
    assert!(
        matches!(&err, Error::Handshake { server, .. } if server == "mute"),
        "unexpected error: {err}"
    );

    #[cfg(target_os = "linux")]
    assert!(
        !std::path::Path::new(&format!("/proc/{pid}")).exists(),
        "server process {pid} outlived the failed handshake"
    );
    #[cfg(not(target_os = "linux"))]
    let _ = pid;
}
