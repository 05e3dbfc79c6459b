//! Line-delimited JSON-RPC 2.0 tool server.
//!
//! Each request is one line on the reader and each response one line on the
//! writer. Requests are served concurrently, so responses may come back in a
//! different order than the requests arrived. Notifications (requests without
//! an id) are never answered.

use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use sec_gemini::models::tool::ToolCall;
use sec_gemini::{SecuritySystem, ToolError, API_KEY_ENV_VAR};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "sec-gemini";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct Request {
    /// `None` only when the member is absent; `"id": null` is still a request
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct McpServer {
    system: Option<SecuritySystem>,
}

impl McpServer {
    /// `system` is `None` when no credential is configured
    pub fn new(system: Option<SecuritySystem>) -> Self {
        Self { system }
    }

    /// Serve requests until the reader is exhausted, then wait for the
    /// requests still in flight.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if !line.trim().is_empty() {
                        self.spawn_request(line, tx.clone());
                    }
                }
                Some(response) = rx.recv() => write_line(&mut writer, &response).await?,
            }
        }

        tracing::debug!("stdin closed, waiting for in-flight requests");
        drop(tx);
        while let Some(response) = rx.recv().await {
            write_line(&mut writer, &response).await?;
        }
        Ok(())
    }

    fn spawn_request(&self, line: String, tx: mpsc::UnboundedSender<Value>) {
        let server = self.clone();
        tokio::spawn(async move {
            if let Some(response) = server.handle_line(&line).await {
                // the receiver is gone only when the writer already failed
                let _ = tx.send(response);
            }
        });
    }

    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Unparseable request: {}", e);
                return Some(error_response(
                    Value::Null,
                    RpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ));
            }
        };

        let request: Request = match Request::deserialize(&value) {
            Ok(request) => request,
            Err(e) => {
                let id = value.get("id").cloned().unwrap_or(Value::Null);
                return Some(error_response(
                    id,
                    RpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
                ));
            }
        };

        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "notification");
            return None;
        };

        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            Err(error) => error_response(id, error),
        };
        Some(response)
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({"tools": SecuritySystem::tool_definitions()})),
            "tools/call" => {
                let call: ToolCall = serde_json::from_value(params)
                    .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))?;
                Ok(self.call_tool(call).await)
            }
            _ => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            )),
        }
    }

    /// Tool failures are reported to the agent as error content, not as
    /// protocol errors.
    async fn call_tool(&self, call: ToolCall) -> Value {
        let Some(system) = &self.system else {
            return tool_result(
                format!("Error: {} environment variable not set", API_KEY_ENV_VAR),
                true,
            );
        };

        match system.call(call).await {
            Ok(text) => tool_result(text, false),
            Err(ToolError::ToolNotFound(name)) => {
                tool_result(format!("Error: Unknown tool '{}'", name), true)
            }
            Err(e) => {
                tracing::error!("Tool call failed: {}", e);
                tool_result(format!("Error executing tool: {}", e), true)
            }
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, response: &Value) -> io::Result<()> {
    let mut bytes = serde_json::to_vec(response)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error,
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": error.code, "message": error.message},
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sec_gemini::{
        AnalysisError, AnalysisResult, Analyzer, GenerateRequest, GenerateResponse, Message,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Answers every request with the same findings
    struct FixedAnalyzer {
        reply: Option<Vec<&'static str>>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Analyzer for FixedAnalyzer {
        async fn generate(&self, request: &GenerateRequest) -> AnalysisResult<GenerateResponse> {
            let prompt = request.messages[0].content().unwrap_or_default().to_string();
            self.prompts.lock().unwrap().push(prompt);
            match &self.reply {
                Some(contents) => Ok(GenerateResponse {
                    messages: contents.iter().map(|c| Message::result(*c)).collect(),
                }),
                None => Err(AnalysisError::Cancelled),
            }
        }
    }

    fn server(reply: Option<Vec<&'static str>>) -> (Arc<FixedAnalyzer>, McpServer) {
        let analyzer = Arc::new(FixedAnalyzer {
            reply,
            prompts: Mutex::new(Vec::new()),
        });
        let system = SecuritySystem::new(analyzer.clone());
        (analyzer, McpServer::new(Some(system)))
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let (_, server) = server(Some(vec![]));

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":"two","method":"tools/list"}"#)
            .await
            .unwrap();
        assert_eq!(response["id"], "two");
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[2]["name"], "audit_contract");
        assert_eq!(tools[2]["inputSchema"]["required"], json!(["contract_code"]));
    }

    #[tokio::test]
    async fn test_tools_list_without_credential() {
        let server = McpServer::new(None);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
            .await
            .unwrap();
        assert_eq!(response["result"]["tools"].as_array().unwrap().len(), 3);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"query_security","arguments":{"query":"q"}}}"#)
            .await
            .unwrap();
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(
            response["result"]["content"][0]["text"],
            "Error: SEC_GEMINI_API_KEY environment variable not set"
        );
    }

    #[tokio::test]
    async fn test_tool_call_returns_joined_text() {
        let (analyzer, server) = server(Some(vec!["Finding one", "", "Finding two"]));

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"audit_contract","arguments":{"contract_code":"contract C {}","blockchain":"solana"}}}"#)
            .await
            .unwrap();

        assert_eq!(response["result"]["isError"], false);
        assert_eq!(
            response["result"]["content"][0]["text"],
            "Finding one\nFinding two"
        );
        let prompts = analyzer.prompts.lock().unwrap();
        assert!(prompts[0].contains("smart contract for solana"));
    }

    #[tokio::test]
    async fn test_tool_failures_are_error_content() {
        let (_, server) = server(None);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"scan","arguments":{}}}"#)
            .await
            .unwrap();
        assert_eq!(response["result"]["content"][0]["text"], "Error: Unknown tool 'scan'");
        assert_eq!(response["result"]["isError"], true);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"query_security","arguments":{"query":"q"}}}"#)
            .await
            .unwrap();
        assert_eq!(
            response["result"]["content"][0]["text"],
            "Error executing tool: Analysis cancelled"
        );

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"query_security"}}"#)
            .await
            .unwrap();
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("Error executing tool: Invalid parameters"));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let (_, server) = server(Some(vec![]));

        let response = server.handle_line("{not json").await.unwrap();
        assert_eq!(response["error"]["code"], PARSE_ERROR);
        assert!(response["id"].is_null());

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"arguments":{}}}"#)
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], INVALID_PARAMS);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":6,"params":{}}"#)
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], INVALID_REQUEST);
        assert_eq!(response["id"], 6);

        let response = server.handle_line("[1, 2]").await.unwrap();
        assert_eq!(response["error"]["code"], INVALID_REQUEST);
        assert!(response["id"].is_null());
    }

    #[tokio::test]
    async fn test_null_id_is_answered() {
        let (_, server) = server(Some(vec![]));

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .unwrap();
        assert!(response["id"].is_null());
        assert_eq!(response["result"], json!({}));

        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","method":"ping"}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_run_skips_notifications() {
        let (_, server) = server(Some(vec![]));
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();

        server.run(input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        let ping = responses.iter().find(|r| r["id"] == 2).unwrap();
        assert_eq!(ping["result"], json!({}));
        let init = responses.iter().find(|r| r["id"] == 1).unwrap();
        assert_eq!(init["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    /// Never answers
    struct StuckAnalyzer;

    #[async_trait]
    impl Analyzer for StuckAnalyzer {
        async fn generate(&self, _request: &GenerateRequest) -> AnalysisResult<GenerateResponse> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_slow_tool_call_does_not_block_ping() {
        let server = McpServer::new(Some(SecuritySystem::new(Arc::new(StuckAnalyzer))));
        let (mut client_in, server_in) = tokio::io::duplex(4096);
        let (server_out, client_out) = tokio::io::duplex(4096);
        let handle = tokio::spawn(async move {
            server
                .run(tokio::io::BufReader::new(server_in), server_out)
                .await
        });

        client_in
            .write_all(
                concat!(
                    r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"query_security","arguments":{"query":"q"}}}"#,
                    "\n",
                    r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
                    "\n",
                )
                .as_bytes(),
            )
            .await
            .unwrap();

        let mut responses = tokio::io::BufReader::new(client_out).lines();
        let line = tokio::time::timeout(Duration::from_secs(2), responses.next_line())
            .await
            .expect("ping was not answered while a tool call was running")
            .unwrap()
            .unwrap();
        let response: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(response["id"], 2);
        assert_eq!(response["result"], json!({}));

        handle.abort();
    }

    #[tokio::test]
    async fn test_run_waits_for_in_flight_calls_at_eof() {
        let (_, server) = server(Some(vec!["done"]));
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"query_security","arguments":{"query":"q"}}}"#,
            "\n",
        );
        let mut output = Vec::new();

        server.run(input.as_bytes(), &mut output).await.unwrap();

        let response: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(response["result"]["content"][0]["text"], "done");
    }
}
