//! Stdio tool server.
//!
//! Speaks line-delimited JSON-RPC 2.0: one message per line on stdin, one
//! reply per line on stdout. Logging goes to stderr so it never interleaves
//! with protocol output.
//!
//! ## Methods
//!
//! | Method | Result |
//! |---|---|
//! | `initialize` | protocol version, `{ tools: {} }` capabilities, server info |
//! | `ping` | `{}` |
//! | `tools/list` | `{ tools: [{ name, description, inputSchema }] }` |
//! | `tools/call` | the tool's `{ content, isError? }` response |
//!
//! Notifications (messages without an `id` member) never get a reply. Requests
//! are handled one at a time, in arrival order. A line that is not valid UTF-8
//! gets a parse error reply like any other malformed line.

pub mod protocol;

use crate::imaging::ImageBackend;
use crate::tools::{PathRules, Registry, ToolContext, ToolError, ToolResponse};
use protocol::{
    CallParams, DEFAULT_PROTOCOL_VERSION, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR, Request, Response, RpcError,
};
use serde_json::{Value, json};
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct Server<B: ImageBackend> {
    name: String,
    backend: B,
    paths: PathRules,
    registry: Registry,
}

impl<B: ImageBackend> Server<B> {
    pub fn new(backend: B) -> Self {
        Self {
            name: "ImageProcessor".to_string(),
            backend,
            paths: PathRules::default(),
            registry: Registry::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_paths(mut self, paths: PathRules) -> Self {
        self.paths = paths;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Handle one input line. Returns the reply, if the message needs one.
    pub fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unparseable message");
                return Some(Response::failure(
                    Value::Null,
                    RpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
                ));
            }
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);

        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(Response::failure(
                    id,
                    RpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")),
                ));
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(Response::failure(
                id,
                RpcError::new(INVALID_REQUEST, "Invalid request: jsonrpc must be \"2.0\""),
            ));
        }

        if request.is_notification() {
            debug!(method = %request.method, "notification");
            return None;
        }

        debug!(method = %request.method, "request");
        Some(match self.dispatch(&request) {
            Ok(result) => Response::success(id, result),
            Err(error) => Response::failure(id, error),
        })
    }

    fn dispatch(&self, request: &Request) -> Result<Value, RpcError> {
        match request.method.as_str() {
            "initialize" => Ok(self.initialize(&request.params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.registry.descriptors() })),
            "tools/call" => self.call_tool(request.params.clone()),
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    fn initialize(&self, params: &Value) -> Value {
        let version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        info!(protocol = version, "client initialized");
        json!({
            "protocolVersion": version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": self.name,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    fn call_tool(&self, params: Value) -> Result<Value, RpcError> {
        let call: CallParams = serde_json::from_value(params)
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))?;
        let ctx = ToolContext::new(&self.backend).with_paths(self.paths);

        let response = match self.registry.call(&call.name, &ctx, call.arguments) {
            Ok(response) => response,
            Err(ToolError::Precheck(message)) => ToolResponse::error(message),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "request rejected");
                return Err(RpcError::new(INVALID_PARAMS, e.to_string()));
            }
        };
        serde_json::to_value(response).map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))
    }

    /// Serve until `reader` reaches EOF.
    pub fn serve<R: BufRead, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
    ) -> Result<(), ServerError> {
        info!(name = %self.name, "serving on stdio");
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let reply = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line),
                Err(e) => {
                    warn!(error = %e, "message is not valid UTF-8");
                    Some(Response::failure(
                        Value::Null,
                        RpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
                    ))
                }
            };
            if let Some(response) = reply {
                serde_json::to_writer(&mut writer, &response)?;
                writer.write_all(b"\n")?;
                writer.flush()?;
            }
        }
        info!("input closed, shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::tools::resize::RATIO_MISMATCH;
    use std::io::Cursor;

    fn server() -> Server<MockBackend> {
        Server::new(MockBackend::new())
    }

    fn reply(server: &Server<MockBackend>, message: Value) -> Value {
        let response = server.handle_line(&message.to_string()).unwrap();
        serde_json::to_value(response).unwrap()
    }

    fn call(server: &Server<MockBackend>, name: &str, arguments: Value) -> Value {
        reply(
            server,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": { "name": name, "arguments": arguments }
            }),
        )
    }

    // =========================================================================
    // Handshake
    // =========================================================================

    #[test]
    fn initialize_echoes_client_protocol_version() {
        let value = reply(
            &server().with_name("studio"),
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": { "protocolVersion": "2025-03-26" }
            }),
        );
        assert_eq!(value["id"], json!(1));
        assert_eq!(value["result"]["protocolVersion"], json!("2025-03-26"));
        assert_eq!(value["result"]["capabilities"], json!({ "tools": {} }));
        assert_eq!(value["result"]["serverInfo"]["name"], json!("studio"));
    }

    #[test]
    fn initialize_defaults_protocol_version() {
        let value = reply(
            &server(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" }),
        );
        assert_eq!(
            value["result"]["protocolVersion"],
            json!(DEFAULT_PROTOCOL_VERSION)
        );
        assert_eq!(value["result"]["serverInfo"]["name"], json!("ImageProcessor"));
    }

    #[test]
    fn notifications_get_no_reply() {
        let server = server();
        assert!(
            server
                .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .is_none()
        );
        assert!(
            server
                .handle_line(r#"{"jsonrpc":"2.0","method":"something/unknown"}"#)
                .is_none()
        );
    }

    #[test]
    fn ping_returns_empty_object() {
        let value = reply(&server(), json!({ "jsonrpc": "2.0", "id": "p", "method": "ping" }));
        assert_eq!(value["id"], json!("p"));
        assert_eq!(value["result"], json!({}));
    }

    #[test]
    fn blank_lines_ignored() {
        assert!(server().handle_line("   ").is_none());
    }

    // =========================================================================
    // Framing errors
    // =========================================================================

    #[test]
    fn malformed_json_is_parse_error() {
        let response = server().handle_line("{not json").unwrap();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
    }

    #[test]
    fn missing_method_is_invalid_request() {
        let value = reply(&server(), json!({ "jsonrpc": "2.0", "id": 3 }));
        assert_eq!(value["id"], json!(3));
        assert_eq!(value["error"]["code"], json!(INVALID_REQUEST));
    }

    #[test]
    fn wrong_version_is_invalid_request() {
        let value = reply(&server(), json!({ "jsonrpc": "1.0", "id": 3, "method": "ping" }));
        assert_eq!(value["error"]["code"], json!(INVALID_REQUEST));
    }

    #[test]
    fn unknown_method_not_found() {
        let value = reply(
            &server(),
            json!({ "jsonrpc": "2.0", "id": 4, "method": "resources/list" }),
        );
        assert_eq!(value["error"]["code"], json!(METHOD_NOT_FOUND));
    }

    // =========================================================================
    // Tools
    // =========================================================================

    #[test]
    fn tools_list_describes_all_tools() {
        let value = reply(
            &server(),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
        );
        let tools = value["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 6);
        for tool in tools {
            assert!(tool["name"].as_str().unwrap().starts_with("image."));
            assert!(tool["inputSchema"].is_object());
        }
    }

    #[test]
    fn tools_call_returns_text_content() {
        let server = server();
        let value = call(
            &server,
            "image.rotateFlip",
            json!({ "imagesPath": ["/s/a.png"], "rotateAngle": 90 }),
        );
        assert_eq!(value["id"], json!(7));
        assert_eq!(
            value["result"],
            json!({
                "content": [{
                    "type": "text",
                    "text": "Processed /s/a.png \u{2192} /s/a_rotatedFlipped.png"
                }]
            })
        );
        assert_eq!(server.backend().processed().len(), 1);
    }

    #[test]
    fn per_item_failures_are_not_errors() {
        let server = Server::new(MockBackend::new().failing("/s/b.png", "Input file is missing"));
        let value = call(
            &server,
            "image.compressOptimize",
            json!({ "imagesPath": ["/s/a.png", "/s/b.png"] }),
        );
        assert!(value.get("error").is_none());
        assert!(value["result"].get("isError").is_none());
        assert_eq!(
            value["result"]["content"][1]["text"],
            json!("Failed to compress /s/b.png: Input file is missing")
        );
    }

    #[test]
    fn unknown_tool_is_invalid_params() {
        let value = call(&server(), "image.sepia", json!({ "imagesPath": ["/a.png"] }));
        assert_eq!(value["error"]["code"], json!(INVALID_PARAMS));
    }

    #[test]
    fn validation_failure_is_invalid_params() {
        let server = server();
        let value = call(
            &server,
            "image.postProcess",
            json!({ "imagesPath": ["/a.png"], "brightness": 3 }),
        );
        assert_eq!(value["error"]["code"], json!(INVALID_PARAMS));
        assert!(value["error"]["message"].as_str().unwrap().contains("brightness"));
        assert!(server.backend().get_operations().is_empty());
    }

    #[test]
    fn ratio_mismatch_is_tool_error_result() {
        let server = Server::new(MockBackend::new().with_dimensions("/s/w.png", 250, 100));
        let value = call(
            &server,
            "image.resize",
            json!({ "imagesPath": ["/s/w.png"], "width": 200, "height": 100 }),
        );
        assert_eq!(value["result"]["isError"], json!(true));
        assert_eq!(value["result"]["content"][0]["text"], json!(RATIO_MISMATCH));
    }

    #[test]
    fn unreadable_precheck_image_is_tool_error_result() {
        let value = call(
            &server(),
            "image.resize",
            json!({ "imagesPath": ["/s/none.png"], "width": 200, "height": 100 }),
        );
        assert_eq!(value["result"]["isError"], json!(true));
    }

    #[test]
    fn relative_paths_follow_path_rules() {
        let strict = call(
            &server(),
            "image.rotateFlip",
            json!({ "imagesPath": ["a.png"], "flipVertical": true }),
        );
        assert_eq!(strict["error"]["code"], json!(INVALID_PARAMS));

        let lenient = server().with_paths(PathRules {
            require_absolute: false,
            normalize_separators: true,
        });
        let value = call(
            &lenient,
            "image.rotateFlip",
            json!({ "imagesPath": ["a.png"], "flipVertical": true }),
        );
        assert!(value.get("result").is_some());
    }

    // =========================================================================
    // serve loop
    // =========================================================================

    #[test]
    fn serve_writes_one_line_per_request() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();
        server().serve(Cursor::new(input), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], json!(1));
        assert_eq!(lines[1]["id"], json!(2));
    }

    #[test]
    fn serve_survives_invalid_utf8() {
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.push(b'\n');
        let mut output = Vec::new();
        server().serve(Cursor::new(input), &mut output).unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["error"]["code"], json!(PARSE_ERROR));
        assert_eq!(lines[0]["id"], Value::Null);
        assert_eq!(lines[1]["id"], json!(2));
        assert_eq!(lines[1]["result"], json!({}));
    }

    #[test]
    fn null_id_request_gets_reply() {
        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .expect("null id is not a notification");
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.result, Some(json!({})));
    }
}
