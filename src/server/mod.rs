//! JSON-RPC 2.0 line-delimited stdio protocol server: a thin wrapper, not part of the core. New code — the teacher
//! has no RPC surface at all — grounded on `codanna`'s own MCP stdio server
//! shape (one request per line, dispatch by method name, JSON-RPC error
//! codes) generalized to this crate's `Registry`/`Provider` core.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::registry::Provider;

pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INTERNAL_ERROR: i64 = -32603;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Response { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Response { jsonrpc: "2.0", id, result: None, error: Some(RpcError { code, message: message.into() }) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// The stateful side of the server: whatever backs `initialize`/`status`.
/// Implemented by whatever owns a [`crate::registry::Registry`] — kept as a
/// trait so the server can be driven by tests without a real indexer.
pub trait ServerContext {
    fn initialize(&mut self, root_path: &str, language_id: &str) -> Result<(), String>;
    fn provider(&self) -> &dyn Provider;
    fn status(&self) -> Value;
    fn notify_file_changed(&mut self, path: &str);
}

/// Run the server loop against `stdin`/`stdout`, one JSON object per line,
/// until `shutdown` is received or the input stream closes.
pub fn run_stdio(mut ctx: impl ServerContext, input: impl BufRead, mut output: impl Write) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&mut ctx, &line);
        let _ = writeln!(output, "{}", serde_json::to_string(&response).unwrap_or_default());
        let _ = output.flush();
        if matches!(response.result, Some(Value::String(ref s)) if s == "shutting down") {
            break;
        }
    }
}

fn handle_line(ctx: &mut impl ServerContext, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => return Response::err(Value::Null, INVALID_PARAMS, format!("invalid request: {e}")),
    };
    dispatch(ctx, request)
}

fn dispatch(ctx: &mut impl ServerContext, request: Request) -> Response {
    let id = request.id;
    match request.method.as_str() {
        "initialize" => {
            let root_path = request.params.get("root_path").and_then(Value::as_str).unwrap_or_default();
            let language_id = request.params.get("language_id").and_then(Value::as_str).unwrap_or_default();
            match ctx.initialize(root_path, language_id) {
                Ok(()) => Response::ok(id, json!({"ok": true})),
                Err(message) => Response::err(id, INTERNAL_ERROR, message),
            }
        }
        "query" => {
            let Some(query) = request.params.get("query").and_then(Value::as_str) else {
                return Response::err(id, INVALID_PARAMS, "missing `query` param");
            };
            let result = crate::query::run(ctx.provider(), query);
            Response::ok(id, result.to_json())
        }
        "status" => Response::ok(id, ctx.status()),
        "shutdown" => Response::ok(id, json!("shutting down")),
        "file/didChange" => {
            let Some(path) = request.params.get("path").and_then(Value::as_str) else {
                return Response::err(id, INVALID_PARAMS, "missing `path` param");
            };
            ctx.notify_file_changed(path);
            Response::ok(id, json!({"ok": true}))
        }
        other => Response::err(id, METHOD_NOT_FOUND, format!("unknown method: {other}")),
    }
}

/// Render a [`crate::query::wire::QueryResult`] as plain text for the
/// `format: "text"` request option, not attempted by the JSON wire shapes.
pub fn render_text(result: &crate::query::wire::QueryResult) -> String {
    use crate::query::wire::QueryResult as R;
    match result {
        R::Definition { count, results } => {
            let mut out = format!("{count} definition(s)\n");
            for entry in results {
                out.push_str(&format!(
                    "  {} ({}) {}:{}\n",
                    entry.name,
                    entry.kind,
                    entry.file.as_deref().unwrap_or("?"),
                    entry.line.unwrap_or(-1)
                ));
            }
            out
        }
        R::NotFound { message } | R::Error { message } => message.clone(),
        other => other.to_json().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use std::io::Cursor;

    struct TestContext {
        registry: Registry,
        initialized: bool,
    }

    impl ServerContext for TestContext {
        fn initialize(&mut self, _root_path: &str, _language_id: &str) -> Result<(), String> {
            self.initialized = true;
            Ok(())
        }

        fn provider(&self) -> &dyn Provider {
            &self.registry
        }

        fn status(&self) -> Value {
            json!({"initialized": self.initialized})
        }

        fn notify_file_changed(&mut self, _path: &str) {}
    }

    #[test]
    fn unknown_method_returns_method_not_found() {
        let mut ctx = TestContext { registry: Registry::new(), initialized: false };
        let response = handle_line(&mut ctx, r#"{"id":1,"method":"bogus","params":{}}"#);
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[test]
    fn status_reports_initialized_after_initialize_call() {
        let mut ctx = TestContext { registry: Registry::new(), initialized: false };
        let _ = handle_line(&mut ctx, r#"{"id":1,"method":"initialize","params":{"root_path":"/p","language_id":"dart"}}"#);
        let response = handle_line(&mut ctx, r#"{"id":2,"method":"status","params":{}}"#);
        assert_eq!(response.result.unwrap()["initialized"], true);
    }

    #[test]
    fn run_stdio_processes_lines_until_shutdown() {
        let ctx = TestContext { registry: Registry::new(), initialized: false };
        let input = Cursor::new(b"{\"id\":1,\"method\":\"status\",\"params\":{}}\n{\"id\":2,\"method\":\"shutdown\",\"params\":{}}\n".to_vec());
        let mut output = Vec::new();
        run_stdio(ctx, input, &mut output);
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
