//! Private JSON-RPC client for Mopidy server communication
//!
//! This crate provides a minimal JSON-RPC 2.0 client specifically designed
//! for talking to the Mopidy HTTP frontend (`/mopidy/rpc`). Higher layers
//! depend on the [`RpcTransport`] trait rather than on the concrete client so
//! that any transport (HTTP, WebSocket, an in-memory fake) can be plugged in.

mod error;

pub use error::RpcError;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{json, Value};

/// Path of the JSON-RPC endpoint on a Mopidy server
pub const RPC_PATH: &str = "mopidy/rpc";

/// Anything able to execute a named remote procedure call
pub trait RpcTransport: Send + Sync {
    /// Call `method` with named `params` and return the raw `result` value
    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// A minimal JSON-RPC client for the Mopidy HTTP frontend
#[derive(Debug)]
pub struct RpcClient {
    agent: ureq::Agent,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a new client for `host:port` with default timeouts
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_timeouts(host, port, Duration::from_secs(5), Duration::from_secs(10))
    }

    /// Create a client with explicit connect/read timeouts
    pub fn with_timeouts(host: &str, port: u16, connect: Duration, read: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(connect)
                .timeout_read(read)
                .build(),
            url: format!("http://{}:{}/{}", host, port, RPC_PATH),
            next_id: AtomicU64::new(1),
        }
    }

    /// The full endpoint url requests are posted to
    pub fn url(&self) -> &str {
        &self.url
    }

    fn send(&self, body: &Value) -> Result<Value, RpcError> {
        let response = match self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_json(body)
        {
            Ok(response) => response,
            // Some servers answer errors with a non-2xx status but still a JSON-RPC body
            Err(ureq::Error::Status(code, response)) => {
                return response.into_json::<Value>().map_err(|_| RpcError::Http(code));
            }
            Err(e) => return Err(RpcError::Network(e.to_string())),
        };

        response
            .into_json::<Value>()
            .map_err(|e| RpcError::Parse(e.to_string()))
    }
}

impl RpcTransport for RpcClient {
    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = build_request(id, method, params);
        let reply = self.send(&body)?;
        extract_response(reply, id)
    }
}

/// Build a JSON-RPC 2.0 request envelope
pub fn build_request(id: u64, method: &str, params: Value) -> Value {
    let params = match params {
        Value::Null => json!({}),
        other => other,
    };
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Extract the `result` member or map the `error` member to a fault
pub fn extract_response(mut reply: Value, id: u64) -> Result<Value, RpcError> {
    let object = reply
        .as_object_mut()
        .ok_or_else(|| RpcError::Parse("Response is not a JSON object".to_string()))?;

    // Check for an error object first
    if let Some(error) = object.remove("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32000);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        return Err(RpcError::Fault { code, message });
    }

    match object.get("id").and_then(Value::as_u64) {
        Some(reply_id) if reply_id == id => {}
        Some(reply_id) => {
            return Err(RpcError::Parse(format!(
                "Response id {} does not match request id {}",
                reply_id, id
            )))
        }
        None => return Err(RpcError::Parse("Missing id member".to_string())),
    }

    object
        .remove("result")
        .ok_or_else(|| RpcError::Parse("Missing result member".to_string()))
}
