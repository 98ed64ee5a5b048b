/*!
JSON-RPC plumbing: the request envelope, error bodies, wait modes and the
client built on top of them.
*/
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum::{Display, EnumString};

pub mod client;
pub mod retry;
pub mod transport;

/// JSON-RPC protocol version sent with every request
pub const JSON_RPC_VERSION: &str = "2.0";
/// The node ignores the request id, every request uses the same one
pub const REQUEST_ID: &str = "dontcare";

/// Error causes that describe a node side timeout rather than a rejection
pub const TRANSIENT_CAUSES: [&str; 2] = ["TIMEOUT_ERROR", "NO_SYNCED_BLOCKS"];

/// Builds the request envelope for `method`
pub fn envelope(method: &str, params: Value) -> Value {
	json!({
		"jsonrpc": JSON_RPC_VERSION,
		"id": REQUEST_ID,
		"method": method,
		"params": params,
	})
}

/// How far a submitted transaction must progress before the node answers
#[derive(
	Debug,
	Display,
	EnumString,
	Serialize,
	Deserialize,
	Default,
	Clone,
	Copy,
	PartialEq,
	Eq,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitUntil {
	/// Answer right away
	None,
	/// Included in a block
	Included,
	/// Included and executed, the block may not be final yet
	#[default]
	ExecutedOptimistic,
	/// Included in a final block
	IncludedFinal,
	/// Executed, every block involved is final except the last
	Executed,
	/// Executed and every block involved is final
	Final,
}

/// Response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
	/// Present on success
	#[serde(default)]
	pub result: Option<Value>,
	/// Present on failure
	#[serde(default)]
	pub error: Option<RpcError>,
}

/// Structured cause of an RPC error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorCause {
	/// Cause name, e.g. `INVALID_TRANSACTION`
	pub name: String,
	/// Cause details
	#[serde(default)]
	pub info: Option<Value>,
}

/// JSON-RPC error body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
	/// Error class, e.g. `HANDLER_ERROR`
	#[serde(default)]
	pub name: Option<String>,
	/// Structured cause
	#[serde(default)]
	pub cause: Option<RpcErrorCause>,
	/// JSON-RPC error code
	#[serde(default)]
	pub code: i64,
	/// Human readable message
	#[serde(default)]
	pub message: String,
	/// Legacy error payload
	#[serde(default)]
	pub data: Option<Value>,
}

impl RpcError {
	/// Name of the structured cause
	pub fn cause_name(&self) -> Option<&str> {
		self.cause.as_ref().map(|cause| cause.name.as_str())
	}

	/// Whether the node failed to answer in time rather than rejecting
	pub fn is_transient(&self) -> bool {
		self.cause_name()
			.map_or(false, |name| TRANSIENT_CAUSES.contains(&name))
	}
}

impl fmt::Display for RpcError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (self.cause_name(), &self.data) {
			(Some(cause), _) => write!(f, "{} ({})", self.message, cause),
			(None, Some(data)) => write!(f, "{}: {}", self.message, data),
			(None, None) => f.write_str(&self.message),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn should_build_envelope() {
		assert_eq!(
			envelope("block", json!({"finality": "final"})),
			json!({
				"jsonrpc": "2.0",
				"id": "dontcare",
				"method": "block",
				"params": {"finality": "final"}
			})
		);
	}

	#[test]
	fn should_render_wait_modes_as_protocol_names() {
		assert_eq!(
			WaitUntil::ExecutedOptimistic.to_string(),
			"EXECUTED_OPTIMISTIC"
		);
		assert_eq!(
			serde_json::to_value(WaitUntil::IncludedFinal).unwrap(),
			json!("INCLUDED_FINAL")
		);
		assert_eq!("NONE".parse::<WaitUntil>().unwrap(), WaitUntil::None);
	}

	#[test]
	fn should_detect_transient_causes() {
		let error: RpcError = serde_json::from_value(json!({
			"name": "HANDLER_ERROR",
			"cause": {"name": "TIMEOUT_ERROR", "info": {}},
			"code": -32000,
			"message": "Server error"
		}))
		.unwrap();

		assert!(error.is_transient());
		assert_eq!(error.to_string(), "Server error (TIMEOUT_ERROR)");

		let error = RpcError {
			cause: Some(RpcErrorCause {
				name: "UNKNOWN_BLOCK".into(),
				info: None,
			}),
			..error
		};

		assert!(!error.is_transient());
	}
}
