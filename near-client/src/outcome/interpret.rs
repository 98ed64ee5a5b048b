/*!
Reduces an outcome document to exactly one success value or typed failure.

The transaction-level outcome is inspected first, then the receipt outcomes in
execution order; the first failure found decides the classification. A
failure is a contract execution failure when the failing action was a method
call, a stale nonce when the node rejected the nonce, and a transaction
structure failure otherwise.
*/
use base64::{engine::general_purpose::STANDARD, Engine as _};
use near_core::{action::ActionKind, AccountId, Action, Transaction};
use serde_json::{json, Value};
use tracing::debug;

use super::{
	ActionView, ExecutionOutcomeWithId, ExecutionStatus, FinalExecutionOutcome,
	FinalExecutionStatus,
};
use crate::{
	error::{
		ClientError, ClientResult, ContractExecutionError, NetworkError,
		StaleNonceError, TransactionStructureError,
	},
	rpc::{RpcError, WaitUntil},
};

const PANIC_PREFIX: &str = "Smart contract panicked: ";

static NULL: Value = Value::Null;

/// Successful or still pending result of a submission
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome {
	/// The node answered before execution finished
	Pending {
		/// Level the transaction reached
		status: WaitUntil,
		/// Partial outcome, when the node returned one
		outcome: Option<Box<FinalExecutionOutcome>>,
	},
	/// Every receipt succeeded
	Success {
		/// Decoded return value of the last receipt
		value: Option<Vec<u8>>,
		/// Full outcome tree
		outcome: Box<FinalExecutionOutcome>,
	},
}

impl TxOutcome {
	/// The outcome tree, if the node returned one
	pub fn outcome(&self) -> Option<&FinalExecutionOutcome> {
		match self {
			Self::Pending { outcome, .. } => outcome.as_deref(),
			Self::Success { outcome, .. } => Some(outcome),
		}
	}

	/// Return value of a successful call
	pub fn value(&self) -> Option<&[u8]> {
		match self {
			Self::Success { value, .. } => value.as_deref(),
			Self::Pending { .. } => None,
		}
	}
}

/// Interprets a raw result document
pub fn interpret(document: Value) -> ClientResult<TxOutcome> {
	if document.get("transaction_outcome").is_none() {
		let status = match document.get("final_execution_status") {
			Some(status) => serde_json::from_value(status.clone())?,
			None => {
				return Err(ClientError::InvalidResponse(format!(
					"Outcome document without outcome or status: {}",
					document
				)))
			}
		};

		return Ok(TxOutcome::Pending {
			status,
			outcome: None,
		});
	}

	interpret_outcome(serde_json::from_value(document)?)
}

/// Interprets a typed outcome
pub fn interpret_outcome(
	outcome: FinalExecutionOutcome,
) -> ClientResult<TxOutcome> {
	let transaction_outcome = &outcome.transaction_outcome.outcome;

	if let Some(failure) = transaction_outcome.status.failure() {
		debug!(
			"Transaction {} failed before execution",
			outcome.transaction.hash
		);

		let site = FailureSite {
			contract_id: transaction_outcome.executor_id.clone(),
			actions: outcome
				.transaction
				.actions
				.iter()
				.map(Into::into)
				.collect(),
			logs: transaction_outcome.logs.clone(),
			receipt_level: false,
		};

		return Err(classify(
			failure,
			site,
			Some(Box::new(outcome.clone())),
		));
	}

	for (index, receipt) in outcome.receipts_outcome.iter().enumerate() {
		if let Some(failure) = receipt.outcome.status.failure() {
			debug!("Receipt {} failed", receipt.id);

			let site = FailureSite {
				contract_id: receipt.outcome.executor_id.clone(),
				actions: correlate_actions(&outcome, receipt),
				logs: logs_up_to(&outcome, index),
				receipt_level: true,
			};

			return Err(classify(
				failure,
				site,
				Some(Box::new(outcome.clone())),
			));
		}
	}

	match &outcome.status {
		FinalExecutionStatus::Failure(failure) => {
			let site = FailureSite {
				contract_id: outcome.transaction.receiver_id.clone(),
				actions: outcome
					.transaction
					.actions
					.iter()
					.map(Into::into)
					.collect(),
				logs: outcome.logs(),
				receipt_level: false,
			};

			Err(classify(
				failure,
				site,
				Some(Box::new(outcome.clone())),
			))
		}
		FinalExecutionStatus::SuccessValue(value) => {
			let value = STANDARD
				.decode(value)
				.map_err(|err| ClientError::InvalidResponse(err.to_string()))?;

			Ok(TxOutcome::Success {
				value: Some(value),
				outcome: Box::new(outcome),
			})
		}
		FinalExecutionStatus::NotStarted | FinalExecutionStatus::Started => {
			Ok(TxOutcome::Pending {
				status: outcome
					.final_execution_status
					.unwrap_or(WaitUntil::Included),
				outcome: Some(Box::new(outcome)),
			})
		}
	}
}

/// Classifies a JSON-RPC error returned for `transaction`.
///
/// Errors carrying a transaction execution failure go through the same rules
/// as outcome failures; anything else stays a [NetworkError::Rpc].
pub fn classify_rpc_error(
	error: RpcError,
	transaction: &Transaction,
) -> ClientError {
	match rpc_failure(&error) {
		Some(failure) => {
			let site = FailureSite {
				contract_id: transaction.receiver_id.clone(),
				actions: transaction.actions.iter().map(Into::into).collect(),
				logs: Vec::new(),
				receipt_level: false,
			};

			classify(&failure, site, None)
		}
		None => NetworkError::Rpc(error).into(),
	}
}

/// Failure payload of an RPC error, in outcome failure shape
fn rpc_failure(error: &RpcError) -> Option<Value> {
	if let Some(failure) = error
		.data
		.as_ref()
		.and_then(|data| data.get("TxExecutionError"))
	{
		return Some(failure.clone());
	}

	if error.cause_name() != Some("INVALID_TRANSACTION") {
		return None;
	}

	let info = error.cause.as_ref()?.info.as_ref()?;

	Some(match info.get("TxExecutionError") {
		Some(failure) => failure.clone(),
		None if info.get("InvalidTxError").is_some() => info.clone(),
		None => json!({ "InvalidTxError": info }),
	})
}

/// What the interpreter knows about an action, independent of its source
#[derive(Debug, Clone, PartialEq)]
struct ActionSummary {
	kind: Option<ActionKind>,
	method_name: Option<String>,
}

impl From<&ActionView> for ActionSummary {
	fn from(view: &ActionView) -> Self {
		Self {
			kind: view.kind(),
			method_name: view.method_name().map(str::to_string),
		}
	}
}

impl From<&Action> for ActionSummary {
	fn from(action: &Action) -> Self {
		Self {
			kind: Some(action.kind()),
			method_name: match action {
				Action::FunctionCall(call) => Some(call.method_name.clone()),
				_ => None,
			},
		}
	}
}

/// Context of the outcome that failed
struct FailureSite {
	contract_id: AccountId,
	/// Empty when the failing receipt could not be traced to its actions
	actions: Vec<ActionSummary>,
	logs: Vec<String>,
	receipt_level: bool,
}

fn classify(
	failure: &Value,
	site: FailureSite,
	outcome: Option<Box<FinalExecutionOutcome>>,
) -> ClientError {
	if let Some(invalid_tx) = failure.get("InvalidTxError") {
		if let Some(invalid_nonce) = invalid_tx.get("InvalidNonce") {
			let nonce =
				|name: &str| invalid_nonce.get(name).and_then(Value::as_u64);
			let tx_nonce = nonce("tx_nonce");
			let ak_nonce = nonce("ak_nonce");

			if let (Some(tx_nonce), Some(ak_nonce)) = (tx_nonce, ak_nonce) {
				return StaleNonceError {
					tx_nonce,
					ak_nonce,
					outcome,
				}
				.into();
			}
		}

		return TransactionStructureError {
			kind: variant_name(invalid_tx),
			detail: failure.clone(),
			outcome,
		}
		.into();
	}

	let action_error = match failure.get("ActionError") {
		Some(action_error) => action_error,
		None => {
			return TransactionStructureError {
				kind: variant_name(failure),
				detail: failure.clone(),
				outcome,
			}
			.into()
		}
	};

	let kind = action_error.get("kind").unwrap_or(&NULL);
	let correlated = match action_error.get("index").and_then(Value::as_u64) {
		Some(index) => site.actions.get(index as usize),
		// A failure without an index refers to the only action there is
		None => match site.actions.as_slice() {
			[only] => Some(only),
			_ => None,
		},
	};

	let is_method_call = kind.get("FunctionCallError").is_some()
		|| correlated.map_or(
			site.receipt_level && site.actions.is_empty(),
			|action| action.kind == Some(ActionKind::FunctionCall),
		);

	if !is_method_call {
		return TransactionStructureError {
			kind: variant_name(kind),
			detail: failure.clone(),
			outcome,
		}
		.into();
	}

	let method_name = correlated.and_then(|action| action.method_name.clone());

	ContractExecutionError {
		panic_message: panic_message(kind),
		method_name,
		contract_id: site.contract_id,
		logs: site.logs,
		outcome,
	}
	.into()
}

/// Maps a receipt outcome to the actions of the receipt that produced it
fn correlate_actions(
	outcome: &FinalExecutionOutcome,
	receipt: &ExecutionOutcomeWithId,
) -> Vec<ActionSummary> {
	let first_receipt = match &outcome.transaction_outcome.outcome.status {
		ExecutionStatus::SuccessReceiptId(id) => Some(id),
		_ => outcome.transaction_outcome.outcome.receipt_ids.first(),
	};

	if first_receipt == Some(&receipt.id) {
		return outcome.transaction.actions.iter().map(Into::into).collect();
	}

	outcome
		.receipts
		.iter()
		.find(|view| view.receipt_id == receipt.id)
		.and_then(|view| view.actions())
		.map(|actions| actions.iter().map(Into::into).collect())
		.unwrap_or_default()
}

/// Logs of the transaction outcome and receipts up to and including `index`
fn logs_up_to(outcome: &FinalExecutionOutcome, index: usize) -> Vec<String> {
	std::iter::once(&outcome.transaction_outcome)
		.chain(outcome.receipts_outcome.iter().take(index + 1))
		.flat_map(|outcome| outcome.outcome.logs.iter().cloned())
		.collect()
}

/// Extracts readable panic text from an action error kind
fn panic_message(kind: &Value) -> String {
	let function_call_error = match kind.get("FunctionCallError") {
		Some(error) => error,
		None => return render(kind),
	};

	if let Some(message) = function_call_error
		.get("ExecutionError")
		.and_then(Value::as_str)
	{
		return message
			.strip_prefix(PANIC_PREFIX)
			.unwrap_or(message)
			.to_string();
	}

	if let Some(message) = function_call_error
		.pointer("/HostError/GuestPanic/panic_msg")
		.and_then(Value::as_str)
	{
		return message.to_string();
	}

	render(function_call_error)
}

/// Renders nested single-key error objects as `Outer: Inner: detail`
fn render(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		Value::Object(map) if map.len() == 1 => match map.iter().next() {
			Some((name, Value::Null)) => name.clone(),
			Some((name, Value::Object(inner))) if inner.is_empty() => {
				name.clone()
			}
			Some((name, detail)) => format!("{}: {}", name, render(detail)),
			None => "Unknown error".to_string(),
		},
		Value::Null => "Unknown error".to_string(),
		other => other.to_string(),
	}
}

/// Name of the variant of an externally tagged enum value
fn variant_name(value: &Value) -> String {
	match value {
		Value::String(name) => name.clone(),
		Value::Object(map) => map
			.keys()
			.next()
			.cloned()
			.unwrap_or_else(|| "Unknown".to_string()),
		_ => "Unknown".to_string(),
	}
}
