/*!
Views of the outcome document returned for a submitted transaction.

The document is a tree: one transaction-level outcome plus one outcome per
receipt the transaction spawned. [interpret] reduces it to a single
[TxOutcome] or a typed failure.
*/
use near_core::{
	action::ActionKind, AccountId, Balance, CryptoHash, Gas, Nonce, PublicKey,
	Signature,
};
use serde::{
	de, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::{Map, Value};

use crate::rpc::WaitUntil;

pub mod interpret;

pub use interpret::{
	classify_rpc_error, interpret, interpret_outcome, TxOutcome,
};

/// Final outcome of a transaction and every receipt it produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalExecutionOutcome {
	/// Overall status
	pub status: FinalExecutionStatus,
	/// Echo of the submitted transaction
	pub transaction: TransactionView,
	/// Outcome of converting the transaction into its first receipt
	pub transaction_outcome: ExecutionOutcomeWithId,
	/// Receipt outcomes in execution order
	pub receipts_outcome: Vec<ExecutionOutcomeWithId>,
	/// Receipt bodies, only returned by the receipt-aware status method
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub receipts: Vec<ReceiptView>,
	/// Level of finality the answer reflects
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub final_execution_status: Option<WaitUntil>,
}

impl FinalExecutionOutcome {
	/// Hash of the transaction
	pub fn transaction_hash(&self) -> &CryptoHash {
		&self.transaction.hash
	}

	/// Logs of the transaction and every receipt, in execution order
	pub fn logs(&self) -> Vec<String> {
		std::iter::once(&self.transaction_outcome)
			.chain(&self.receipts_outcome)
			.flat_map(|outcome| outcome.outcome.logs.iter().cloned())
			.collect()
	}
}

/// Overall status of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinalExecutionStatus {
	/// Not processed yet
	NotStarted,
	/// Some receipts are still executing
	Started,
	/// Failed, with the protocol failure payload
	Failure(Value),
	/// Succeeded, with the base64 return value of the last receipt
	SuccessValue(String),
}

/// Outcome tagged with the id of the transaction or receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcomeWithId {
	/// Transaction or receipt hash
	pub id: CryptoHash,
	/// The outcome
	pub outcome: ExecutionOutcome,
	/// Block that included the execution
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub block_hash: Option<CryptoHash>,
}

/// Result of one execution step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
	/// Logs emitted during execution
	#[serde(default)]
	pub logs: Vec<String>,
	/// Receipts spawned by the execution
	#[serde(default)]
	pub receipt_ids: Vec<CryptoHash>,
	/// Gas burnt
	#[serde(default)]
	pub gas_burnt: Gas,
	/// Tokens burnt for the gas
	#[serde(default, with = "dec_format")]
	pub tokens_burnt: Balance,
	/// Account the execution ran on
	pub executor_id: AccountId,
	/// Status of the step
	pub status: ExecutionStatus,
}

/// Status of one execution step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionStatus {
	/// Not known yet
	Unknown,
	/// Failed, with the protocol failure payload
	Failure(Value),
	/// Succeeded with a base64 return value
	SuccessValue(String),
	/// Succeeded by spawning the given receipt
	SuccessReceiptId(CryptoHash),
}

impl ExecutionStatus {
	/// The failure payload, if the step failed
	pub fn failure(&self) -> Option<&Value> {
		match self {
			Self::Failure(failure) => Some(failure),
			_ => None,
		}
	}
}

/// Echo of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
	/// Signer account
	pub signer_id: AccountId,
	/// Signer key
	pub public_key: PublicKey,
	/// Access key nonce
	pub nonce: Nonce,
	/// Receiver account
	pub receiver_id: AccountId,
	/// Actions in submission order
	pub actions: Vec<ActionView>,
	/// Transaction signature
	pub signature: Signature,
	/// Transaction hash
	pub hash: CryptoHash,
}

/// A receipt spawned while executing a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptView {
	/// Account that created the receipt
	pub predecessor_id: AccountId,
	/// Account the receipt executes on
	pub receiver_id: AccountId,
	/// Receipt hash
	pub receipt_id: CryptoHash,
	/// Receipt body, kept untyped as new receipt kinds appear over time
	pub receipt: Value,
}

impl ReceiptView {
	/// Actions carried by an action receipt
	pub fn actions(&self) -> Option<Vec<ActionView>> {
		let actions = self.receipt.get("Action")?.get("actions")?;

		serde_json::from_value(actions.clone()).ok()
	}
}

/// One action as echoed by the node.
///
/// Actions without parameters may be echoed as a bare string
/// (`"CreateAccount"`) instead of a single-key object
/// (`{"CreateAccount": {}}`); both decode to the same view.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionView {
	/// Variant name
	pub name: String,
	/// Variant parameters, an empty object when there are none
	pub params: Value,
}

impl ActionView {
	/// Known action kind, `None` for variants this crate does not know
	pub fn kind(&self) -> Option<ActionKind> {
		self.name.parse().ok()
	}

	/// Method name of a function call
	pub fn method_name(&self) -> Option<&str> {
		match self.kind() {
			Some(ActionKind::FunctionCall) => {
				self.params.get("method_name")?.as_str()
			}
			_ => None,
		}
	}
}

fn normalize_params(params: Value) -> Value {
	match params {
		Value::Null => Value::Object(Map::new()),
		params => params,
	}
}

impl<'de> Deserialize<'de> for ActionView {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Value::deserialize(deserializer)? {
			Value::String(name) => Ok(Self {
				name,
				params: Value::Object(Map::new()),
			}),
			Value::Object(map) if map.len() == 1 => {
				let (name, params) = map
					.into_iter()
					.next()
					.ok_or_else(|| de::Error::custom("empty action"))?;

				Ok(Self {
					name,
					params: normalize_params(params),
				})
			}
			other => Err(de::Error::custom(format!(
				"expected an action name or a single-key object, got {}",
				other
			))),
		}
	}
}

impl Serialize for ActionView {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut map = serializer.serialize_map(Some(1))?;
		map.serialize_entry(&self.name, &self.params)?;
		map.end()
	}
}

/// Access key as returned by `view_access_key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessKeyView {
	/// Last used nonce
	pub nonce: Nonce,
	/// `"FullAccess"` or a function call permission object
	pub permission: Value,
	/// Block the answer was read at
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub block_hash: Option<CryptoHash>,
	/// Height of that block
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub block_height: Option<u64>,
}

/// Result of a view function call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResultView {
	/// Raw return value
	pub result: Vec<u8>,
	/// Logs emitted by the call
	#[serde(default)]
	pub logs: Vec<String>,
}

/// Balances travel as decimal strings since they exceed JSON number range
pub(crate) mod dec_format {
	use serde::{de, Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&value.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
	where
		D: Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Decimal {
			String(String),
			Number(u64),
		}

		match Decimal::deserialize(deserializer)? {
			Decimal::String(value) => value.parse().map_err(de::Error::custom),
			Decimal::Number(value) => Ok(value.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn should_accept_bare_string_actions() {
		let bare: Vec<ActionView> = serde_json::from_value(json!([
			"CreateAccount",
			{"Transfer": {"deposit": "1"}}
		]))
		.unwrap();
		let objects: Vec<ActionView> = serde_json::from_value(json!([
			{"CreateAccount": {}},
			{"Transfer": {"deposit": "1"}}
		]))
		.unwrap();

		assert_eq!(bare, objects);
		assert_eq!(bare[0].kind(), Some(ActionKind::CreateAccount));
		assert_eq!(bare[1].kind(), Some(ActionKind::Transfer));
	}

	#[test]
	fn should_treat_null_params_as_empty() {
		let view: ActionView =
			serde_json::from_value(json!({"CreateAccount": null})).unwrap();

		assert_eq!(view.params, json!({}));
	}

	#[test]
	fn should_reject_multi_key_actions() {
		assert!(serde_json::from_value::<ActionView>(
			json!({"CreateAccount": {}, "Transfer": {}})
		)
		.is_err());
	}

	#[test]
	fn should_expose_function_call_method_name() {
		let view: ActionView = serde_json::from_value(json!({
			"FunctionCall": {
				"method_name": "add",
				"args": "e30=",
				"gas": 30000000000000u64,
				"deposit": "0"
			}
		}))
		.unwrap();

		assert_eq!(view.method_name(), Some("add"));
		assert_eq!(
			serde_json::to_value(&view).unwrap()["FunctionCall"]["method_name"],
			json!("add")
		);
	}

	#[test]
	fn should_keep_unknown_action_names() {
		let view: ActionView =
			serde_json::from_value(json!("Teleport")).unwrap();

		assert_eq!(view.kind(), None);
		assert_eq!(view.name, "Teleport");
	}

	#[test]
	fn should_parse_statuses() {
		let status: ExecutionStatus =
			serde_json::from_value(json!({"SuccessValue": ""})).unwrap();
		assert_eq!(status, ExecutionStatus::SuccessValue(String::new()));

		let status: FinalExecutionStatus =
			serde_json::from_value(json!("NotStarted")).unwrap();
		assert_eq!(status, FinalExecutionStatus::NotStarted);
	}

	#[test]
	fn should_parse_decimal_balances() {
		let outcome: ExecutionOutcome = serde_json::from_value(json!({
			"logs": [],
			"receipt_ids": [],
			"gas_burnt": 2428000000000u64,
			"tokens_burnt": "242800000000000000000",
			"executor_id": "alice.near",
			"status": "Unknown"
		}))
		.unwrap();

		assert_eq!(outcome.tokens_burnt, 242_800_000_000_000_000_000);
	}
}
