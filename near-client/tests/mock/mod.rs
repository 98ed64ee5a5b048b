//! In-process stand-in for a node's JSON-RPC endpoint
use std::{
	collections::{HashMap, VecDeque},
	sync::{Arc, Mutex},
	time::Duration,
};

use async_trait::async_trait;
use near_client::{
	config::RetryConfig,
	rpc::{
		retry::{Sleep, Sleeper},
		transport::{HttpResponse, HttpTransport, TransportError},
	},
	Account, RpcClient,
};
use near_core::{
	AccountId, CryptoHash, InMemorySigner, Nonce, PublicKey, SecretKey,
	SignedTransaction,
};
use serde_json::{json, Value};

pub const BLOCK_HEIGHT: u64 = 100;

/// What the node answers to one request
#[derive(Debug, Clone)]
pub enum Reply {
	/// Bare HTTP status with an empty body
	Status(u16),
	/// JSON-RPC result
	Result(Value),
	/// JSON-RPC error
	Error(Value),
	/// Successful outcome for the submitted transaction
	Executed,
}

/// Replies per method, the last reply of a method repeats forever.
///
/// Executed transactions move the access key nonce, a transaction whose nonce
/// is not above it is rejected the way a node rejects it.
#[derive(Debug, Default)]
pub struct MockNode {
	replies: Mutex<HashMap<String, VecDeque<Reply>>>,
	requests: Mutex<Vec<Value>>,
	nonces: Mutex<HashMap<(AccountId, PublicKey), Nonce>>,
}

impl MockNode {
	pub fn new() -> Arc<Self> {
		let node = Self::default();

		node.reply(
			"query",
			[Reply::Result(json!({"nonce": 7, "permission": "FullAccess"}))],
		);
		node.reply(
			"block",
			[Reply::Result(json!({"header": {
				"hash": CryptoHash([3u8; 32]).to_string(),
				"height": BLOCK_HEIGHT
			}}))],
		);
		node.reply("send_tx", [Reply::Executed]);

		Arc::new(node)
	}

	pub fn reply(
		&self,
		method: &str,
		replies: impl IntoIterator<Item = Reply>,
	) {
		self.replies
			.lock()
			.unwrap()
			.insert(method.to_string(), replies.into_iter().collect());
	}

	pub fn requests(&self, method: &str) -> Vec<Value> {
		self.requests
			.lock()
			.unwrap()
			.iter()
			.filter(|request| request["method"] == method)
			.cloned()
			.collect()
	}

	pub fn submitted(&self) -> Vec<SignedTransaction> {
		self.requests("send_tx")
			.iter()
			.map(|request| {
				SignedTransaction::from_base64(
					request["params"]["signed_tx_base64"].as_str().unwrap(),
				)
				.unwrap()
			})
			.collect()
	}

	fn next_reply(&self, method: &str) -> Reply {
		let mut replies = self.replies.lock().unwrap();
		let queue = replies
			.get_mut(method)
			.unwrap_or_else(|| panic!("No reply scripted for {}", method));

		if queue.len() > 1 {
			queue.pop_front().unwrap()
		} else {
			queue.front().cloned().unwrap()
		}
	}
}

#[async_trait]
impl HttpTransport for MockNode {
	async fn post_json(
		&self,
		body: &Value,
	) -> Result<HttpResponse, TransportError> {
		self.requests.lock().unwrap().push(body.clone());

		let method = body["method"].as_str().unwrap_or_default();
		let envelope = |key: &str, value: Value| HttpResponse {
			status: 200,
			body: json!({"jsonrpc": "2.0", "id": "dontcare", key: value})
				.to_string(),
		};

		Ok(match self.next_reply(method) {
			Reply::Status(status) => HttpResponse {
				status,
				body: String::new(),
			},
			Reply::Result(result) => envelope("result", result),
			Reply::Error(error) => envelope("error", error),
			Reply::Executed => {
				let signed = SignedTransaction::from_base64(
					body["params"]["signed_tx_base64"].as_str().unwrap(),
				)
				.unwrap();

				match self.accept_nonce(&signed) {
					Ok(()) => envelope("result", executed(&signed)),
					Err(ak_nonce) => envelope(
						"error",
						stale_nonce(signed.transaction.nonce, ak_nonce),
					),
				}
			}
		})
	}
}

impl MockNode {
	fn accept_nonce(&self, signed: &SignedTransaction) -> Result<(), Nonce> {
		let transaction = &signed.transaction;
		let key = (
			transaction.signer_id.clone(),
			transaction.public_key.clone(),
		);
		let mut nonces = self.nonces.lock().unwrap();

		match nonces.get(&key) {
			Some(&ak_nonce) if transaction.nonce <= ak_nonce => Err(ak_nonce),
			_ => {
				nonces.insert(key, transaction.nonce);
				Ok(())
			}
		}
	}
}

/// Outcome document of a transaction whose only receipt succeeded
pub fn executed(signed: &SignedTransaction) -> Value {
	let transaction = &signed.transaction;
	let receipt_id = CryptoHash([7u8; 32]).to_string();
	let actions: Vec<Value> = transaction
		.actions
		.iter()
		.map(|action| json!(action.kind().to_string()))
		.collect();

	json!({
		"status": {"SuccessValue": ""},
		"transaction": {
			"signer_id": transaction.signer_id,
			"public_key": transaction.public_key,
			"nonce": transaction.nonce,
			"receiver_id": transaction.receiver_id,
			"actions": actions,
			"signature": signed.signature,
			"hash": signed.hash()
		},
		"transaction_outcome": {
			"id": signed.hash(),
			"outcome": {
				"logs": [],
				"receipt_ids": [receipt_id],
				"gas_burnt": 223182562500u64,
				"tokens_burnt": "22318256250000000000",
				"executor_id": transaction.signer_id,
				"status": {"SuccessReceiptId": receipt_id}
			}
		},
		"receipts_outcome": [{
			"id": receipt_id,
			"outcome": {
				"logs": [],
				"receipt_ids": [],
				"gas_burnt": 223182562500u64,
				"tokens_burnt": "0",
				"executor_id": transaction.receiver_id,
				"status": {"SuccessValue": ""}
			}
		}],
		"final_execution_status": "EXECUTED_OPTIMISTIC"
	})
}

pub fn stale_nonce(tx_nonce: u64, ak_nonce: u64) -> Value {
	json!({
		"name": "HANDLER_ERROR",
		"cause": {
			"name": "INVALID_TRANSACTION",
			"info": {"InvalidTxError": {"InvalidNonce": {
				"tx_nonce": tx_nonce,
				"ak_nonce": ak_nonce
			}}}
		},
		"code": -32000,
		"message": "Server error",
		"data": {"TxExecutionError": {"InvalidTxError": {"InvalidNonce": {
			"tx_nonce": tx_nonce,
			"ak_nonce": ak_nonce
		}}}}
	})
}

#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper(Arc<Mutex<Vec<Duration>>>);

impl RecordingSleeper {
	pub fn delays(&self) -> Vec<Duration> {
		self.0.lock().unwrap().clone()
	}
}

impl Sleeper for RecordingSleeper {
	type Sleep = Sleep;

	fn sleep(&self, duration: Duration) -> Sleep {
		self.0.lock().unwrap().push(duration);
		Box::pin(async {})
	}
}

pub const INITIAL_DELAY: Duration = Duration::from_millis(100);

pub fn client(
	node: &Arc<MockNode>,
	max_retries: u32,
) -> (RpcClient, RecordingSleeper) {
	let sleeper = RecordingSleeper::default();
	let client = RpcClient::new(
		node.clone(),
		RetryConfig {
			max_retries,
			initial_delay: INITIAL_DELAY,
		},
	)
	.with_sleeper(sleeper.clone());

	(client, sleeper)
}

pub fn alice() -> AccountId {
	"alice.near".parse().unwrap()
}

pub fn signer() -> Arc<InMemorySigner> {
	Arc::new(
		InMemorySigner::new(alice(), SecretKey::ed25519_from_seed([42u8; 32]))
			.unwrap(),
	)
}

pub fn account(node: &Arc<MockNode>) -> Account {
	let (client, _) = client(node, 3);

	Account::new(alice(), signer(), client)
}
