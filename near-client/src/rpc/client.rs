//! JSON-RPC client
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use near_core::{
	AccountId, BlockHeight, CryptoHash, Nonce, PublicKey, SignedTransaction,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::{
	envelope,
	retry::{
		is_retryable_status, retry, transient, SharedSleeper, Sleep, Sleeper,
	},
	transport::{HttpResponse, HttpTransport, ReqwestTransport},
	RpcResponse, WaitUntil,
};
use crate::{
	config::{RetryConfig, TransportConfig},
	error::{ClientError, ClientResult, NetworkError},
	outcome::{
		classify_rpc_error, interpret, AccessKeyView, FunctionResultView,
		TxOutcome,
	},
};

/// A recent block, used as the freshness token of new transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
	/// Block hash
	pub hash: CryptoHash,
	/// Block height
	pub height: BlockHeight,
}

/// Chain state needed to assemble a transaction
#[async_trait]
pub trait ChainQuery: Send + Sync {
	/// Current nonce of an access key
	async fn access_key_nonce(
		&self,
		account_id: &AccountId,
		public_key: &PublicKey,
	) -> ClientResult<Nonce>;

	/// Latest final block
	async fn recent_block(&self) -> ClientResult<BlockInfo>;
}

/// Client for a node's JSON-RPC endpoint.
///
/// Every call is retried on its own according to the [RetryConfig]; calls
/// share nothing but the transport.
#[derive(Debug, Clone)]
pub struct RpcClient {
	transport: Arc<dyn HttpTransport>,
	sleeper: SharedSleeper,
	retry_config: RetryConfig,
}

impl RpcClient {
	/// Create a client over the given transport
	pub fn new(
		transport: Arc<dyn HttpTransport>,
		retry_config: RetryConfig,
	) -> Self {
		Self {
			transport,
			sleeper: SharedSleeper::default(),
			retry_config,
		}
	}

	/// Create a client talking HTTP through `reqwest`
	pub fn from_config(
		transport_config: &TransportConfig,
		retry_config: RetryConfig,
	) -> ClientResult<Self> {
		let transport = ReqwestTransport::new(transport_config).map_err(|err| {
			NetworkError::Failed {
				status: None,
				message: err.to_string(),
			}
		})?;

		Ok(Self::new(Arc::new(transport), retry_config))
	}

	/// Replace the way the client waits between attempts
	pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
	where
		S: Sleeper<Sleep = Sleep> + Send + Sync + 'static,
	{
		self.sleeper = SharedSleeper::new(sleeper);
		self
	}

	/// Calls `method`, retrying transient failures
	pub async fn call(
		&self,
		method: &str,
		params: Value,
	) -> ClientResult<Value> {
		let envelope = envelope(method, params);
		let envelope = &envelope;

		debug!("Calling {}", method);

		retry(self.retry_config, self.sleeper.clone(), move |attempt| {
			trace!("Sending {} attempt {}", method, attempt);
			self.attempt(envelope, attempt)
		})
		.await
	}

	/// Calls `method` and decodes the result
	pub async fn call_as<T: DeserializeOwned>(
		&self,
		method: &str,
		params: Value,
	) -> ClientResult<T> {
		Ok(serde_json::from_value(self.call(method, params).await?)?)
	}

	async fn attempt(
		&self,
		envelope: &Value,
		attempt: u32,
	) -> Result<Value, backoff::Error<ClientError>> {
		let response = match self.transport.post_json(envelope).await {
			Ok(response) => response,
			Err(err) => {
				return Err(transient(attempt, None, err.to_string()));
			}
		};

		if !response.is_success() {
			let message = describe_body(&response);

			return Err(if is_retryable_status(response.status) {
				transient(attempt, Some(response.status), message)
			} else {
				backoff::Error::permanent(
					NetworkError::Failed {
						status: Some(response.status),
						message,
					}
					.into(),
				)
			});
		}

		let parsed: RpcResponse = match serde_json::from_str(&response.body) {
			Ok(parsed) => parsed,
			Err(err) => {
				debug!("Failed request response body: {:?}", response.body);

				return Err(backoff::Error::permanent(
					ClientError::InvalidResponse(format!(
						"Could not parse response JSON, status is {}: {}",
						response.status, err
					)),
				));
			}
		};

		match parsed {
			RpcResponse {
				error: Some(error), ..
			} if error.is_transient() => Err(transient(
				attempt,
				Some(response.status),
				error.to_string(),
			)),
			RpcResponse {
				error: Some(error), ..
			} => Err(backoff::Error::permanent(
				NetworkError::Rpc(error).into(),
			)),
			RpcResponse {
				result: Some(result),
				..
			} => Ok(result),
			RpcResponse { .. } => Err(backoff::Error::permanent(
				ClientError::InvalidResponse(
					"Response has neither result nor error".to_string(),
				),
			)),
		}
	}

	/// Submits a signed transaction and returns the raw result document
	pub async fn send_tx(
		&self,
		signed_transaction: &SignedTransaction,
		wait_until: WaitUntil,
	) -> ClientResult<Value> {
		self.call(
			"send_tx",
			json!({
				"signed_tx_base64": signed_transaction.to_base64(),
				"wait_until": wait_until,
			}),
		)
		.await
	}

	/// Submits a signed transaction and interprets the outcome
	pub async fn broadcast(
		&self,
		signed_transaction: &SignedTransaction,
		wait_until: WaitUntil,
	) -> ClientResult<TxOutcome> {
		debug!(
			"Broadcasting transaction {} with nonce {}",
			signed_transaction.hash(),
			signed_transaction.transaction.nonce
		);

		match self.send_tx(signed_transaction, wait_until).await {
			Ok(document) => interpret(document),
			Err(ClientError::Network(NetworkError::Rpc(error))) => {
				Err(classify_rpc_error(error, &signed_transaction.transaction))
			}
			Err(err) => Err(err),
		}
	}

	/// Status of a previously submitted transaction
	pub async fn tx_status(
		&self,
		tx_hash: &CryptoHash,
		sender_account_id: &AccountId,
		wait_until: WaitUntil,
	) -> ClientResult<TxOutcome> {
		let document = self
			.call(
				"tx",
				json!({
					"tx_hash": tx_hash,
					"sender_account_id": sender_account_id,
					"wait_until": wait_until,
				}),
			)
			.await?;

		interpret(document)
	}

	/// Access key of an account, read at the latest final block
	pub async fn view_access_key(
		&self,
		account_id: &AccountId,
		public_key: &PublicKey,
	) -> ClientResult<AccessKeyView> {
		self.call_as(
			"query",
			json!({
				"request_type": "view_access_key",
				"finality": "final",
				"account_id": account_id,
				"public_key": public_key,
			}),
		)
		.await
	}

	/// Calls a view method of a contract
	pub async fn view_function(
		&self,
		contract_id: &AccountId,
		method_name: &str,
		args: &[u8],
	) -> ClientResult<FunctionResultView> {
		self.call_as(
			"query",
			json!({
				"request_type": "call_function",
				"finality": "final",
				"account_id": contract_id,
				"method_name": method_name,
				"args_base64": STANDARD.encode(args),
			}),
		)
		.await
	}

	/// Latest final block
	pub async fn block(&self) -> ClientResult<BlockInfo> {
		#[derive(Deserialize)]
		struct Header {
			hash: CryptoHash,
			height: BlockHeight,
		}

		#[derive(Deserialize)]
		struct Block {
			header: Header,
		}

		let block: Block = self
			.call_as("block", json!({ "finality": "final" }))
			.await?;

		Ok(BlockInfo {
			hash: block.header.hash,
			height: block.header.height,
		})
	}
}

#[async_trait]
impl ChainQuery for RpcClient {
	async fn access_key_nonce(
		&self,
		account_id: &AccountId,
		public_key: &PublicKey,
	) -> ClientResult<Nonce> {
		Ok(self.view_access_key(account_id, public_key).await?.nonce)
	}

	async fn recent_block(&self) -> ClientResult<BlockInfo> {
		self.block().await
	}
}

/// Short description of a failed HTTP response
fn describe_body(response: &HttpResponse) -> String {
	match serde_json::from_str::<RpcResponse>(&response.body) {
		Ok(RpcResponse {
			error: Some(error), ..
		}) => error.to_string(),
		_ if response.body.trim().is_empty() => {
			format!("HTTP status {}", response.status)
		}
		_ => response.body.trim().to_string(),
	}
}
