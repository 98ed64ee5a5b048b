//! Error taxonomy of the client
use near_core::{AccountId, BuildError, CoreError, FormatError, Nonce};
use serde_json::Value;
use thiserror::Error;

use crate::{outcome::FinalExecutionOutcome, rpc::RpcError};

/// Failures of the transport itself
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
	/// A single attempt failed in a way retrying cannot fix
	#[error("Request failed (status {status:?}): {message}")]
	Failed {
		/// HTTP status, absent when no response arrived
		status: Option<u16>,
		/// Last observed error message
		message: String,
	},
	/// Every allowed attempt failed with a retryable error
	#[error(
		"Request failed after {attempts} attempts (status {status:?}): {message}"
	)]
	RetriesExhausted {
		/// Number of attempts made
		attempts: u32,
		/// HTTP status of the last attempt, absent when no response arrived
		status: Option<u16>,
		/// Last observed error message
		message: String,
	},
	/// The node answered with a JSON-RPC error
	#[error("RPC error: {0}")]
	Rpc(RpcError),
}

/// The transaction nonce was not above the access key nonce
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Nonce {tx_nonce} is not greater than the access key nonce {ak_nonce}")]
pub struct StaleNonceError {
	/// Nonce the transaction carried
	pub tx_nonce: Nonce,
	/// Nonce stored on the access key
	pub ak_nonce: Nonce,
	/// Full outcome, when the node returned one
	pub outcome: Option<Box<FinalExecutionOutcome>>,
}

/// A contract method panicked
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
	"Contract {contract_id} panicked in {}: {panic_message}",
	method_name.as_deref().unwrap_or("<unknown method>")
)]
pub struct ContractExecutionError {
	/// Panic text
	pub panic_message: String,
	/// Method that failed, when the failing action could be identified
	pub method_name: Option<String>,
	/// Contract that executed the failing call
	pub contract_id: AccountId,
	/// Logs emitted up to and including the failing execution
	pub logs: Vec<String>,
	/// Full outcome, when the node returned one
	pub outcome: Option<Box<FinalExecutionOutcome>>,
}

/// The transaction failed for a reason other than a method call
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Transaction failed with {kind}: {detail}")]
pub struct TransactionStructureError {
	/// Name of the protocol error, e.g. `AccountAlreadyExists`
	pub kind: String,
	/// The raw failure payload
	pub detail: Value,
	/// Full outcome, when the node returned one
	pub outcome: Option<Box<FinalExecutionOutcome>>,
}

/// Error type for the client
#[derive(Error, Debug, Clone)]
pub enum ClientError {
	/// Malformed bytes
	#[error(transparent)]
	Format(#[from] FormatError),
	/// Transport failure
	#[error(transparent)]
	Network(#[from] NetworkError),
	/// Stale nonce, retryable after refreshing the nonce
	#[error(transparent)]
	StaleNonce(#[from] StaleNonceError),
	/// Method call panic
	#[error(transparent)]
	ContractExecution(#[from] Box<ContractExecutionError>),
	/// Non method call failure
	#[error(transparent)]
	TransactionStructure(#[from] TransactionStructureError),
	/// Key, account id or assembly error
	#[error(transparent)]
	Core(#[from] CoreError),
	/// The node answered with something that is not a valid response
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

impl ClientError {
	/// Whether submitting again can succeed without changing the request
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Self::StaleNonce(_)
				| Self::Network(NetworkError::RetriesExhausted { .. })
		)
	}

	/// The outcome tree attached to a classified failure
	pub fn outcome(&self) -> Option<&FinalExecutionOutcome> {
		match self {
			Self::StaleNonce(err) => err.outcome.as_deref(),
			Self::ContractExecution(err) => err.outcome.as_deref(),
			Self::TransactionStructure(err) => err.outcome.as_deref(),
			_ => None,
		}
	}
}

impl From<BuildError> for ClientError {
	fn from(err: BuildError) -> Self {
		Self::Core(err.into())
	}
}

impl From<ContractExecutionError> for ClientError {
	fn from(err: ContractExecutionError) -> Self {
		Self::ContractExecution(Box::new(err))
	}
}

impl From<serde_json::Error> for ClientError {
	fn from(err: serde_json::Error) -> Self {
		Self::InvalidResponse(err.to_string())
	}
}

/// Result type for the client
pub type ClientResult<T> = Result<T, ClientError>;
