#![forbid(missing_docs)]
/*!
# near-core library: primitives for building and signing NEAR transactions
*/

use thiserror::Error;

/// Module for account identifiers
pub mod account_id;
/// Module for transaction actions
pub mod action;
/// Module for the canonical binary codec
pub mod codec;
/// Module for keys, signatures and hashes
pub mod crypto;
/// Module for the signing capability
pub mod signer;
/// Module for transactions and their assembly
pub mod transaction;

pub use account_id::AccountId;
pub use action::{Action, NonDelegateAction};
pub use codec::{Codec, FormatError};
pub use crypto::{hash::CryptoHash, KeyType, PublicKey, SecretKey, Signature};
pub use signer::{InMemorySigner, Signer};
pub use transaction::{
	builder::{BuildError, TransactionBuilder},
	SignedTransaction, Transaction,
};

/// Amount of yoctoNEAR
pub type Balance = u128;
/// Amount of gas units
pub type Gas = u64;
/// Block height
pub type BlockHeight = u64;
/// Access key nonce
pub type Nonce = u64;

/// Error type for the near-core library
#[derive(Error, Debug, Clone)]
pub enum CoreError {
	#[error("Invalid arguments: {0}")]
	/// Invalid arguments
	InvalidArguments(&'static str),
	#[error("Invalid {key_type} key length: expected {expected}, got {actual}")]
	/// Key or signature with the wrong length for its curve
	InvalidKeyLength {
		/// Curve of the key
		key_type: KeyType,
		/// Expected length
		expected: usize,
		/// Received length
		actual: usize,
	},
	#[error("Unknown key type: {0}")]
	/// Unknown curve prefix in a key string
	UnknownKeyType(String),
	#[error("Could not create hash from {0} bytes")]
	/// Hash with the wrong length
	InvalidHashLength(usize),
	#[error("Could not decode base58: {0}")]
	/// Base58 decoding error
	BadBase58(#[from] bs58::decode::Error),
	#[error("Invalid account id: {0}")]
	/// Account id validation error
	AccountId(#[from] account_id::AccountIdError),
	#[error("Invalid access key permission: {0}")]
	/// Access key permission validation error
	InvalidPermission(&'static str),
	#[error("Signing failed: {0}")]
	/// The signer could not produce a signature
	Signing(String),
	#[error(transparent)]
	/// Malformed bytes
	Format(#[from] FormatError),
	#[error(transparent)]
	/// Transaction assembly error
	Build(#[from] BuildError),
}

/// Result type for the near-core library
pub type CoreResult<T> = Result<T, CoreError>;
