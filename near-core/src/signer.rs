//! Signing capability used by the transaction assembler
use std::fmt;

use crate::{
	account_id::AccountId,
	crypto::{PublicKey, SecretKey, Signature},
	CoreResult,
};

/// Anything able to sign for a single public key.
///
/// The assembler only ever hands the signer a 32 byte digest, so
/// implementations backed by hardware wallets or remote key services work
/// the same as [InMemorySigner].
pub trait Signer: Send + Sync {
	/// Key the signatures verify against
	fn public_key(&self) -> PublicKey;

	/// Sign the given message
	fn sign(&self, data: &[u8]) -> CoreResult<Signature>;
}

/// Signer holding a secret key in memory
#[derive(Clone)]
pub struct InMemorySigner {
	/// Account the key belongs to
	pub account_id: AccountId,
	secret_key: SecretKey,
	public_key: PublicKey,
}

impl InMemorySigner {
	/// Creates a signer, deriving the public key from the secret key
	pub fn new(
		account_id: AccountId,
		secret_key: SecretKey,
	) -> CoreResult<Self> {
		let public_key = secret_key.public_key()?;

		Ok(Self {
			account_id,
			secret_key,
			public_key,
		})
	}
}

impl Signer for InMemorySigner {
	fn public_key(&self) -> PublicKey {
		self.public_key.clone()
	}

	fn sign(&self, data: &[u8]) -> CoreResult<Signature> {
		self.secret_key.sign(data)
	}
}

impl fmt::Debug for InMemorySigner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InMemorySigner")
			.field("account_id", &self.account_id)
			.field("public_key", &self.public_key)
			.finish_non_exhaustive()
	}
}
