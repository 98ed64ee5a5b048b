/*!
Transactions and signed transactions.

A transaction is identified by the sha256 of its canonical encoding and the
signature covers exactly those hash bytes.
*/
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
	account_id::AccountId,
	action::Action,
	codec::{impl_codec_for_struct, Codec, CodecResult},
	crypto::{hash::CryptoHash, PublicKey, Signature},
	signer::Signer,
	CoreResult, Nonce,
};

/// Module for assembling transactions step by step
pub mod builder;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Unsigned transaction
pub struct Transaction {
	/// Account that signs and pays for the transaction
	pub signer_id: AccountId,
	/// Access key used to sign
	pub public_key: PublicKey,
	/// Access key nonce, strictly greater than the stored one
	pub nonce: Nonce,
	/// Account the actions are applied to
	pub receiver_id: AccountId,
	/// Recent block hash anchoring the transaction's validity window
	pub block_hash: CryptoHash,
	/// Actions, applied in order
	pub actions: Vec<Action>,
}

impl_codec_for_struct!(Transaction {
	signer_id,
	public_key,
	nonce,
	receiver_id,
	block_hash,
	actions
});

impl Transaction {
	/// Transaction hash, the sha256 of the encoding
	pub fn hash(&self) -> CryptoHash {
		CryptoHash::hash_bytes(self.serialize_to_vec())
	}

	/// Signs the transaction hash with the given signer
	pub fn sign(self, signer: &dyn Signer) -> CoreResult<SignedTransaction> {
		let signature = signer.sign(self.hash().as_ref())?;

		Ok(SignedTransaction {
			transaction: self,
			signature,
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Transaction with its signature, ready for submission
pub struct SignedTransaction {
	/// The transaction
	pub transaction: Transaction,
	/// Signature over the transaction hash
	pub signature: Signature,
}

impl_codec_for_struct!(SignedTransaction {
	transaction,
	signature
});

impl SignedTransaction {
	/// Hash of the inner transaction, which identifies it on chain
	pub fn hash(&self) -> CryptoHash {
		self.transaction.hash()
	}

	/// Whether the signature matches the transaction's public key
	pub fn verify(&self) -> bool {
		self.signature
			.verify(self.hash().as_ref(), &self.transaction.public_key)
	}

	/// Encoding in standard base64, as the RPC expects it
	pub fn to_base64(&self) -> String {
		STANDARD.encode(self.serialize_to_vec())
	}

	/// Decodes a base64 signed transaction
	pub fn from_base64(value: &str) -> CodecResult<Self> {
		let bytes = STANDARD.decode(value).map_err(|err| {
			crate::FormatError::InvalidData(format!("bad base64: {}", err))
		})?;

		Self::deserialize_from_slice(&bytes)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{crypto::SecretKey, signer::InMemorySigner, FormatError};

	fn signer() -> InMemorySigner {
		InMemorySigner::new(
			"alice.near".parse().unwrap(),
			SecretKey::ed25519_from_seed([1u8; 32]),
		)
		.unwrap()
	}

	fn transaction(signer: &InMemorySigner) -> Transaction {
		Transaction {
			signer_id: "alice.near".parse().unwrap(),
			public_key: signer.public_key(),
			nonce: 1,
			receiver_id: "bob.near".parse().unwrap(),
			block_hash: CryptoHash([2u8; 32]),
			actions: vec![Action::transfer(1_000_000_000_000_000_000_000_000)],
		}
	}

	#[test]
	fn should_encode_fields_in_order() {
		let signer = signer();
		let bytes = transaction(&signer).serialize_to_vec();

		let mut expected = vec![10, 0, 0, 0];
		expected.extend_from_slice(b"alice.near");
		expected.push(0);
		expected.extend_from_slice(signer.public_key().as_bytes());
		expected.extend_from_slice(&1u64.to_le_bytes());
		expected.extend_from_slice(&[8, 0, 0, 0]);
		expected.extend_from_slice(b"bob.near");
		expected.extend_from_slice(&[2u8; 32]);
		expected.extend_from_slice(&[1, 0, 0, 0, 3]);
		expected.extend_from_slice(
			&1_000_000_000_000_000_000_000_000u128.to_le_bytes(),
		);

		assert_eq!(bytes, expected);
	}

	#[test]
	fn should_sign_the_transaction_hash() {
		let signer = signer();
		let transaction = transaction(&signer);
		let hash = transaction.hash();
		let signed = transaction.sign(&signer).unwrap();

		assert_eq!(signed.hash(), hash);
		assert!(signed.verify());
		assert!(signed.signature.verify(hash.as_ref(), &signer.public_key()));
	}

	#[test]
	fn should_round_trip_through_base64() {
		let signer = signer();
		let signed = transaction(&signer).sign(&signer).unwrap();

		assert_eq!(
			SignedTransaction::from_base64(&signed.to_base64()).unwrap(),
			signed
		);
	}

	#[test]
	fn should_reject_truncated_transaction() {
		let signer = signer();
		let bytes = transaction(&signer)
			.sign(&signer)
			.unwrap()
			.serialize_to_vec();
		let truncated = &bytes[..bytes.len() - 1];

		assert_eq!(
			SignedTransaction::deserialize_from_slice(truncated),
			Err(FormatError::UnexpectedEof)
		);
	}
}
