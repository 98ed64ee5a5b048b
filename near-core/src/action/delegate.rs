/*!
Delegate actions: meta transactions signed by one account and relayed by
another.

The sender signs the sha256 of the action prefixed with
[DELEGATE_ACTION_PREFIX], which keeps the signature from ever being valid as a
plain transaction signature.
*/
use crate::{
	account_id::AccountId,
	codec::{impl_codec_for_struct, Codec},
	crypto::{hash::CryptoHash, PublicKey, Signature},
	signer::Signer,
	BlockHeight, CoreResult, Nonce,
};

use super::NonDelegateAction;

/// Message discriminant prepended to a delegate action before hashing
pub const DELEGATE_ACTION_PREFIX: u32 = (1 << 30) + 366;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Actions the sender wants executed on the receiver, relayed by a third party
pub struct DelegateAction {
	/// Account the actions are executed for
	pub sender_id: AccountId,
	/// Account the actions are executed on
	pub receiver_id: AccountId,
	/// Actions to execute, never containing a delegate
	pub actions: Vec<NonDelegateAction>,
	/// Nonce of the sender's access key
	pub nonce: Nonce,
	/// Last block height at which the action can be included
	pub max_block_height: BlockHeight,
	/// Key of the sender that signs the action
	pub public_key: PublicKey,
}

impl_codec_for_struct!(DelegateAction {
	sender_id,
	receiver_id,
	actions,
	nonce,
	max_block_height,
	public_key
});

impl DelegateAction {
	/// Hash that the sender signs
	pub fn signable_hash(&self) -> CryptoHash {
		let mut bytes = DELEGATE_ACTION_PREFIX.serialize_to_vec();
		bytes.extend(self.serialize_to_vec());

		CryptoHash::hash_bytes(bytes)
	}

	/// Signs the action with the given signer
	pub fn sign(self, signer: &dyn Signer) -> CoreResult<SignedDelegateAction> {
		let signature = signer.sign(self.signable_hash().as_ref())?;

		Ok(SignedDelegateAction {
			delegate_action: self,
			signature,
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Delegate action together with the sender's signature
pub struct SignedDelegateAction {
	/// The signed action
	pub delegate_action: DelegateAction,
	/// Signature over [DelegateAction::signable_hash]
	pub signature: Signature,
}

impl_codec_for_struct!(SignedDelegateAction {
	delegate_action,
	signature
});

impl SignedDelegateAction {
	/// Whether the signature matches the embedded public key
	pub fn verify(&self) -> bool {
		self.signature.verify(
			self.delegate_action.signable_hash().as_ref(),
			&self.delegate_action.public_key,
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		action::TransferAction, crypto::SecretKey, signer::InMemorySigner,
	};

	fn delegate_action(signer: &InMemorySigner) -> DelegateAction {
		DelegateAction {
			sender_id: "alice.near".parse().unwrap(),
			receiver_id: "bob.near".parse().unwrap(),
			actions: vec![NonDelegateAction::Transfer(TransferAction {
				deposit: 1,
			})],
			nonce: 11,
			max_block_height: 120,
			public_key: signer.public_key(),
		}
	}

	fn signer() -> InMemorySigner {
		InMemorySigner::new(
			"alice.near".parse().unwrap(),
			SecretKey::ed25519_from_seed([5u8; 32]),
		)
		.unwrap()
	}

	#[test]
	fn should_use_protocol_prefix() {
		assert_eq!(DELEGATE_ACTION_PREFIX, 1_073_742_190);
	}

	#[test]
	fn should_hash_with_prefix() {
		let action = delegate_action(&signer());
		let unprefixed = CryptoHash::hash_bytes(action.serialize_to_vec());

		assert_ne!(action.signable_hash(), unprefixed);
	}

	#[test]
	fn should_sign_and_verify() {
		let signer = signer();
		let signed = delegate_action(&signer).sign(&signer).unwrap();

		assert!(signed.verify());

		let mut tampered = signed.clone();
		tampered.delegate_action.nonce += 1;

		assert!(!tampered.verify());
	}

	#[test]
	fn should_round_trip_signed_delegate() {
		let signer = signer();
		let signed = delegate_action(&signer).sign(&signer).unwrap();
		let bytes = signed.serialize_to_vec();

		assert_eq!(
			SignedDelegateAction::deserialize_from_slice(&bytes).unwrap(),
			signed
		);
	}
}
