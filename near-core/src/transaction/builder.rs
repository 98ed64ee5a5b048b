/*!
Step by step transaction assembly.

The builder collects the header fields and actions in call order and refuses
to produce anything while a required field is unset. Nonces and block hashes
are opaque inputs here: fetching them is the caller's job.
*/
use thiserror::Error;

use crate::{
	account_id::AccountId,
	action::{Action, DelegateAction, NonDelegateAction, SignedDelegateAction},
	crypto::{hash::CryptoHash, PublicKey},
	signer::Signer,
	BlockHeight, CoreResult, Nonce,
};

use super::{SignedTransaction, Transaction};

/// Programmer errors detected while assembling a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
	/// No action was added
	#[error("A transaction needs at least one action")]
	NoActions,
	/// Nonce was never set
	#[error("Nonce is not set")]
	MissingNonce,
	/// Receiver was never set
	#[error("Receiver is not set")]
	MissingReceiver,
	/// Block hash was never set
	#[error("Block hash is not set")]
	MissingBlockHash,
	/// Max block height was never set on a delegate action
	#[error("Max block height is not set")]
	MissingMaxBlockHeight,
	/// The signer signs for a different key than the header names
	#[error("Signer key {actual} does not match transaction key {expected}")]
	SignerMismatch {
		/// Key in the transaction header
		expected: PublicKey,
		/// Key of the signer
		actual: PublicKey,
	},
	/// A delegate action was added to a delegate action
	#[error("Delegate actions cannot contain delegate actions")]
	NestedDelegate,
}

#[derive(Debug, Clone)]
/// Accumulates the parts of a transaction
pub struct TransactionBuilder {
	signer_id: AccountId,
	public_key: PublicKey,
	nonce: Option<Nonce>,
	receiver_id: Option<AccountId>,
	block_hash: Option<CryptoHash>,
	max_block_height: Option<BlockHeight>,
	actions: Vec<Action>,
}

impl TransactionBuilder {
	/// Starts a transaction signed by `signer_id` with `public_key`
	pub fn begin(signer_id: AccountId, public_key: PublicKey) -> Self {
		Self {
			signer_id,
			public_key,
			nonce: None,
			receiver_id: None,
			block_hash: None,
			max_block_height: None,
			actions: Vec::new(),
		}
	}

	/// Appends an action
	pub fn add_action(mut self, action: Action) -> Self {
		self.actions.push(action);
		self
	}

	/// Appends several actions, keeping their order
	pub fn add_actions(
		mut self,
		actions: impl IntoIterator<Item = Action>,
	) -> Self {
		self.actions.extend(actions);
		self
	}

	/// Sets the access key nonce
	pub fn with_nonce(mut self, nonce: Nonce) -> Self {
		self.nonce = Some(nonce);
		self
	}

	/// Sets the receiver account
	pub fn with_receiver(mut self, receiver_id: AccountId) -> Self {
		self.receiver_id = Some(receiver_id);
		self
	}

	/// Sets the recent block hash bounding the validity window
	pub fn with_block_hash(mut self, block_hash: CryptoHash) -> Self {
		self.block_hash = Some(block_hash);
		self
	}

	/// Sets the expiry height, only used by [Self::delegate]
	pub fn with_max_block_height(
		mut self,
		max_block_height: BlockHeight,
	) -> Self {
		self.max_block_height = Some(max_block_height);
		self
	}

	/// The signer account
	pub fn signer_id(&self) -> &AccountId {
		&self.signer_id
	}

	/// The actions added so far
	pub fn actions(&self) -> &[Action] {
		&self.actions
	}

	/// Produces the unsigned transaction
	pub fn build(self) -> Result<Transaction, BuildError> {
		if self.actions.is_empty() {
			return Err(BuildError::NoActions);
		}

		Ok(Transaction {
			nonce: self.nonce.ok_or(BuildError::MissingNonce)?,
			receiver_id: self.receiver_id.ok_or(BuildError::MissingReceiver)?,
			block_hash: self.block_hash.ok_or(BuildError::MissingBlockHash)?,
			signer_id: self.signer_id,
			public_key: self.public_key,
			actions: self.actions,
		})
	}

	/// Produces a transaction signed by `signer`
	pub fn build_and_sign(
		self,
		signer: &dyn Signer,
	) -> CoreResult<SignedTransaction> {
		check_signer(&self.public_key, signer)?;

		self.build()?.sign(signer)
	}

	/// Produces a signed delegate action instead of a transaction.
	///
	/// The signer account is the sender. The block hash is not part of a
	/// delegate action and is ignored.
	pub fn delegate(
		self,
		signer: &dyn Signer,
	) -> CoreResult<SignedDelegateAction> {
		check_signer(&self.public_key, signer)?;

		if self.actions.is_empty() {
			return Err(BuildError::NoActions.into());
		}

		let nonce = self.nonce.ok_or(BuildError::MissingNonce)?;
		let receiver_id = self.receiver_id.ok_or(BuildError::MissingReceiver)?;
		let max_block_height = self
			.max_block_height
			.ok_or(BuildError::MissingMaxBlockHeight)?;

		let actions = self
			.actions
			.into_iter()
			.map(NonDelegateAction::try_from)
			.collect::<Result<Vec<_>, _>>()
			.map_err(|_| BuildError::NestedDelegate)?;

		DelegateAction {
			sender_id: self.signer_id,
			receiver_id,
			actions,
			nonce,
			max_block_height,
			public_key: self.public_key,
		}
		.sign(signer)
	}
}

fn check_signer(
	expected: &PublicKey,
	signer: &dyn Signer,
) -> Result<(), BuildError> {
	let actual = signer.public_key();

	if &actual != expected {
		return Err(BuildError::SignerMismatch {
			expected: expected.clone(),
			actual,
		});
	}

	Ok(())
}
