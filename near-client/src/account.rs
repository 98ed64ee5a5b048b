/*!
Nonce-managed submission for a single account.

Nonces are a single-writer sequence per (account, key) pair. An [Account]
fetches the access key nonce once, then hands out increasing nonces from a
shared cache. When the node still reports a stale nonce, the cache is moved
past the node's value and the transaction is signed and sent again, a bounded
number of times.
*/
use std::{collections::HashMap, sync::Arc};

use near_core::{
	action::SignedDelegateAction, AccountId, Action, Balance, BlockHeight, Gas,
	Nonce, PublicKey, Signer, TransactionBuilder,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
	error::{ClientError, ClientResult},
	outcome::TxOutcome,
	rpc::{
		client::{ChainQuery, RpcClient},
		WaitUntil,
	},
};

/// Nonces handed out so far, per (account, key)
type NonceCache = Arc<Mutex<HashMap<(AccountId, PublicKey), Nonce>>>;

/// Signs and submits transactions for one account
#[derive(Clone)]
pub struct Account {
	account_id: AccountId,
	signer: Arc<dyn Signer>,
	client: RpcClient,
	nonces: NonceCache,
	wait_until: WaitUntil,
	max_nonce_retries: u32,
}

impl Account {
	/// Create an account with its own nonce cache
	pub fn new(
		account_id: AccountId,
		signer: Arc<dyn Signer>,
		client: RpcClient,
	) -> Self {
		Self {
			account_id,
			signer,
			client,
			nonces: NonceCache::default(),
			wait_until: WaitUntil::default(),
			max_nonce_retries: 3,
		}
	}

	/// How long submissions wait for execution
	pub fn with_wait_until(mut self, wait_until: WaitUntil) -> Self {
		self.wait_until = wait_until;
		self
	}

	/// How often a stale nonce is refreshed before giving up
	pub fn with_max_nonce_retries(mut self, max_nonce_retries: u32) -> Self {
		self.max_nonce_retries = max_nonce_retries;
		self
	}

	/// The account id
	pub fn account_id(&self) -> &AccountId {
		&self.account_id
	}

	/// The underlying client
	pub fn client(&self) -> &RpcClient {
		&self.client
	}

	/// Signs and submits `actions` on `receiver_id`
	pub async fn send(
		&self,
		receiver_id: AccountId,
		actions: Vec<Action>,
	) -> ClientResult<TxOutcome> {
		let mut nonce_retries = 0;

		loop {
			let (nonce, block) = futures::try_join!(
				self.next_nonce(),
				self.client.recent_block()
			)?;

			let signed_transaction = TransactionBuilder::begin(
				self.account_id.clone(),
				self.signer.public_key(),
			)
			.add_actions(actions.iter().cloned())
			.with_nonce(nonce)
			.with_receiver(receiver_id.clone())
			.with_block_hash(block.hash)
			.build_and_sign(self.signer.as_ref())?;

			match self
				.client
				.broadcast(&signed_transaction, self.wait_until)
				.await
			{
				Err(ClientError::StaleNonce(err))
					if nonce_retries < self.max_nonce_retries =>
				{
					nonce_retries += 1;
					debug!(
						"Nonce {} is stale, access key is at {}, retry {} of {}",
						err.tx_nonce,
						err.ak_nonce,
						nonce_retries,
						self.max_nonce_retries
					);

					self.observe_nonce(err.ak_nonce).await;
				}
				result => return result,
			}
		}
	}

	/// Transfers `amount` yoctoNEAR to `receiver_id`
	pub async fn transfer(
		&self,
		receiver_id: AccountId,
		amount: Balance,
	) -> ClientResult<TxOutcome> {
		self.send(receiver_id, vec![Action::transfer(amount)]).await
	}

	/// Calls `method_name` on `contract_id`
	pub async fn function_call(
		&self,
		contract_id: AccountId,
		method_name: impl Into<String>,
		args: impl Into<Vec<u8>>,
		gas: Gas,
		deposit: Balance,
	) -> ClientResult<TxOutcome> {
		self.send(
			contract_id,
			vec![Action::function_call(method_name, args, gas, deposit)],
		)
		.await
	}

	/// Signs `actions` as a delegate action for a relayer to submit.
	///
	/// The action expires `validity` blocks after the latest final block.
	pub async fn delegate(
		&self,
		receiver_id: AccountId,
		actions: Vec<Action>,
		validity: BlockHeight,
	) -> ClientResult<SignedDelegateAction> {
		let (nonce, block) =
			futures::try_join!(self.next_nonce(), self.client.recent_block())?;

		Ok(TransactionBuilder::begin(
			self.account_id.clone(),
			self.signer.public_key(),
		)
		.add_actions(actions)
		.with_nonce(nonce)
		.with_receiver(receiver_id)
		.with_max_block_height(block.height.saturating_add(validity))
		.delegate(self.signer.as_ref())?)
	}

	async fn next_nonce(&self) -> ClientResult<Nonce> {
		let public_key = self.signer.public_key();
		let key = (self.account_id.clone(), public_key);
		let mut nonces = self.nonces.lock().await;

		let current = match nonces.get(&key) {
			Some(nonce) => *nonce,
			None => {
				let nonce = self.client.access_key_nonce(&key.0, &key.1).await?;
				debug!("Fetched nonce {} for {}", nonce, key.0);
				nonce
			}
		};

		let next = current + 1;
		nonces.insert(key, next);

		Ok(next)
	}

	async fn observe_nonce(&self, ak_nonce: Nonce) {
		let key = (self.account_id.clone(), self.signer.public_key());
		let mut nonces = self.nonces.lock().await;
		let nonce = nonces.entry(key).or_insert(ak_nonce);

		*nonce = (*nonce).max(ak_nonce);
	}
}

impl std::fmt::Debug for Account {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Account")
			.field("account_id", &self.account_id)
			.field("public_key", &self.signer.public_key())
			.field("wait_until", &self.wait_until)
			.finish_non_exhaustive()
	}
}
