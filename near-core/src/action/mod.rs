/*!
Actions: the operations a transaction carries.

[Action] is the full closed set. [NonDelegateAction] is the same set minus
[Action::Delegate] and is what a [DelegateAction] embeds, so a delegate can
never contain another delegate. Both share the same discriminants: the
position of a variant in [ActionKind] is its wire tag.
*/
use std::io::{self, Read, Write};

use strum::{Display, EnumIter, EnumString, FromRepr};

use crate::{
	account_id::AccountId,
	codec::{
		impl_codec_for_struct, read_discriminant, write_tagged, Codec,
		FormatError,
	},
	crypto::{hash::CryptoHash, PublicKey},
	Balance, Gas,
};

pub mod access_key;
pub mod delegate;

pub use access_key::{AccessKey, AccessKeyPermission, FunctionCallPermission};
pub use delegate::{DelegateAction, SignedDelegateAction};

/// Wire discriminants of [Action], in protocol order
#[repr(u8)]
#[derive(
	FromRepr,
	EnumIter,
	Display,
	EnumString,
	PartialEq,
	Eq,
	Hash,
	Copy,
	Clone,
	Debug,
)]
pub enum ActionKind {
	/// Create the receiver account
	CreateAccount = 0,
	/// Deploy contract code to the receiver
	DeployContract = 1,
	/// Call a contract method
	FunctionCall = 2,
	/// Transfer tokens
	Transfer = 3,
	/// Stake tokens with a validator key
	Stake = 4,
	/// Add an access key
	AddKey = 5,
	/// Delete an access key
	DeleteKey = 6,
	/// Delete the account
	DeleteAccount = 7,
	/// Relay a signed delegate action
	Delegate = 8,
	/// Publish contract code for reuse by other accounts
	DeployGlobalContract = 9,
	/// Use a previously published contract
	UseGlobalContract = 10,
}

impl ActionKind {
	fn read<R: Read>(
		data: &mut R,
		type_name: &'static str,
	) -> io::Result<Self> {
		let tag = read_discriminant(data)?;

		Self::from_repr(tag)
			.ok_or_else(|| FormatError::unknown_discriminant(type_name, tag))
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Create the receiver account
pub struct CreateAccountAction {}

impl Codec for CreateAccountAction {
	fn codec_serialize<W: Write>(&self, _dest: &mut W) -> io::Result<()> {
		Ok(())
	}

	fn codec_deserialize<R: Read>(_data: &mut R) -> io::Result<Self> {
		Ok(Self {})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Deploy contract code to the receiver
pub struct DeployContractAction {
	/// Wasm code
	pub code: Vec<u8>,
}

impl_codec_for_struct!(DeployContractAction { code });

#[derive(Debug, Clone, PartialEq, Eq)]
/// Call a contract method
pub struct FunctionCallAction {
	/// Method to call
	pub method_name: String,
	/// Raw call arguments, usually JSON
	pub args: Vec<u8>,
	/// Gas attached to the call
	pub gas: Gas,
	/// Tokens attached to the call
	pub deposit: Balance,
}

impl_codec_for_struct!(FunctionCallAction {
	method_name,
	args,
	gas,
	deposit
});

#[derive(Debug, Clone, PartialEq, Eq)]
/// Transfer tokens to the receiver
pub struct TransferAction {
	/// Amount in yoctoNEAR
	pub deposit: Balance,
}

impl_codec_for_struct!(TransferAction { deposit });

#[derive(Debug, Clone, PartialEq, Eq)]
/// Stake tokens
pub struct StakeAction {
	/// Amount to lock
	pub stake: Balance,
	/// Validator key
	pub public_key: PublicKey,
}

impl_codec_for_struct!(StakeAction { stake, public_key });

#[derive(Debug, Clone, PartialEq, Eq)]
/// Add an access key to the receiver account
pub struct AddKeyAction {
	/// Key to add
	pub public_key: PublicKey,
	/// Nonce and permission of the key
	pub access_key: AccessKey,
}

impl_codec_for_struct!(AddKeyAction {
	public_key,
	access_key
});

#[derive(Debug, Clone, PartialEq, Eq)]
/// Delete an access key from the receiver account
pub struct DeleteKeyAction {
	/// Key to delete
	pub public_key: PublicKey,
}

impl_codec_for_struct!(DeleteKeyAction { public_key });

#[derive(Debug, Clone, PartialEq, Eq)]
/// Delete the receiver account, sending its balance to the beneficiary
pub struct DeleteAccountAction {
	/// Account receiving the remaining balance
	pub beneficiary_id: AccountId,
}

impl_codec_for_struct!(DeleteAccountAction { beneficiary_id });

#[repr(u8)]
#[derive(FromRepr, Debug, Clone, Copy, PartialEq, Eq)]
/// How a global contract is addressed once deployed
pub enum GlobalContractDeployMode {
	/// Addressed by code hash, immutable
	CodeHash = 0,
	/// Addressed by the deploying account, upgradable by it
	AccountId = 1,
}

impl Codec for GlobalContractDeployMode {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		dest.write_all(&[*self as u8])
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		let tag = read_discriminant(data)?;

		Self::from_repr(tag).ok_or_else(|| {
			FormatError::unknown_discriminant("GlobalContractDeployMode", tag)
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Publish contract code for reuse
pub struct DeployGlobalContractAction {
	/// Wasm code
	pub code: Vec<u8>,
	/// Addressing mode
	pub deploy_mode: GlobalContractDeployMode,
}

impl_codec_for_struct!(DeployGlobalContractAction { code, deploy_mode });

#[derive(Debug, Clone, PartialEq, Eq)]
/// Reference to a published global contract
pub enum GlobalContractIdentifier {
	/// By code hash
	CodeHash(CryptoHash),
	/// By deploying account
	AccountId(AccountId),
}

impl Codec for GlobalContractIdentifier {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		match self {
			Self::CodeHash(hash) => write_tagged(dest, 0, hash),
			Self::AccountId(account_id) => write_tagged(dest, 1, account_id),
		}
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		match read_discriminant(data)? {
			0 => Ok(Self::CodeHash(Codec::codec_deserialize(data)?)),
			1 => Ok(Self::AccountId(Codec::codec_deserialize(data)?)),
			tag => Err(FormatError::unknown_discriminant(
				"GlobalContractIdentifier",
				tag,
			)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Use a published global contract as the receiver's code
pub struct UseGlobalContractAction {
	/// Which contract to use
	pub contract_identifier: GlobalContractIdentifier,
}

impl_codec_for_struct!(UseGlobalContractAction {
	contract_identifier
});

/// Any action a transaction can carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	/// Create the receiver account
	CreateAccount(CreateAccountAction),
	/// Deploy contract code
	DeployContract(DeployContractAction),
	/// Call a contract method
	FunctionCall(FunctionCallAction),
	/// Transfer tokens
	Transfer(TransferAction),
	/// Stake tokens
	Stake(StakeAction),
	/// Add an access key
	AddKey(AddKeyAction),
	/// Delete an access key
	DeleteKey(DeleteKeyAction),
	/// Delete the account
	DeleteAccount(DeleteAccountAction),
	/// Relay a signed delegate action
	Delegate(Box<SignedDelegateAction>),
	/// Publish contract code
	DeployGlobalContract(DeployGlobalContractAction),
	/// Use published contract code
	UseGlobalContract(UseGlobalContractAction),
}

impl Action {
	/// Create account action
	pub fn create_account() -> Self {
		Self::CreateAccount(CreateAccountAction {})
	}

	/// Deploy contract action
	pub fn deploy_contract(code: impl Into<Vec<u8>>) -> Self {
		Self::DeployContract(DeployContractAction { code: code.into() })
	}

	/// Function call action
	pub fn function_call(
		method_name: impl Into<String>,
		args: impl Into<Vec<u8>>,
		gas: Gas,
		deposit: Balance,
	) -> Self {
		Self::FunctionCall(FunctionCallAction {
			method_name: method_name.into(),
			args: args.into(),
			gas,
			deposit,
		})
	}

	/// Transfer action
	pub fn transfer(deposit: Balance) -> Self {
		Self::Transfer(TransferAction { deposit })
	}

	/// Stake action
	pub fn stake(stake: Balance, public_key: PublicKey) -> Self {
		Self::Stake(StakeAction { stake, public_key })
	}

	/// Add key action
	pub fn add_key(public_key: PublicKey, access_key: AccessKey) -> Self {
		Self::AddKey(AddKeyAction {
			public_key,
			access_key,
		})
	}

	/// Delete key action
	pub fn delete_key(public_key: PublicKey) -> Self {
		Self::DeleteKey(DeleteKeyAction { public_key })
	}

	/// Delete account action
	pub fn delete_account(beneficiary_id: AccountId) -> Self {
		Self::DeleteAccount(DeleteAccountAction { beneficiary_id })
	}

	/// Delegate action carrying a signed meta transaction
	pub fn delegate(signed_delegate: SignedDelegateAction) -> Self {
		Self::Delegate(Box::new(signed_delegate))
	}

	/// Deploy global contract action
	pub fn deploy_global_contract(
		code: impl Into<Vec<u8>>,
		deploy_mode: GlobalContractDeployMode,
	) -> Self {
		Self::DeployGlobalContract(DeployGlobalContractAction {
			code: code.into(),
			deploy_mode,
		})
	}

	/// Use global contract action
	pub fn use_global_contract(
		contract_identifier: GlobalContractIdentifier,
	) -> Self {
		Self::UseGlobalContract(UseGlobalContractAction {
			contract_identifier,
		})
	}

	/// The discriminant of this action
	pub fn kind(&self) -> ActionKind {
		match self {
			Self::CreateAccount(_) => ActionKind::CreateAccount,
			Self::DeployContract(_) => ActionKind::DeployContract,
			Self::FunctionCall(_) => ActionKind::FunctionCall,
			Self::Transfer(_) => ActionKind::Transfer,
			Self::Stake(_) => ActionKind::Stake,
			Self::AddKey(_) => ActionKind::AddKey,
			Self::DeleteKey(_) => ActionKind::DeleteKey,
			Self::DeleteAccount(_) => ActionKind::DeleteAccount,
			Self::Delegate(_) => ActionKind::Delegate,
			Self::DeployGlobalContract(_) => ActionKind::DeployGlobalContract,
			Self::UseGlobalContract(_) => ActionKind::UseGlobalContract,
		}
	}

	fn read_body<R: Read>(kind: ActionKind, data: &mut R) -> io::Result<Self> {
		Ok(match kind {
			ActionKind::CreateAccount => {
				Self::CreateAccount(Codec::codec_deserialize(data)?)
			}
			ActionKind::DeployContract => {
				Self::DeployContract(Codec::codec_deserialize(data)?)
			}
			ActionKind::FunctionCall => {
				Self::FunctionCall(Codec::codec_deserialize(data)?)
			}
			ActionKind::Transfer => {
				Self::Transfer(Codec::codec_deserialize(data)?)
			}
			ActionKind::Stake => Self::Stake(Codec::codec_deserialize(data)?),
			ActionKind::AddKey => Self::AddKey(Codec::codec_deserialize(data)?),
			ActionKind::DeleteKey => {
				Self::DeleteKey(Codec::codec_deserialize(data)?)
			}
			ActionKind::DeleteAccount => {
				Self::DeleteAccount(Codec::codec_deserialize(data)?)
			}
			ActionKind::Delegate => {
				Self::Delegate(Codec::codec_deserialize(data)?)
			}
			ActionKind::DeployGlobalContract => {
				Self::DeployGlobalContract(Codec::codec_deserialize(data)?)
			}
			ActionKind::UseGlobalContract => {
				Self::UseGlobalContract(Codec::codec_deserialize(data)?)
			}
		})
	}
}

impl Codec for Action {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		let tag = self.kind() as u8;

		match self {
			Self::CreateAccount(action) => write_tagged(dest, tag, action),
			Self::DeployContract(action) => write_tagged(dest, tag, action),
			Self::FunctionCall(action) => write_tagged(dest, tag, action),
			Self::Transfer(action) => write_tagged(dest, tag, action),
			Self::Stake(action) => write_tagged(dest, tag, action),
			Self::AddKey(action) => write_tagged(dest, tag, action),
			Self::DeleteKey(action) => write_tagged(dest, tag, action),
			Self::DeleteAccount(action) => write_tagged(dest, tag, action),
			Self::Delegate(action) => write_tagged(dest, tag, action),
			Self::DeployGlobalContract(action) => {
				write_tagged(dest, tag, action)
			}
			Self::UseGlobalContract(action) => write_tagged(dest, tag, action),
		}
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		let kind = ActionKind::read(data, "Action")?;

		Self::read_body(kind, data)
	}
}

/// Every [Action] except [Action::Delegate]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonDelegateAction {
	/// Create the receiver account
	CreateAccount(CreateAccountAction),
	/// Deploy contract code
	DeployContract(DeployContractAction),
	/// Call a contract method
	FunctionCall(FunctionCallAction),
	/// Transfer tokens
	Transfer(TransferAction),
	/// Stake tokens
	Stake(StakeAction),
	/// Add an access key
	AddKey(AddKeyAction),
	/// Delete an access key
	DeleteKey(DeleteKeyAction),
	/// Delete the account
	DeleteAccount(DeleteAccountAction),
	/// Publish contract code
	DeployGlobalContract(DeployGlobalContractAction),
	/// Use published contract code
	UseGlobalContract(UseGlobalContractAction),
}

impl NonDelegateAction {
	/// The discriminant of this action, shared with [Action]
	pub fn kind(&self) -> ActionKind {
		match self {
			Self::CreateAccount(_) => ActionKind::CreateAccount,
			Self::DeployContract(_) => ActionKind::DeployContract,
			Self::FunctionCall(_) => ActionKind::FunctionCall,
			Self::Transfer(_) => ActionKind::Transfer,
			Self::Stake(_) => ActionKind::Stake,
			Self::AddKey(_) => ActionKind::AddKey,
			Self::DeleteKey(_) => ActionKind::DeleteKey,
			Self::DeleteAccount(_) => ActionKind::DeleteAccount,
			Self::DeployGlobalContract(_) => ActionKind::DeployGlobalContract,
			Self::UseGlobalContract(_) => ActionKind::UseGlobalContract,
		}
	}
}

impl TryFrom<Action> for NonDelegateAction {
	type Error = Action;

	/// Fails with the original action when it is a delegate
	fn try_from(action: Action) -> Result<Self, Self::Error> {
		Ok(match action {
			Action::CreateAccount(action) => Self::CreateAccount(action),
			Action::DeployContract(action) => Self::DeployContract(action),
			Action::FunctionCall(action) => Self::FunctionCall(action),
			Action::Transfer(action) => Self::Transfer(action),
			Action::Stake(action) => Self::Stake(action),
			Action::AddKey(action) => Self::AddKey(action),
			Action::DeleteKey(action) => Self::DeleteKey(action),
			Action::DeleteAccount(action) => Self::DeleteAccount(action),
			Action::DeployGlobalContract(action) => {
				Self::DeployGlobalContract(action)
			}
			Action::UseGlobalContract(action) => {
				Self::UseGlobalContract(action)
			}
			action @ Action::Delegate(_) => return Err(action),
		})
	}
}

impl From<NonDelegateAction> for Action {
	fn from(action: NonDelegateAction) -> Self {
		match action {
			NonDelegateAction::CreateAccount(action) => {
				Self::CreateAccount(action)
			}
			NonDelegateAction::DeployContract(action) => {
				Self::DeployContract(action)
			}
			NonDelegateAction::FunctionCall(action) => {
				Self::FunctionCall(action)
			}
			NonDelegateAction::Transfer(action) => Self::Transfer(action),
			NonDelegateAction::Stake(action) => Self::Stake(action),
			NonDelegateAction::AddKey(action) => Self::AddKey(action),
			NonDelegateAction::DeleteKey(action) => Self::DeleteKey(action),
			NonDelegateAction::DeleteAccount(action) => {
				Self::DeleteAccount(action)
			}
			NonDelegateAction::DeployGlobalContract(action) => {
				Self::DeployGlobalContract(action)
			}
			NonDelegateAction::UseGlobalContract(action) => {
				Self::UseGlobalContract(action)
			}
		}
	}
}

impl Codec for NonDelegateAction {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		let tag = self.kind() as u8;

		match self {
			Self::CreateAccount(action) => write_tagged(dest, tag, action),
			Self::DeployContract(action) => write_tagged(dest, tag, action),
			Self::FunctionCall(action) => write_tagged(dest, tag, action),
			Self::Transfer(action) => write_tagged(dest, tag, action),
			Self::Stake(action) => write_tagged(dest, tag, action),
			Self::AddKey(action) => write_tagged(dest, tag, action),
			Self::DeleteKey(action) => write_tagged(dest, tag, action),
			Self::DeleteAccount(action) => write_tagged(dest, tag, action),
			Self::DeployGlobalContract(action) => {
				write_tagged(dest, tag, action)
			}
			Self::UseGlobalContract(action) => write_tagged(dest, tag, action),
		}
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		let kind = ActionKind::read(data, "NonDelegateAction")?;

		if kind == ActionKind::Delegate {
			return Err(FormatError::unknown_discriminant(
				"NonDelegateAction",
				kind as u8,
			));
		}

		Action::read_body(kind, data)?.try_into().map_err(|_| {
			FormatError::unknown_discriminant("NonDelegateAction", kind as u8)
		})
	}
}

#[cfg(test)]
mod tests {
	use strum::IntoEnumIterator;

	use super::*;
	use crate::{crypto::SecretKey, signer::InMemorySigner};

	fn public_key() -> PublicKey {
		PublicKey::Ed25519([3u8; 32])
	}

	fn account(id: &str) -> AccountId {
		AccountId::new(id).unwrap()
	}

	fn one_of_each() -> Vec<Action> {
		let signer = InMemorySigner::new(
			account("alice.near"),
			SecretKey::ed25519_from_seed([1u8; 32]),
		)
		.unwrap();
		let delegate = DelegateAction {
			sender_id: account("alice.near"),
			receiver_id: account("bob.near"),
			actions: vec![NonDelegateAction::Transfer(TransferAction {
				deposit: 5,
			})],
			nonce: 2,
			max_block_height: 100,
			public_key: crate::signer::Signer::public_key(&signer),
		}
		.sign(&signer)
		.unwrap();

		vec![
			Action::create_account(),
			Action::deploy_contract(vec![0, 97, 115, 109]),
			Action::function_call(
				"add",
				br#"{"a":1}"#.to_vec(),
				30_000_000_000_000,
				1,
			),
			Action::transfer(1),
			Action::stake(10, public_key()),
			Action::add_key(public_key(), AccessKey::full_access()),
			Action::delete_key(public_key()),
			Action::delete_account(account("bob.near")),
			Action::delegate(delegate),
			Action::deploy_global_contract(
				vec![1, 2, 3],
				GlobalContractDeployMode::AccountId,
			),
			Action::use_global_contract(GlobalContractIdentifier::CodeHash(
				CryptoHash([4u8; 32]),
			)),
		]
	}

	#[test]
	fn should_emit_protocol_discriminants() {
		for (expected_tag, action) in one_of_each().into_iter().enumerate() {
			assert_eq!(action.serialize_to_vec()[0] as usize, expected_tag);
			assert_eq!(action.kind() as usize, expected_tag);
		}

		for (expected_tag, kind) in ActionKind::iter().enumerate() {
			assert_eq!(kind as usize, expected_tag);
		}
	}

	#[test]
	fn should_round_trip_every_action() {
		for action in one_of_each() {
			let bytes = action.serialize_to_vec();

			assert_eq!(Action::deserialize_from_slice(&bytes).unwrap(), action);
		}
	}

	#[test]
	fn should_round_trip_large_transfer_deposit() {
		let deposit: Balance = "1000000000000000000000000".parse().unwrap();
		let bytes = Action::transfer(deposit).serialize_to_vec();

		assert_eq!(bytes.len(), 17);
		assert_eq!(bytes[0], ActionKind::Transfer as u8);

		match Action::deserialize_from_slice(&bytes).unwrap() {
			Action::Transfer(TransferAction { deposit: decoded }) => {
				assert_eq!(decoded.to_string(), "1000000000000000000000000")
			}
			other => panic!("Expected a transfer, got {:?}", other),
		}
	}

	#[test]
	fn should_encode_function_call_fields_in_order() {
		let bytes =
			Action::function_call("m", vec![0xaa], 7, 9).serialize_to_vec();
		let expected = hex::decode(concat!(
			"02",
			"01000000",
			"6d",
			"01000000",
			"aa",
			"0700000000000000",
			"09000000000000000000000000000000"
		))
		.unwrap();

		assert_eq!(bytes, expected);
	}

	#[test]
	fn should_encode_create_account_as_bare_tag() {
		assert_eq!(Action::create_account().serialize_to_vec(), vec![0]);
	}

	#[test]
	fn should_reject_unknown_action_tag() {
		assert_eq!(
			Action::deserialize_from_slice(&[11]),
			Err(FormatError::UnknownDiscriminant {
				type_name: "Action",
				value: 11
			})
		);
	}

	#[test]
	fn should_share_tags_between_action_sets() {
		let action =
			NonDelegateAction::UseGlobalContract(UseGlobalContractAction {
				contract_identifier: GlobalContractIdentifier::AccountId(
					account("lib.near"),
				),
			});
		let bytes = action.serialize_to_vec();

		assert_eq!(bytes[0], 10);
		assert_eq!(
			Action::deserialize_from_slice(&bytes).unwrap(),
			Action::from(action)
		);
	}

	#[test]
	fn should_reject_nested_delegate() {
		let delegate = one_of_each().remove(8);
		let bytes = delegate.serialize_to_vec();

		assert_eq!(
			NonDelegateAction::deserialize_from_slice(&bytes),
			Err(FormatError::UnknownDiscriminant {
				type_name: "NonDelegateAction",
				value: 8
			})
		);
		assert!(NonDelegateAction::try_from(delegate).is_err());
	}
}
