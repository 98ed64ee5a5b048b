//! Access keys and their permissions
use std::io::{self, Read, Write};

use crate::{
	account_id::AccountId,
	codec::{
		impl_codec_for_struct, read_discriminant, write_tagged, Codec,
		FormatError,
	},
	Balance, CoreError, CoreResult, Nonce,
};

/// Longest method name a function call key may name
pub const MAX_METHOD_NAME_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Access key as stored on an account
pub struct AccessKey {
	/// Nonce the key starts from
	pub nonce: Nonce,
	/// What the key may do
	pub permission: AccessKeyPermission,
}

impl_codec_for_struct!(AccessKey { nonce, permission });

impl AccessKey {
	/// A key that can sign any transaction
	pub fn full_access() -> Self {
		Self {
			nonce: 0,
			permission: AccessKeyPermission::FullAccess,
		}
	}

	/// A key restricted to function calls on one contract
	pub fn function_call(permission: FunctionCallPermission) -> Self {
		Self {
			nonce: 0,
			permission: AccessKeyPermission::FunctionCall(permission),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Permission attached to an access key
pub enum AccessKeyPermission {
	/// Only function calls without deposit, within an allowance
	FunctionCall(FunctionCallPermission),
	/// Any action
	FullAccess,
}

impl Codec for AccessKeyPermission {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		match self {
			Self::FunctionCall(permission) => write_tagged(dest, 0, permission),
			Self::FullAccess => dest.write_all(&[1]),
		}
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		match read_discriminant(data)? {
			0 => Ok(Self::FunctionCall(Codec::codec_deserialize(data)?)),
			1 => Ok(Self::FullAccess),
			tag => Err(FormatError::unknown_discriminant(
				"AccessKeyPermission",
				tag,
			)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Function call restriction of an access key.
///
/// Method names are validated by [FunctionCallPermission::new], on decode too.
pub struct FunctionCallPermission {
	allowance: Option<Balance>,
	receiver_id: AccountId,
	method_names: Vec<String>,
}

impl FunctionCallPermission {
	/// Creates a permission, validating the method names
	pub fn new(
		allowance: Option<Balance>,
		receiver_id: AccountId,
		method_names: Vec<String>,
	) -> CoreResult<Self> {
		for method_name in &method_names {
			if method_name.is_empty() {
				return Err(CoreError::InvalidPermission(
					"method name must not be empty",
				));
			}

			if method_name.len() > MAX_METHOD_NAME_LENGTH {
				return Err(CoreError::InvalidPermission(
					"method name exceeds 256 bytes",
				));
			}
		}

		Ok(Self {
			allowance,
			receiver_id,
			method_names,
		})
	}

	/// Gas allowance in yoctoNEAR, unlimited when absent
	pub fn allowance(&self) -> Option<Balance> {
		self.allowance
	}

	/// The only contract the key may call
	pub fn receiver_id(&self) -> &AccountId {
		&self.receiver_id
	}

	/// Callable methods, any method when empty
	pub fn method_names(&self) -> &[String] {
		&self.method_names
	}
}

impl Codec for FunctionCallPermission {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		self.allowance.codec_serialize(dest)?;
		self.receiver_id.codec_serialize(dest)?;
		self.method_names.codec_serialize(dest)
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		let allowance = Codec::codec_deserialize(data)?;
		let receiver_id = Codec::codec_deserialize(data)?;
		let method_names = Codec::codec_deserialize(data)?;

		Self::new(allowance, receiver_id, method_names)
			.map_err(FormatError::invalid_data)
	}
}
