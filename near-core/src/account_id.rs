//! Account identifier type and parsing
use std::{
	borrow::Borrow,
	fmt::{Display, Formatter},
	io::{self, Read, Write},
	ops::Deref,
	str::FromStr,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{Codec, FormatError};

/// Minimum account id length
pub const ACCOUNT_ID_MIN_LENGTH: usize = 2;
/// Maximum account id length
pub const ACCOUNT_ID_MAX_LENGTH: usize = 64;

/// Regex for account ids: lowercase alphanumeric parts separated by a single
/// `-`, `_` or `.`
pub static ACCOUNT_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^(([a-z0-9]+[\-_])*[a-z0-9]+\.)*([a-z0-9]+[\-_])*[a-z0-9]+$")
		.expect("account id regex is valid")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Error type for account id parsing
pub enum AccountIdError {
	#[error(
		"Length should be between {} and {}",
		ACCOUNT_ID_MIN_LENGTH,
		ACCOUNT_ID_MAX_LENGTH
	)]
	/// Invalid length
	InvalidLength,
	#[error("Expected lowercase alphanumeric parts separated by -, _ or .")]
	/// Invalid format
	InvalidFormat,
}

#[derive(
	PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
/// Validated account identifier
pub struct AccountId(String);

impl AccountId {
	/// Create a new account id from the given string
	pub fn new(account_id: &str) -> Result<Self, AccountIdError> {
		if account_id.len() < ACCOUNT_ID_MIN_LENGTH
			|| account_id.len() > ACCOUNT_ID_MAX_LENGTH
		{
			Err(AccountIdError::InvalidLength)
		} else if ACCOUNT_ID_REGEX.is_match(account_id) {
			Ok(Self(account_id.to_string()))
		} else {
			Err(AccountIdError::InvalidFormat)
		}
	}

	/// The account id as a string slice
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Codec for AccountId {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		self.0.codec_serialize(dest)
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self>
	where
		Self: Sized,
	{
		let account_id = String::codec_deserialize(data)?;

		Self::new(&account_id).map_err(FormatError::invalid_data)
	}
}

impl FromStr for AccountId {
	type Err = AccountIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

impl TryFrom<&str> for AccountId {
	type Error = AccountIdError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl TryFrom<String> for AccountId {
	type Error = AccountIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(&value)
	}
}

impl AsRef<str> for AccountId {
	fn as_ref(&self) -> &str {
		self.0.as_ref()
	}
}

impl Deref for AccountId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl Borrow<str> for AccountId {
	fn borrow(&self) -> &str {
		self.as_ref()
	}
}

impl From<AccountId> for String {
	fn from(value: AccountId) -> Self {
		value.0
	}
}

impl Display for AccountId {
	fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
		self.0.fmt(f)
	}
}
