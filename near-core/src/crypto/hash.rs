//! Sha256 digests
use std::{
	fmt,
	io::{self, Read, Write},
	str::FromStr,
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{codec::Codec, CoreError, CoreResult};

pub(crate) const CRYPTO_HASH_LENGTH: usize = 32;

#[derive(
	Serialize,
	Deserialize,
	Clone,
	Copy,
	Default,
	PartialEq,
	Eq,
	Hash,
	PartialOrd,
	Ord,
)]
#[serde(try_from = "String", into = "String")]
/// Sha256 digest, used for block hashes, transaction hashes and code hashes
pub struct CryptoHash(pub [u8; CRYPTO_HASH_LENGTH]);

impl CryptoHash {
	/// Hash the given bytes
	pub fn hash_bytes(data: impl AsRef<[u8]>) -> Self {
		Self(Sha256::digest(data.as_ref()).into())
	}

	/// Build a hash from exactly 32 bytes
	pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
		Ok(Self(
			bytes
				.try_into()
				.map_err(|_| CoreError::InvalidHashLength(bytes.len()))?,
		))
	}
}

impl AsRef<[u8]> for CryptoHash {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl From<[u8; CRYPTO_HASH_LENGTH]> for CryptoHash {
	fn from(value: [u8; CRYPTO_HASH_LENGTH]) -> Self {
		Self(value)
	}
}

impl Codec for CryptoHash {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		dest.write_all(&self.0)
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		Ok(Self(Codec::codec_deserialize(data)?))
	}
}

impl fmt::Display for CryptoHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&bs58::encode(self.0).into_string())
	}
}

impl fmt::Debug for CryptoHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl FromStr for CryptoHash {
	type Err = CoreError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::from_bytes(&bs58::decode(value).into_vec()?)
	}
}

impl TryFrom<String> for CryptoHash {
	type Error = CoreError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<CryptoHash> for String {
	fn from(value: CryptoHash) -> Self {
		value.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn should_sha256_hash_correctly() {
		let expected_hash_hex =
			"64ec88ca00b268e5ba1a35678a1b5316d212f4f366b2477232534a8aeca37f3c";

		assert_eq!(
			hex::encode(CryptoHash::hash_bytes("Hello world")),
			expected_hash_hex
		);
	}

	#[test]
	fn should_round_trip_base58() {
		let hash = CryptoHash::hash_bytes("block");
		let parsed: CryptoHash = hash.to_string().parse().unwrap();

		assert_eq!(parsed, hash);
	}

	#[test]
	fn should_reject_wrong_length() {
		assert!(matches!(
			CryptoHash::from_bytes(&[0u8; 31]),
			Err(CoreError::InvalidHashLength(31))
		));
		assert!("11111111".parse::<CryptoHash>().is_err());
	}

	#[test]
	fn should_serialize_without_length_prefix() {
		let hash = CryptoHash([9u8; 32]);

		assert_eq!(hash.serialize_to_vec(), vec![9u8; 32]);
	}
}
