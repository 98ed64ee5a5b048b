//! Keys and signatures in both supported curves, in their wire and text forms
use std::{
	fmt,
	io::{self, Read, Write},
	str::FromStr,
};

use ed25519_dalek::{Signer as _, Verifier as _};
use secp256k1::{
	ecdsa::{RecoverableSignature, RecoveryId},
	Message, Secp256k1,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, FromRepr};

use crate::{
	codec::{read_discriminant, Codec, FormatError},
	CoreError, CoreResult,
};

pub mod hash;

/// Ed25519 public key length
pub const ED25519_PUBLIC_KEY_LENGTH: usize = 32;
/// Ed25519 signature length
pub const ED25519_SIGNATURE_LENGTH: usize = 64;
/// Ed25519 key file secret length (seed followed by public key)
pub const ED25519_SECRET_KEY_LENGTH: usize = 64;
/// Secp256k1 public key length, uncompressed without the `0x04` prefix
pub const SECP256K1_PUBLIC_KEY_LENGTH: usize = 64;
/// Secp256k1 signature length (`r || s || v`)
pub const SECP256K1_SIGNATURE_LENGTH: usize = 65;
/// Secp256k1 secret key length
pub const SECP256K1_SECRET_KEY_LENGTH: usize = 32;

/// Supported curves, the repr is the wire discriminant
#[repr(u8)]
#[derive(
	FromRepr, Display, EnumString, PartialEq, Eq, Hash, Copy, Clone, Debug,
)]
#[strum(serialize_all = "lowercase")]
pub enum KeyType {
	/// Ed25519
	Ed25519 = 0,
	/// Secp256k1
	Secp256k1 = 1,
}

impl KeyType {
	fn read<R: Read>(
		data: &mut R,
		type_name: &'static str,
	) -> io::Result<Self> {
		let tag = read_discriminant(data)?;

		Self::from_repr(tag)
			.ok_or_else(|| FormatError::unknown_discriminant(type_name, tag))
	}
}

fn to_array<const N: usize>(
	key_type: KeyType,
	bytes: &[u8],
) -> CoreResult<[u8; N]> {
	bytes.try_into().map_err(|_| CoreError::InvalidKeyLength {
		key_type,
		expected: N,
		actual: bytes.len(),
	})
}

fn split_key_string(value: &str) -> CoreResult<(KeyType, Vec<u8>)> {
	let (key_type, data) = match value.split_once(':') {
		Some((prefix, data)) => (
			KeyType::from_str(prefix)
				.map_err(|_| CoreError::UnknownKeyType(prefix.to_string()))?,
			data,
		),
		None => (KeyType::Ed25519, value),
	};

	Ok((key_type, bs58::decode(data).into_vec()?))
}

/// Public key tagged by curve
#[derive(
	Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum PublicKey {
	/// Ed25519 public key
	Ed25519([u8; ED25519_PUBLIC_KEY_LENGTH]),
	/// Secp256k1 public key
	Secp256k1([u8; SECP256K1_PUBLIC_KEY_LENGTH]),
}

impl PublicKey {
	/// Build a key from its curve and raw bytes, validating the length
	pub fn from_parts(key_type: KeyType, bytes: &[u8]) -> CoreResult<Self> {
		Ok(match key_type {
			KeyType::Ed25519 => Self::Ed25519(to_array(key_type, bytes)?),
			KeyType::Secp256k1 => Self::Secp256k1(to_array(key_type, bytes)?),
		})
	}

	/// The curve of this key
	pub fn key_type(&self) -> KeyType {
		match self {
			Self::Ed25519(_) => KeyType::Ed25519,
			Self::Secp256k1(_) => KeyType::Secp256k1,
		}
	}

	/// The raw key bytes
	pub fn as_bytes(&self) -> &[u8] {
		match self {
			Self::Ed25519(bytes) => bytes,
			Self::Secp256k1(bytes) => bytes,
		}
	}
}

impl Codec for PublicKey {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		dest.write_all(&[self.key_type() as u8])?;
		dest.write_all(self.as_bytes())
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		Ok(match KeyType::read(data, "PublicKey")? {
			KeyType::Ed25519 => Self::Ed25519(Codec::codec_deserialize(data)?),
			KeyType::Secp256k1 => {
				Self::Secp256k1(Codec::codec_deserialize(data)?)
			}
		})
	}
}

impl fmt::Display for PublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}:{}",
			self.key_type(),
			bs58::encode(self.as_bytes()).into_string()
		)
	}
}

impl fmt::Debug for PublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl FromStr for PublicKey {
	type Err = CoreError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let (key_type, bytes) = split_key_string(value)?;

		Self::from_parts(key_type, &bytes)
	}
}

impl TryFrom<String> for PublicKey {
	type Error = CoreError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<PublicKey> for String {
	fn from(value: PublicKey) -> Self {
		value.to_string()
	}
}

/// Signature tagged by curve
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Signature {
	/// Ed25519 signature
	Ed25519([u8; ED25519_SIGNATURE_LENGTH]),
	/// Secp256k1 recoverable signature
	Secp256k1([u8; SECP256K1_SIGNATURE_LENGTH]),
}

impl Signature {
	/// Build a signature from its curve and raw bytes, validating the length
	pub fn from_parts(key_type: KeyType, bytes: &[u8]) -> CoreResult<Self> {
		Ok(match key_type {
			KeyType::Ed25519 => Self::Ed25519(to_array(key_type, bytes)?),
			KeyType::Secp256k1 => Self::Secp256k1(to_array(key_type, bytes)?),
		})
	}

	/// The curve of this signature
	pub fn key_type(&self) -> KeyType {
		match self {
			Self::Ed25519(_) => KeyType::Ed25519,
			Self::Secp256k1(_) => KeyType::Secp256k1,
		}
	}

	/// The raw signature bytes
	pub fn as_bytes(&self) -> &[u8] {
		match self {
			Self::Ed25519(bytes) => bytes,
			Self::Secp256k1(bytes) => bytes,
		}
	}

	/// Checks the signature of `data` against `public_key`.
	///
	/// Secp256k1 signatures are over a 32 byte digest, any other input length
	/// fails verification.
	pub fn verify(&self, data: &[u8], public_key: &PublicKey) -> bool {
		match (self, public_key) {
			(Self::Ed25519(signature), PublicKey::Ed25519(key)) => {
				ed25519_dalek::VerifyingKey::from_bytes(key)
					.map(|key| {
						key.verify(
							data,
							&ed25519_dalek::Signature::from_bytes(signature),
						)
						.is_ok()
					})
					.unwrap_or(false)
			}
			(Self::Secp256k1(signature), PublicKey::Secp256k1(key)) => {
				recover_secp256k1(data, signature)
					.map(|recovered| recovered == *key)
					.unwrap_or(false)
			}
			_ => false,
		}
	}
}

fn recover_secp256k1(
	data: &[u8],
	signature: &[u8; SECP256K1_SIGNATURE_LENGTH],
) -> Option<[u8; SECP256K1_PUBLIC_KEY_LENGTH]> {
	let message = Message::from_slice(data).ok()?;
	let recovery_id = RecoveryId::from_i32(signature[64] as i32).ok()?;
	let signature =
		RecoverableSignature::from_compact(&signature[..64], recovery_id)
			.ok()?;

	let public_key = Secp256k1::verification_only()
		.recover_ecdsa(&message, &signature)
		.ok()?;

	public_key.serialize_uncompressed()[1..].try_into().ok()
}

impl Codec for Signature {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		dest.write_all(&[self.key_type() as u8])?;
		dest.write_all(self.as_bytes())
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		Ok(match KeyType::read(data, "Signature")? {
			KeyType::Ed25519 => Self::Ed25519(Codec::codec_deserialize(data)?),
			KeyType::Secp256k1 => {
				Self::Secp256k1(Codec::codec_deserialize(data)?)
			}
		})
	}
}

impl fmt::Display for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}:{}",
			self.key_type(),
			bs58::encode(self.as_bytes()).into_string()
		)
	}
}

impl fmt::Debug for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl FromStr for Signature {
	type Err = CoreError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let (key_type, bytes) = split_key_string(value)?;

		Self::from_parts(key_type, &bytes)
	}
}

impl TryFrom<String> for Signature {
	type Error = CoreError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<Signature> for String {
	fn from(value: Signature) -> Self {
		value.to_string()
	}
}

/// Secret key material in the key file format
#[derive(Clone)]
pub enum SecretKey {
	/// Ed25519 seed followed by the public key
	Ed25519([u8; ED25519_SECRET_KEY_LENGTH]),
	/// Secp256k1 scalar
	Secp256k1([u8; SECP256K1_SECRET_KEY_LENGTH]),
}

impl SecretKey {
	/// Build an ed25519 secret from a 32 byte seed
	pub fn ed25519_from_seed(seed: [u8; 32]) -> Self {
		let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);

		Self::Ed25519(signing_key.to_keypair_bytes())
	}

	/// The curve of this key
	pub fn key_type(&self) -> KeyType {
		match self {
			Self::Ed25519(_) => KeyType::Ed25519,
			Self::Secp256k1(_) => KeyType::Secp256k1,
		}
	}

	/// Derive the matching public key
	pub fn public_key(&self) -> CoreResult<PublicKey> {
		match self {
			Self::Ed25519(bytes) => Ok(PublicKey::Ed25519(
				self.ed25519_signing_key(bytes).verifying_key().to_bytes(),
			)),
			Self::Secp256k1(bytes) => {
				let secret = secp256k1::SecretKey::from_slice(bytes)
					.map_err(|err| CoreError::Signing(err.to_string()))?;
				let public = secp256k1::PublicKey::from_secret_key(
					&Secp256k1::new(),
					&secret,
				);

				PublicKey::from_parts(
					KeyType::Secp256k1,
					&public.serialize_uncompressed()[1..],
				)
			}
		}
	}

	/// Sign the data. Secp256k1 keys only sign 32 byte digests.
	pub fn sign(&self, data: &[u8]) -> CoreResult<Signature> {
		match self {
			Self::Ed25519(bytes) => Ok(Signature::Ed25519(
				self.ed25519_signing_key(bytes).sign(data).to_bytes(),
			)),
			Self::Secp256k1(bytes) => {
				let secret = secp256k1::SecretKey::from_slice(bytes)
					.map_err(|err| CoreError::Signing(err.to_string()))?;
				let message = Message::from_slice(data).map_err(|_| {
					CoreError::InvalidArguments(
						"secp256k1 signs exactly 32 bytes",
					)
				})?;

				let (recovery_id, compact) = Secp256k1::new()
					.sign_ecdsa_recoverable(&message, &secret)
					.serialize_compact();

				let mut signature = [0u8; SECP256K1_SIGNATURE_LENGTH];
				signature[..64].copy_from_slice(&compact);
				signature[64] = recovery_id.to_i32() as u8;

				Ok(Signature::Secp256k1(signature))
			}
		}
	}

	fn ed25519_signing_key(
		&self,
		bytes: &[u8; ED25519_SECRET_KEY_LENGTH],
	) -> ed25519_dalek::SigningKey {
		let mut seed = [0u8; 32];
		seed.copy_from_slice(&bytes[..32]);

		ed25519_dalek::SigningKey::from_bytes(&seed)
	}
}

impl fmt::Debug for SecretKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretKey({}:<redacted>)", self.key_type())
	}
}

impl fmt::Display for SecretKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let bytes: &[u8] = match self {
			Self::Ed25519(bytes) => bytes,
			Self::Secp256k1(bytes) => bytes,
		};

		write!(f, "{}:{}", self.key_type(), bs58::encode(bytes).into_string())
	}
}

impl FromStr for SecretKey {
	type Err = CoreError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let (key_type, bytes) = split_key_string(value)?;

		match key_type {
			KeyType::Ed25519 if bytes.len() == 32 => {
				Ok(Self::ed25519_from_seed(to_array(key_type, &bytes)?))
			}
			KeyType::Ed25519 => Ok(Self::Ed25519(to_array(key_type, &bytes)?)),
			KeyType::Secp256k1 => {
				Ok(Self::Secp256k1(to_array(key_type, &bytes)?))
			}
		}
	}
}
