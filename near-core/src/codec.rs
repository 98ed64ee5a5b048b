/*!
Canonical binary codec for every type that goes over the wire.

Integers are little-endian and fixed width, strings and sequences carry a
`u32` length prefix, fixed-size byte arrays are written raw, `Option<T>` is a
presence byte followed by the value and tagged unions are a one byte
discriminant followed by the variant body.
*/
use std::io::{self, Read, Write};

use thiserror::Error;

/// Errors produced while decoding malformed bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
	/// The input ended before the value was complete
	#[error("Unexpected end of input")]
	UnexpectedEof,
	/// A tagged union carried a tag outside of its variant range
	#[error("Unknown discriminant {value} for {type_name}")]
	UnknownDiscriminant {
		/// Name of the decoded type
		type_name: &'static str,
		/// The offending tag
		value: u8,
	},
	/// Bytes were left over after decoding a complete value
	#[error("{0} trailing bytes after decoding")]
	TrailingBytes(usize),
	/// The bytes were well framed but the value is invalid
	#[error("Invalid data: {0}")]
	InvalidData(String),
}

impl FormatError {
	/// Wraps the error so it can travel through `io::Result`
	pub fn into_io(self) -> io::Error {
		io::Error::new(io::ErrorKind::InvalidData, self)
	}

	/// Shorthand for an [FormatError::InvalidData] wrapped as `io::Error`
	pub fn invalid_data(message: impl ToString) -> io::Error {
		Self::InvalidData(message.to_string()).into_io()
	}

	/// Shorthand for an [FormatError::UnknownDiscriminant] wrapped as
	/// `io::Error`
	pub fn unknown_discriminant(
		type_name: &'static str,
		value: u8,
	) -> io::Error {
		Self::UnknownDiscriminant { type_name, value }.into_io()
	}
}

impl From<io::Error> for FormatError {
	fn from(err: io::Error) -> Self {
		if err.kind() == io::ErrorKind::UnexpectedEof {
			return Self::UnexpectedEof;
		}

		let message = err.to_string();

		match err.into_inner().map(|inner| inner.downcast::<FormatError>()) {
			Some(Ok(format_error)) => *format_error,
			_ => Self::InvalidData(message),
		}
	}
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, FormatError>;

/// Byte level serialization in the canonical wire layout.
///
/// Implementors only write `codec_serialize` and `codec_deserialize`; the
/// provided methods map I/O failures into [FormatError].
pub trait Codec {
	/// Writes the value into the buffer
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()>;

	/// Reads a value from the buffer
	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self>
	where
		Self: Sized;

	/// Serializes the value into the writer
	fn serialize<W: Write>(&self, dest: &mut W) -> CodecResult<()> {
		self.codec_serialize(dest).map_err(FormatError::from)
	}

	/// Deserializes a value from the reader, leaving any remaining bytes
	fn deserialize<R: Read>(data: &mut R) -> CodecResult<Self>
	where
		Self: Sized,
	{
		Self::codec_deserialize(data).map_err(FormatError::from)
	}

	/// Serializes the value into a fresh buffer
	fn serialize_to_vec(&self) -> Vec<u8> {
		let mut buffer = Vec::new();

		self.codec_serialize(&mut buffer)
			.expect("writing into a Vec cannot fail");

		buffer
	}

	/// Deserializes exactly one value, rejecting trailing bytes
	fn deserialize_from_slice(bytes: &[u8]) -> CodecResult<Self>
	where
		Self: Sized,
	{
		let mut remaining = bytes;
		let value = Self::deserialize(&mut remaining)?;

		if !remaining.is_empty() {
			return Err(FormatError::TrailingBytes(remaining.len()));
		}

		Ok(value)
	}
}

/// Reads a single tag byte
pub fn read_discriminant<R: Read>(data: &mut R) -> io::Result<u8> {
	let mut buffer = [0u8; 1];
	data.read_exact(&mut buffer)?;

	Ok(buffer[0])
}

/// Writes a tag byte followed by the variant body
pub fn write_tagged<W: Write, T: Codec>(
	dest: &mut W,
	discriminant: u8,
	body: &T,
) -> io::Result<()> {
	dest.write_all(&[discriminant])?;
	body.codec_serialize(dest)
}

fn read_length<R: Read>(data: &mut R) -> io::Result<usize> {
	Ok(u32::codec_deserialize(data)? as usize)
}

fn write_length<W: Write>(dest: &mut W, length: usize) -> io::Result<()> {
	let length = u32::try_from(length)
		.map_err(|_| FormatError::invalid_data("length exceeds u32"))?;

	length.codec_serialize(dest)
}

macro_rules! impl_codec_for_integer {
	($($ty:ty),*) => {
		$(
			impl Codec for $ty {
				fn codec_serialize<W: Write>(
					&self,
					dest: &mut W,
				) -> io::Result<()> {
					dest.write_all(&self.to_le_bytes())
				}

				fn codec_deserialize<R: Read>(
					data: &mut R,
				) -> io::Result<Self> {
					let mut buffer = [0u8; std::mem::size_of::<$ty>()];
					data.read_exact(&mut buffer)?;

					Ok(<$ty>::from_le_bytes(buffer))
				}
			}
		)*
	};
}

impl_codec_for_integer!(u8, u16, u32, u64, u128);

impl Codec for String {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		write_length(dest, self.len())?;
		dest.write_all(self.as_bytes())
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		let length = read_length(data)?;

		let mut buffer = Vec::new();
		data.by_ref().take(length as u64).read_to_end(&mut buffer)?;

		if buffer.len() != length {
			return Err(io::ErrorKind::UnexpectedEof.into());
		}

		String::from_utf8(buffer).map_err(FormatError::invalid_data)
	}
}

impl<T: Codec> Codec for Vec<T> {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		write_length(dest, self.len())?;

		for item in self {
			item.codec_serialize(dest)?;
		}

		Ok(())
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		let length = read_length(data)?;

		// The prefix is untrusted, the buffer grows as items actually decode
		let mut items = Vec::with_capacity(length.min(1024));

		for _ in 0..length {
			items.push(T::codec_deserialize(data)?);
		}

		Ok(items)
	}
}

impl<T: Codec> Codec for Option<T> {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		match self {
			None => dest.write_all(&[0]),
			Some(value) => write_tagged(dest, 1, value),
		}
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		match read_discriminant(data)? {
			0 => Ok(None),
			1 => Ok(Some(T::codec_deserialize(data)?)),
			value => Err(FormatError::unknown_discriminant("Option", value)),
		}
	}
}

impl<const N: usize> Codec for [u8; N] {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		dest.write_all(self)
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		let mut buffer = [0u8; N];
		data.read_exact(&mut buffer)?;

		Ok(buffer)
	}
}

impl<T: Codec> Codec for Box<T> {
	fn codec_serialize<W: Write>(&self, dest: &mut W) -> io::Result<()> {
		self.as_ref().codec_serialize(dest)
	}

	fn codec_deserialize<R: Read>(data: &mut R) -> io::Result<Self> {
		Ok(Box::new(T::codec_deserialize(data)?))
	}
}

/// Implements [Codec] for a struct by coding its fields in the listed order.
/// The list must match the declared field order of the wire layout.
macro_rules! impl_codec_for_struct {
	($name:ident { $($field:ident),+ $(,)? }) => {
		impl $crate::codec::Codec for $name {
			fn codec_serialize<W: std::io::Write>(
				&self,
				dest: &mut W,
			) -> std::io::Result<()> {
				$($crate::codec::Codec::codec_serialize(&self.$field, dest)?;)+
				Ok(())
			}

			fn codec_deserialize<R: std::io::Read>(
				data: &mut R,
			) -> std::io::Result<Self> {
				Ok(Self {
					$($field: $crate::codec::Codec::codec_deserialize(data)?,)+
				})
			}
		}
	};
}

pub(crate) use impl_codec_for_struct;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn should_serialize_integers_little_endian() {
		assert_eq!(0x0102_0304u32.serialize_to_vec(), vec![4, 3, 2, 1]);
		assert_eq!(
			1u64.serialize_to_vec(),
			hex::decode("0100000000000000").unwrap()
		);
		assert_eq!(u128::MAX.serialize_to_vec(), vec![0xff; 16]);
	}

	#[test]
	fn should_prefix_strings_with_length() {
		let serialized = "near".to_string().serialize_to_vec();

		assert_eq!(serialized, hex::decode("040000006e656172").unwrap());
		assert_eq!(
			String::deserialize_from_slice(&serialized).unwrap(),
			"near"
		);
	}

	#[test]
	fn should_serialize_options_with_presence_byte() {
		assert_eq!(None::<u8>.serialize_to_vec(), vec![0]);
		assert_eq!(Some(7u8).serialize_to_vec(), vec![1, 7]);
	}

	#[test]
	fn should_fail_on_length_past_end_of_buffer() {
		let bytes = hex::decode("0a000000616263").unwrap();

		assert_eq!(
			String::deserialize_from_slice(&bytes),
			Err(FormatError::UnexpectedEof)
		);
		assert_eq!(
			Vec::<u8>::deserialize_from_slice(&bytes),
			Err(FormatError::UnexpectedEof)
		);
	}

	#[test]
	fn should_fail_on_trailing_bytes() {
		assert_eq!(
			u32::deserialize_from_slice(&[1, 0, 0, 0, 9, 9]),
			Err(FormatError::TrailingBytes(2))
		);
	}

	#[test]
	fn should_fail_on_unknown_option_tag() {
		assert_eq!(
			Option::<u8>::deserialize_from_slice(&[2, 0]),
			Err(FormatError::UnknownDiscriminant {
				type_name: "Option",
				value: 2
			})
		);
	}

	#[test]
	fn should_reject_invalid_utf8() {
		let result = String::deserialize_from_slice(&[2, 0, 0, 0, 0xff, 0xfe]);

		assert!(matches!(result, Err(FormatError::InvalidData(_))));
	}

	#[test]
	fn should_write_fixed_arrays_without_prefix() {
		assert_eq!([7u8; 4].serialize_to_vec(), vec![7, 7, 7, 7]);
	}
}
