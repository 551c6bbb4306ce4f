//! Immutable byte strings with structured building and consumption.

use base64ct::{Base64, Encoding};

use std::{fmt, ops::Range, str, sync::Arc};

/// Errors that can occur when constructing or consuming [`ByteString`]s.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum BytesError {
    /// A read or slice went past the end of the underlying bytes.
    OutOfBounds {
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes actually available.
        available: usize,
    },
    /// The input is not valid hexadecimal.
    InvalidHex,
    /// The input is not valid base64.
    InvalidBase64,
    /// The bytes are not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for BytesError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds {
                requested,
                available,
            } => write!(
                formatter,
                "requested {requested} byte(s), but only {available} byte(s) are available"
            ),
            Self::InvalidHex => formatter.write_str("input is not valid hexadecimal"),
            Self::InvalidBase64 => formatter.write_str("input is not valid base64"),
            Self::InvalidUtf8 => formatter.write_str("bytes are not valid UTF-8"),
        }
    }
}

impl std::error::Error for BytesError {}

/// Immutable sequence of bytes with O(1) slicing.
///
/// Slices share the underlying storage with their parent; no mutation is
/// observable through any handle. Textual representations use lowercase
/// hex and standard base64.
#[derive(Clone)]
pub struct ByteString {
    bytes: Arc<[u8]>,
    range: Range<usize>,
}

impl ByteString {
    /// Creates an empty byte string.
    pub fn empty() -> Self {
        Self::from(&[] as &[u8])
    }

    /// Parses a byte string from hex.
    pub fn from_hex(hex_str: &str) -> Result<Self, BytesError> {
        hex::decode(hex_str)
            .map(Self::from)
            .map_err(|_| BytesError::InvalidHex)
    }

    /// Parses a byte string from standard base64.
    pub fn from_base64(base64_str: &str) -> Result<Self, BytesError> {
        Base64::decode_vec(base64_str)
            .map(Self::from)
            .map_err(|_| BytesError::InvalidBase64)
    }

    /// Returns the number of bytes.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Checks whether this byte string is empty.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Returns a view of the underlying bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[self.range.clone()]
    }

    /// Returns the sub-string at `range`, sharing storage with `self`.
    ///
    /// # Errors
    ///
    /// Returns an error if `range` does not lie within this byte string.
    pub fn slice(&self, range: Range<usize>) -> Result<Self, BytesError> {
        if range.start > range.end || range.end > self.len() {
            return Err(BytesError::OutOfBounds {
                requested: range.end,
                available: self.len(),
            });
        }
        Ok(Self {
            bytes: Arc::clone(&self.bytes),
            range: (self.range.start + range.start)..(self.range.start + range.end),
        })
    }

    /// Returns the lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_slice())
    }

    /// Returns the base64 representation.
    pub fn to_base64(&self) -> String {
        Base64::encode_string(self.as_slice())
    }

    /// Interprets the bytes as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid UTF-8.
    pub fn as_str(&self) -> Result<&str, BytesError> {
        str::from_utf8(self.as_slice()).map_err(|_| BytesError::InvalidUtf8)
    }

    /// Starts consuming this byte string from the beginning.
    pub fn consumer(&self) -> ByteConsumer {
        ByteConsumer {
            source: self.clone(),
            position: 0,
        }
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(bytes: Vec<u8>) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        let range = 0..bytes.len();
        Self { bytes, range }
    }
}

impl From<&[u8]> for ByteString {
    fn from(bytes: &[u8]) -> Self {
        Self::from(bytes.to_vec())
    }
}

impl From<&str> for ByteString {
    fn from(string: &str) -> Self {
        Self::from(string.as_bytes())
    }
}

impl PartialEq for ByteString {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteString {}

impl fmt::Debug for ByteString {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("ByteString")
            .field(&self.to_hex())
            .finish()
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Append-only builder for [`ByteString`]s.
///
/// Multi-byte integers are appended in big-endian two's complement.
/// Length prefixes are unsigned 32-bit big-endian.
#[derive(Debug, Default)]
pub struct ByteBuilder {
    buffer: Vec<u8>,
}

impl ByteBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a signed 16-bit integer.
    pub fn append_i16(&mut self, value: i16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Appends a signed 32-bit integer.
    pub fn append_i32(&mut self, value: i32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Appends a signed 64-bit integer.
    pub fn append_i64(&mut self, value: i64) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Appends raw bytes without a length prefix.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    /// Appends the UTF-8 bytes of `string` without a length prefix.
    pub fn append_str(&mut self, string: &str) -> &mut Self {
        self.append_bytes(string.as_bytes())
    }

    /// Appends `bytes` preceded by their 32-bit big-endian length.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than `u32::MAX`.
    pub fn append_length_prefixed_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        let len = u32::try_from(bytes.len()).expect("byte string length exceeds u32 range");
        self.buffer.extend_from_slice(&len.to_be_bytes());
        self.append_bytes(bytes)
    }

    /// Appends a length-prefixed UTF-8 string.
    pub fn append_length_prefixed_str(&mut self, string: &str) -> &mut Self {
        self.append_length_prefixed_bytes(string.as_bytes())
    }

    /// Appends a nested byte string (length-prefixed).
    pub fn append_byte_string(&mut self, bytes: &ByteString) -> &mut Self {
        self.append_length_prefixed_bytes(bytes.as_slice())
    }

    /// Finishes building and returns the accumulated bytes.
    pub fn build(self) -> ByteString {
        ByteString::from(self.buffer)
    }
}

/// Positional consumer over a [`ByteString`].
#[derive(Debug)]
pub struct ByteConsumer {
    source: ByteString,
    position: usize,
}

impl ByteConsumer {
    /// Returns the number of bytes left to consume.
    pub fn remaining(&self) -> usize {
        self.source.len() - self.position
    }

    /// Consumes the next `count` bytes as a sub-string sharing storage
    /// with the source.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than `count` bytes remain.
    pub fn next_bytes(&mut self, count: usize) -> Result<ByteString, BytesError> {
        if count > self.remaining() {
            return Err(BytesError::OutOfBounds {
                requested: count,
                available: self.remaining(),
            });
        }
        let piece = self.source.slice(self.position..self.position + count)?;
        self.position += count;
        Ok(piece)
    }

    /// Consumes a signed 32-bit big-endian integer.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 4 bytes remain.
    pub fn next_i32(&mut self) -> Result<i32, BytesError> {
        let bytes = self.next_bytes(4)?;
        let mut array = [0_u8; 4];
        array.copy_from_slice(bytes.as_slice());
        Ok(i32::from_be_bytes(array))
    }

    /// Consumes all remaining bytes.
    pub fn remainder(&mut self) -> ByteString {
        let remaining = self.remaining();
        self.next_bytes(remaining)
            .unwrap_or_else(|_| ByteString::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slicing_shares_storage() {
        let string = ByteString::from(&b"hello, world"[..]);
        let slice = string.slice(7..12).unwrap();
        assert_eq!(slice.as_slice(), b"world");
        let nested = slice.slice(1..3).unwrap();
        assert_eq!(nested.as_slice(), b"or");
        assert!(Arc::ptr_eq(&string.bytes, &nested.bytes));
    }

    #[test]
    fn out_of_bounds_slice_fails() {
        let string = ByteString::from(&b"abc"[..]);
        assert!(string.slice(1..5).is_err());
        assert!(string.slice(2..3).is_ok());
    }

    #[test]
    fn hex_and_base64_round_trip() {
        let string = ByteString::from(&[0x00, 0xff, 0x10, 0x20][..]);
        assert_eq!(string.to_hex(), "00ff1020");
        assert_eq!(ByteString::from_hex(&string.to_hex()).unwrap(), string);
        assert_eq!(ByteString::from_base64(&string.to_base64()).unwrap(), string);
        assert!(ByteString::from_hex("0g").is_err());
    }

    #[test]
    fn builder_layout() {
        let mut builder = ByteBuilder::new();
        builder
            .append_i32(-2)
            .append_i16(258)
            .append_length_prefixed_str("ab")
            .append_bytes(&[7]);
        let built = builder.build();
        assert_eq!(
            built.as_slice(),
            &[0xff, 0xff, 0xff, 0xfe, 0x01, 0x02, 0, 0, 0, 2, b'a', b'b', 7]
        );
    }

    #[test]
    fn consumer_round_trip() {
        let mut builder = ByteBuilder::new();
        builder.append_i32(42).append_bytes(b"tail");
        let built = builder.build();

        let mut consumer = built.consumer();
        assert_eq!(consumer.next_i32().unwrap(), 42);
        assert_eq!(consumer.remainder().as_slice(), b"tail");
        assert_eq!(consumer.remaining(), 0);
        assert!(consumer.next_i32().is_err());
    }

    #[test]
    fn nested_byte_string_is_length_prefixed() {
        let inner = ByteString::from(&b"xyz"[..]);
        let mut builder = ByteBuilder::new();
        builder.append_byte_string(&inner);
        let built = builder.build();
        assert_eq!(built.as_slice(), &[0, 0, 0, 3, b'x', b'y', b'z']);
    }

    #[test]
    fn utf8_view() {
        let string = ByteString::from("héllo");
        assert_eq!(string.as_str().unwrap(), "héllo");
        assert!(ByteString::from(&[0xff, 0xfe][..]).as_str().is_err());
    }
}
