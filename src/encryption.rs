//! ElGamal ciphertexts and the chunked plaintext codec.

use num_bigint::BigUint;
use rand_core::{CryptoRng, RngCore};

use std::{collections::HashMap, fmt};

use crate::{
    bytes::ByteString,
    group::{EncodingError, Group},
    keys::{PublicKey, SecretKey},
};

/// ElGamal ciphertext: a pair `(x, y) = (g^r, encode(m) · pk^r)`.
pub struct Ciphertext<G: Group> {
    pub(crate) x: G::Element,
    pub(crate) y: G::Element,
}

impl<G: Group> Clone for Ciphertext<G> {
    fn clone(&self) -> Self {
        Self {
            x: self.x.clone(),
            y: self.y.clone(),
        }
    }
}

impl<G: Group> PartialEq for Ciphertext<G> {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl<G: Group> fmt::Debug for Ciphertext<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Ciphertext")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<G: Group> Ciphertext<G> {
    /// Assembles a ciphertext from its components. The components must be
    /// valid group elements (e.g. obtained via [`Group::deserialize_element`]).
    pub fn from_parts(x: G::Element, y: G::Element) -> Self {
        Self { x, y }
    }

    /// Returns the random element `g^r`.
    pub fn x(&self) -> &G::Element {
        &self.x
    }

    /// Returns the blinded message `encode(m) · pk^r`.
    pub fn y(&self) -> &G::Element {
        &self.y
    }

    /// Re-randomizes this ciphertext with the explicit coin `r`,
    /// multiplying in a fresh encryption of the identity.
    pub fn re_randomize(&self, receiver: &PublicKey<G>, coin: &BigUint) -> Self {
        Self {
            x: G::mul(&self.x, &G::mul_generator(coin)),
            y: G::mul(&self.y, &G::pow(receiver.as_element(), coin)),
        }
    }
}

/// Ordered sequence of ciphertexts carrying one logical plaintext,
/// with optional auxiliary metadata.
///
/// The metadata is opaque to this crate; it is preserved through
/// re-encryption shuffles and never enters any proof transcript.
pub struct MultiCiphertext<G: Group> {
    pub(crate) ciphertexts: Vec<Ciphertext<G>>,
    pub(crate) aux_data: HashMap<String, String>,
}

impl<G: Group> Clone for MultiCiphertext<G> {
    fn clone(&self) -> Self {
        Self {
            ciphertexts: self.ciphertexts.clone(),
            aux_data: self.aux_data.clone(),
        }
    }
}

impl<G: Group> PartialEq for MultiCiphertext<G> {
    fn eq(&self, other: &Self) -> bool {
        self.ciphertexts == other.ciphertexts && self.aux_data == other.aux_data
    }
}

impl<G: Group> fmt::Debug for MultiCiphertext<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MultiCiphertext")
            .field("ciphertexts", &self.ciphertexts)
            .field("aux_data", &self.aux_data)
            .finish()
    }
}

impl<G: Group> MultiCiphertext<G> {
    /// Wraps a sequence of ciphertexts without metadata.
    pub fn new(ciphertexts: Vec<Ciphertext<G>>) -> Self {
        Self {
            ciphertexts,
            aux_data: HashMap::new(),
        }
    }

    /// Attaches auxiliary metadata.
    pub fn with_aux_data(mut self, aux_data: HashMap<String, String>) -> Self {
        self.aux_data = aux_data;
        self
    }

    /// Returns the number of component ciphertexts (the *width*).
    pub fn width(&self) -> usize {
        self.ciphertexts.len()
    }

    /// Returns the component ciphertexts.
    pub fn ciphertexts(&self) -> &[Ciphertext<G>] {
        &self.ciphertexts
    }

    /// Returns the auxiliary metadata.
    pub fn aux_data(&self) -> &HashMap<String, String> {
        &self.aux_data
    }
}

/// Errors produced when decoding a chunked plaintext.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MessageError {
    /// A decrypted block does not fit into the chunk size.
    OversizedBlock,
    /// The decoded bytes are shorter than the two-byte pad header.
    MissingPadHeader,
    /// The pad length exceeds the decoded payload.
    PadTooLong,
    /// A padding byte is nonzero.
    NonzeroPadding,
}

impl fmt::Display for MessageError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::OversizedBlock => "decrypted block does not fit into the chunk size",
            Self::MissingPadHeader => "decoded bytes are shorter than the pad header",
            Self::PadTooLong => "pad length exceeds the decoded payload",
            Self::NonzeroPadding => "padding byte is nonzero",
        })
    }
}

impl std::error::Error for MessageError {}

/// Chunk size in bytes for the group: `(bitlength(q) − 1) / 8`.
fn chunk_size<G: Group>() -> usize {
    ((G::order().bits() - 1) / 8) as usize
}

/// Splits a byte string into block integers, each below the group order.
///
/// The payload is prefixed with two big-endian bytes carrying the length
/// of the trailing zero pad, chosen so the padded length is a multiple of
/// the chunk size.
pub fn message_to_chunks<G: Group>(message: &[u8]) -> Vec<BigUint> {
    let size = chunk_size::<G>();
    let pad_len = (size - (message.len() + 2) % size) % size;

    let mut padded = Vec::with_capacity(message.len() + 2 + pad_len);
    padded.extend_from_slice(&(pad_len as u16).to_be_bytes());
    padded.extend_from_slice(message);
    padded.resize(padded.len() + pad_len, 0);

    padded
        .chunks(size)
        .map(BigUint::from_bytes_be)
        .collect()
}

/// Reassembles a byte string from block integers produced by
/// [`message_to_chunks()`].
pub fn chunks_to_message<G: Group>(chunks: &[BigUint]) -> Result<ByteString, MessageError> {
    let size = chunk_size::<G>();
    let mut bytes = Vec::with_capacity(chunks.len() * size);
    for chunk in chunks {
        // `to_bytes_be` is minimal, so a valid block occupies at most
        // `size` bytes and is left-padded with zeros below.
        let raw = chunk.to_bytes_be();
        if raw.len() > size {
            return Err(MessageError::OversizedBlock);
        }
        bytes.resize(bytes.len() + size - raw.len(), 0);
        bytes.extend_from_slice(&raw);
    }

    if bytes.len() < 2 {
        return Err(MessageError::MissingPadHeader);
    }
    let pad_len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    if pad_len + 2 > bytes.len() {
        return Err(MessageError::PadTooLong);
    }
    let data_end = bytes.len() - pad_len;
    if bytes[data_end..].iter().any(|&byte| byte != 0) {
        return Err(MessageError::NonzeroPadding);
    }
    Ok(ByteString::from(&bytes[2..data_end]))
}

impl<G: Group> PublicKey<G> {
    /// Encrypts a message in `[0, message_upper_bound)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be encoded in the group.
    pub fn encrypt<R: CryptoRng + RngCore>(
        &self,
        message: &BigUint,
        rng: &mut R,
    ) -> Result<Ciphertext<G>, EncodingError> {
        let coin = G::generate_nonzero_scalar(rng);
        let encoded = G::encode(message)?;
        Ok(Ciphertext {
            x: G::mul_generator(&coin),
            y: G::mul(&encoded, &G::pow(&self.element, &coin)),
        })
    }

    /// Encrypts an arbitrary byte string, chunking it into as many
    /// ciphertexts as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a chunk cannot be encoded in the group (this
    /// cannot happen for the provided Schnorr groups and is cosmically
    /// unlikely for secp256k1).
    pub fn encrypt_message<R: CryptoRng + RngCore>(
        &self,
        message: impl AsRef<[u8]>,
        rng: &mut R,
    ) -> Result<MultiCiphertext<G>, EncodingError> {
        let ciphertexts = message_to_chunks::<G>(message.as_ref())
            .iter()
            .map(|chunk| self.encrypt(chunk, rng))
            .collect::<Result<_, _>>()?;
        Ok(MultiCiphertext::new(ciphertexts))
    }
}

impl<G: Group> SecretKey<G> {
    /// Decrypts a ciphertext: `decode(y · (x^sk)⁻¹)`.
    pub fn decrypt(&self, ciphertext: &Ciphertext<G>) -> BigUint {
        let shared = G::pow(&ciphertext.x, &self.scalar);
        G::decode(&G::div(&ciphertext.y, &shared))
    }

    /// Decrypts a chunked multi-ciphertext back into a byte string.
    ///
    /// # Errors
    ///
    /// Returns an error if the decrypted chunks do not form a valid padded
    /// message.
    pub fn decrypt_message(
        &self,
        multi: &MultiCiphertext<G>,
    ) -> Result<ByteString, MessageError> {
        let chunks: Vec<_> = multi
            .ciphertexts
            .iter()
            .map(|ciphertext| self.decrypt(ciphertext))
            .collect();
        chunks_to_message::<G>(&chunks)
    }
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;
    use crate::group::{Schnorr512, Secp256k1};

    #[test]
    fn encryption_round_trip() {
        fn check<G: Group>() {
            let mut rng = thread_rng();
            let keypair = crate::Keypair::<G>::generate(&mut rng);
            for message in [0_u32, 1, 42, 100_000] {
                let message = BigUint::from(message);
                let ciphertext = keypair.public().encrypt(&message, &mut rng).unwrap();
                assert_eq!(keypair.secret().decrypt(&ciphertext), message);
            }
        }
        check::<Secp256k1>();
        check::<Schnorr512>();
    }

    #[test]
    fn re_randomization_preserves_the_plaintext() {
        let mut rng = thread_rng();
        let keypair = crate::Keypair::<Secp256k1>::generate(&mut rng);
        let message = BigUint::from(1337_u32);
        let ciphertext = keypair.public().encrypt(&message, &mut rng).unwrap();

        let coin = Secp256k1::generate_nonzero_scalar(&mut rng);
        let re_randomized = ciphertext.re_randomize(keypair.public(), &coin);
        assert_ne!(re_randomized, ciphertext);
        assert_eq!(keypair.secret().decrypt(&re_randomized), message);
    }

    #[test]
    fn chunk_codec_round_trip() {
        fn check<G: Group>() {
            for len in [0_usize, 1, 29, 30, 31, 32, 61, 100, 500] {
                let message: Vec<u8> = (0..len).map(|i| (i % 251) as u8 + 1).collect();
                let chunks = message_to_chunks::<G>(&message);
                for chunk in &chunks {
                    assert!(chunk < G::message_upper_bound());
                }
                let decoded = chunks_to_message::<G>(&chunks).unwrap();
                assert_eq!(decoded.as_slice(), &message[..]);
            }
        }
        check::<Secp256k1>();
        check::<Schnorr512>();
    }

    #[test]
    fn tampered_padding_is_rejected() {
        let message = b"padded message";
        let mut chunks = message_to_chunks::<Secp256k1>(message);
        // Force a nonzero byte into the zero pad of the last block.
        let last = chunks.last_mut().unwrap();
        *last += 1_u32;
        assert!(matches!(
            chunks_to_message::<Secp256k1>(&chunks),
            Err(MessageError::NonzeroPadding) | Err(MessageError::PadTooLong)
        ));
    }

    #[test]
    fn chunked_encryption_round_trip() {
        let mut rng = thread_rng();
        let keypair = crate::Keypair::<Secp256k1>::generate(&mut rng);
        let message = b"a ballot that does not fit into a single group element, \
                        not even close, because it is rather long";
        let multi = keypair.public().encrypt_message(message, &mut rng).unwrap();
        assert!(multi.width() > 1);
        let decrypted = keypair.secret().decrypt_message(&multi).unwrap();
        assert_eq!(decrypted.as_slice(), message);
    }
}
