//! Key derivation and transcript hashing.
//!
//! The key derivation function is NIST SP 800-108 in counter mode with
//! HMAC-SHA-512 as the PRF. Uniform integers below a bound are derived
//! from a seed by rejection sampling over KDF output, and Fiat–Shamir
//! challenges are such integers derived from a SHA-512 transcript digest.

use hmac::{Hmac, Mac};
use num_bigint::{BigInt, BigUint};
use sha2::{Digest, Sha512};

use crate::{bytes::ByteString, group::Group};

type HmacSha512 = Hmac<Sha512>;

/// Derives `output_len` bytes from `key` using SP 800-108 counter mode.
///
/// Block `i` is `HMAC-SHA-512(key, BE32(i) ‖ label ‖ 0x00 ‖ context ‖
/// BE32(output_len))`; blocks are concatenated and truncated to
/// `output_len` bytes.
pub fn kdf(key: &[u8], label: &[u8], context: &[u8], output_len: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(output_len);
    let mut block_index: u32 = 0;
    while output.len() < output_len {
        let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts keys of any length");
        mac.update(&block_index.to_be_bytes());
        mac.update(label);
        mac.update(&[0]);
        mac.update(context);
        mac.update(&(output_len as u32).to_be_bytes());
        output.extend_from_slice(&mac.finalize().into_bytes());
        block_index += 1;
    }
    output.truncate(output_len);
    output
}

/// Stream of pseudo-uniform integers in `[0, bound)` derived from a seed.
///
/// For counter c = 1, 2, … the candidate is the KDF output for key
/// `seed ‖ BE32(c)` with label `"generator"` and context `"Polyas"`, with
/// the top `8B − bitlength(bound)` bits cleared; candidates at or above
/// `bound` are rejected. The stream is deterministic in the seed.
#[derive(Debug, Clone)]
pub struct UniformNumbers {
    bound: BigUint,
    seed: Vec<u8>,
    byte_len: usize,
    excess_bits: u32,
    counter: u32,
}

impl UniformNumbers {
    /// Starts a stream for the given bound and seed.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    pub fn new(bound: BigUint, seed: &[u8]) -> Self {
        assert!(bound.bits() > 0, "bound must be positive");
        let bits = bound.bits();
        let byte_len = ((bits + 7) / 8) as usize;
        Self {
            excess_bits: (byte_len as u64 * 8 - bits) as u32,
            bound,
            seed: seed.to_vec(),
            byte_len,
            counter: 1,
        }
    }
}

impl Iterator for UniformNumbers {
    type Item = BigUint;

    fn next(&mut self) -> Option<BigUint> {
        loop {
            let mut key = Vec::with_capacity(self.seed.len() + 4);
            key.extend_from_slice(&self.seed);
            key.extend_from_slice(&self.counter.to_be_bytes());
            self.counter += 1;

            let mut candidate = kdf(&key, b"generator", b"Polyas", self.byte_len);
            if self.excess_bits > 0 {
                candidate[0] &= 0xff >> self.excess_bits;
            }
            let value = BigUint::from_bytes_be(&candidate);
            if value < self.bound {
                return Some(value);
            }
        }
    }
}

/// Derives a pseudo-uniform integer in `[0, bound)` from `seed`: the first
/// value of the corresponding [`UniformNumbers`] stream.
///
/// # Panics
///
/// Panics if `bound` is zero.
pub fn number_from_seed(bound: &BigUint, seed: &[u8]) -> BigUint {
    UniformNumbers::new(bound.clone(), seed)
        .next()
        .expect("stream is infinite")
}

/// Minimal two's-complement big-endian encoding of a non-negative integer
/// (a leading zero byte appears only when the high bit would otherwise be
/// set; zero encodes as a single zero byte).
pub(crate) fn to_signed_bytes_be(value: &BigUint) -> Vec<u8> {
    BigInt::from(value.clone()).to_signed_bytes_be()
}

/// Append-only SHA-512 transcript with branching.
///
/// A transcript is a *partial digest*: it can be cloned to branch, and
/// [`Self::challenge()`] operates on a clone, so deriving a challenge
/// neither consumes nor mutates the transcript. The shuffle proof relies
/// on this to derive its per-input challenge vector and its final
/// challenge from a shared prefix.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    hasher: Sha512,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update(bytes);
        self
    }

    /// Appends the contents of a byte string.
    pub fn append_byte_string(&mut self, bytes: &ByteString) -> &mut Self {
        self.append_bytes(bytes.as_slice())
    }

    /// Appends the UTF-8 bytes of `string`.
    pub fn append_str(&mut self, string: &str) -> &mut Self {
        self.append_bytes(string.as_bytes())
    }

    /// Appends a signed 32-bit integer in big-endian.
    pub fn append_i32(&mut self, value: i32) -> &mut Self {
        self.append_bytes(&value.to_be_bytes())
    }

    /// Appends a signed 64-bit integer in big-endian.
    pub fn append_i64(&mut self, value: i64) -> &mut Self {
        self.append_bytes(&value.to_be_bytes())
    }

    /// Appends a big integer as `BE32(len) ‖ two's-complement bytes`.
    pub fn append_uint(&mut self, value: &BigUint) -> &mut Self {
        let bytes = to_signed_bytes_be(value);
        self.append_bytes(&(bytes.len() as u32).to_be_bytes());
        self.append_bytes(&bytes)
    }

    /// Appends a group element via its canonical byte serialization.
    pub fn append_element<G: Group>(&mut self, element: &G::Element) -> &mut Self {
        let bytes = G::serialize_element(element);
        self.append_bytes(&bytes)
    }

    /// Derives a challenge in `[0, bound)` from the current transcript
    /// state without mutating it.
    pub fn challenge(&self, bound: &BigUint) -> BigUint {
        let digest = self.hasher.clone().finalize();
        number_from_seed(bound, &digest)
    }
}
