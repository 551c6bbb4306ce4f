//! Auxiliary transport encryption (ECIES over secp256k1).
//!
//! Not part of the verifiable core: these helpers move key material
//! between parties. The body cipher is AES-256-GCM with a zero IV, which
//! makes encryption under a fixed ephemeral key deterministic; freshness
//! comes from the ephemeral ECDH key drawn per message.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use std::fmt;

use crate::{
    group::{Group, Secp256k1},
    keys::{PublicKey, SecretKey},
};

/// Length of the compressed ephemeral key prefix.
const EPHEMERAL_KEY_LEN: usize = 33;

/// Errors of the ECIES transport.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EciesError {
    /// The ciphertext is shorter than the ephemeral key prefix.
    TooShort,
    /// The ephemeral key prefix is not a valid curve point.
    InvalidEphemeralKey,
    /// Authenticated decryption failed (wrong key or tampered body).
    Aead,
}

impl fmt::Display for EciesError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::TooShort => "ciphertext is too short to contain the ephemeral key",
            Self::InvalidEphemeralKey => "ephemeral key is not a valid curve point",
            Self::Aead => "authenticated decryption failed",
        })
    }
}

impl std::error::Error for EciesError {}

/// Derives the body key `k = SHA-256(Y ‖ Z ‖ pk)`.
fn body_key(ephemeral: &[u8], shared: &[u8], receiver: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(ephemeral);
    hasher.update(shared);
    hasher.update(receiver);
    Zeroizing::new(hasher.finalize().into())
}

fn body_cipher(key: &[u8; 32]) -> Aes256Gcm {
    Aes256Gcm::new_from_slice(key).expect("AES-256 key is 32 bytes")
}

/// Encrypts `plaintext` to `receiver`: draws an ephemeral keypair
/// `(y, Y = g^y)`, computes `Z = pk^y` and the body key
/// `SHA-256(Y ‖ Z ‖ pk)`, and produces `Y(33 bytes) ‖ AES-GCM body`.
pub fn encrypt<R: CryptoRng + RngCore>(
    receiver: &PublicKey<Secp256k1>,
    plaintext: &[u8],
    rng: &mut R,
) -> Vec<u8> {
    let ephemeral_secret = Secp256k1::generate_nonzero_scalar(rng);
    let ephemeral_bytes =
        Secp256k1::serialize_element(&Secp256k1::mul_generator(&ephemeral_secret));
    let shared_bytes = Secp256k1::serialize_element(&Secp256k1::pow(
        receiver.as_element(),
        &ephemeral_secret,
    ));

    let key = body_key(&ephemeral_bytes, &shared_bytes, receiver.as_bytes());
    let body = body_cipher(&key)
        .encrypt(Nonce::from_slice(&[0_u8; 12]), plaintext)
        .expect("AES-GCM encryption is infallible for in-memory payloads");

    let mut output = ephemeral_bytes;
    output.extend_from_slice(&body);
    output
}

/// Decrypts a ciphertext produced by [`encrypt()`].
///
/// # Errors
///
/// Returns an error if the ciphertext is malformed or fails
/// authentication.
pub fn decrypt(secret: &SecretKey<Secp256k1>, ciphertext: &[u8]) -> Result<Vec<u8>, EciesError> {
    if ciphertext.len() < EPHEMERAL_KEY_LEN {
        return Err(EciesError::TooShort);
    }
    let (ephemeral_bytes, body) = ciphertext.split_at(EPHEMERAL_KEY_LEN);
    let ephemeral = Secp256k1::deserialize_element(ephemeral_bytes)
        .ok_or(EciesError::InvalidEphemeralKey)?;

    let receiver = PublicKey::from(secret);
    let shared_bytes =
        Secp256k1::serialize_element(&Secp256k1::pow(&ephemeral, secret.expose_scalar()));
    let key = body_key(ephemeral_bytes, &shared_bytes, receiver.as_bytes());

    body_cipher(&key)
        .decrypt(Nonce::from_slice(&[0_u8; 12]), body)
        .map_err(|_| EciesError::Aead)
}

/// Deterministic key masking for key-storage interoperability.
///
/// The mask is the SHA-256 digest of the masking key, cycled to the
/// payload length and XOR-ed in. The construction is an involution and is
/// deliberately **not** IND-CCA secure; it exists bit-for-bit for
/// compatibility with existing stored key material.
#[derive(Debug)]
pub struct DeterministicKeyEncryption {
    mask_digest: Zeroizing<[u8; 32]>,
}

impl DeterministicKeyEncryption {
    /// Creates a masker from the masking key.
    pub fn new(key: &[u8]) -> Self {
        Self {
            mask_digest: Zeroizing::new(Sha256::digest(key).into()),
        }
    }

    /// Masks (or unmasks) `payload`; applying the function twice restores
    /// the input.
    pub fn mask(&self, payload: &[u8]) -> Vec<u8> {
        payload
            .iter()
            .enumerate()
            .map(|(position, byte)| byte ^ self.mask_digest[position % 32])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;
    use crate::Keypair;

    #[test]
    fn transport_round_trip() {
        let mut rng = thread_rng();
        let keypair = Keypair::<Secp256k1>::generate(&mut rng);
        let plaintext = b"share for teller 3";

        let ciphertext = encrypt(keypair.public(), plaintext, &mut rng);
        assert_eq!(ciphertext.len(), EPHEMERAL_KEY_LEN + plaintext.len() + 16);
        let decrypted = decrypt(keypair.secret(), &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn tampering_is_detected() {
        let mut rng = thread_rng();
        let keypair = Keypair::<Secp256k1>::generate(&mut rng);
        let mut ciphertext = encrypt(keypair.public(), b"secret", &mut rng);

        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 1;
        assert_eq!(
            decrypt(keypair.secret(), &ciphertext).unwrap_err(),
            EciesError::Aead
        );
    }

    #[test]
    fn malformed_ciphertexts_fail_fast() {
        let mut rng = thread_rng();
        let keypair = Keypair::<Secp256k1>::generate(&mut rng);
        assert_eq!(
            decrypt(keypair.secret(), &[0_u8; 10]).unwrap_err(),
            EciesError::TooShort
        );
        assert_eq!(
            decrypt(keypair.secret(), &[0xaa_u8; 50]).unwrap_err(),
            EciesError::InvalidEphemeralKey
        );
    }

    #[test]
    fn wrong_recipient_cannot_decrypt() {
        let mut rng = thread_rng();
        let keypair = Keypair::<Secp256k1>::generate(&mut rng);
        let other = Keypair::<Secp256k1>::generate(&mut rng);
        let ciphertext = encrypt(keypair.public(), b"secret", &mut rng);
        assert_eq!(
            decrypt(other.secret(), &ciphertext).unwrap_err(),
            EciesError::Aead
        );
    }

    #[test]
    fn masking_is_an_involution() {
        let masker = DeterministicKeyEncryption::new(b"storage-key");
        let payload: Vec<u8> = (0..100).collect();
        let masked = masker.mask(&payload);
        assert_ne!(masked, payload);
        assert_eq!(masker.mask(&masked), payload);
        // Deterministic across instances with the same key.
        let other = DeterministicKeyEncryption::new(b"storage-key");
        assert_eq!(other.mask(&payload), masked);
    }
}
