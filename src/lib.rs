//! Cryptographic core of a verifiable e-voting system: [ElGamal
//! encryption] over pluggable prime-order groups, Sigma-protocol NIZKPs,
//! verifiable threshold key generation and decryption, and a verifiable
//! re-encryption mix-net.
//!
//! # ⚠ Warnings
//!
//! While the protocols in this crate rely on standard cryptographic
//! assumptions (hardness of discrete log and Diffie–Hellman problems in
//! the provided groups), the implementation has not been independently
//! audited, and big-integer arithmetic is not constant-time beyond what
//! the underlying libraries provide. **Use at your own risk.**
//!
//! # Overview
//!
//! - [`Ciphertext`] and [`MultiCiphertext`] provide ElGamal encryption of
//!   group-encodable integers and of arbitrary byte strings (via the
//!   chunked codec), with participants' keys represented by
//!   [`PublicKey`], [`SecretKey`] and [`Keypair`].
//! - [`DlogProof`] and [`LogEqualityProof`] are Fiat–Shamir
//!   non-interactive proofs of discrete-log knowledge and of
//!   discrete-log equality; [`VerifiableDecryption`] proves a decryption
//!   correct. Verification outcomes are carried by the two-constructor
//!   [`VerificationResult`].
//! - [`sharing`] implements dealerless threshold key generation on
//!   Feldman commitments ([`sharing::Teller`]) and verifiable threshold
//!   decryption with Lagrange recombination.
//! - [`shuffle`] implements a verifiable re-encryption mix-net with the
//!   Haenni–Locher–Koenig–Dubuis (2017) proof of correct shuffle.
//! - [`commitments`] provides single and vector Pedersen commitments over
//!   seeded independent generators.
//! - [`ecies`] is an auxiliary (non-verifiable) key transport.
//!
//! # Backends
//!
//! The [`group`] module defines the [`Group`](group::Group) abstraction
//! every protocol is generic over, with two implementations:
//! safe-prime [`Schnorr`](group::Schnorr) groups (predefined at 512,
//! 1536, 2048 and 3072 bits) and the [`Secp256k1`](group::Secp256k1)
//! curve with Koblitz message encoding.
//!
//! # Example
//!
//! Threshold decryption of a shuffled batch:
//!
//! ```
//! use ballot_crypto::{
//!     group::Secp256k1, commitments::MultiCommitmentKey,
//!     sharing::{PublicKeySet, Teller, ThresholdConfig},
//!     shuffle::shuffle_and_prove,
//! };
//! use rand::thread_rng;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut rng = thread_rng();
//! let config = ThresholdConfig::new(2, 3);
//!
//! // Dealerless key generation among three tellers.
//! let tellers: Vec<_> = (1..=3)
//!     .map(|nr| Teller::<Secp256k1>::new(config, nr, &mut rng))
//!     .collect();
//! let key_set = PublicKeySet::<Secp256k1>::new(
//!     config,
//!     tellers.iter().map(|t| t.blinded_coefficients().to_vec()).collect(),
//! )?;
//! let election_key = key_set.shared_key();
//!
//! // Encrypt two ballots and mix them.
//! let ballots: Vec<_> = ["yes", "no"]
//!     .iter()
//!     .map(|vote| election_key.encrypt_message(vote, &mut rng))
//!     .collect::<Result<_, _>>()?;
//! let commitment_key = MultiCommitmentKey::derive(ballots.len(), b"mix-key");
//! let (mixed, proof) =
//!     shuffle_and_prove(&ballots, &election_key, &commitment_key, &mut rng)?;
//! proof
//!     .verify(&ballots, &mixed, &election_key, &commitment_key)
//!     .expect("shuffle proof verifies");
//! # Ok(())
//! # }
//! ```
//!
//! [ElGamal encryption]: https://en.wikipedia.org/wiki/ElGamal_encryption

#![warn(missing_debug_implementations, missing_docs, bare_trait_objects)]
#![warn(clippy::all)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

pub mod bytes;
pub mod commitments;
mod decryption;
pub mod ecies;
mod encryption;
pub mod group;
pub mod kdf;
mod keys;
mod proofs;
pub mod random;
mod serde;
pub mod sharing;
pub mod shuffle;

pub use crate::{
    decryption::VerifiableDecryption,
    encryption::{chunks_to_message, message_to_chunks, Ciphertext, MessageError, MultiCiphertext},
    keys::{Keypair, PublicKey, SecretKey},
    proofs::{DlogProof, LogEqualityProof, VerificationResult},
};
