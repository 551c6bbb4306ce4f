//! Verifiable re-encryption mix-net: shuffle generation and its
//! zero-knowledge proof of correctness.

use num_bigint::BigUint;
use rand_core::{CryptoRng, RngCore};

use std::fmt;

use crate::{
    encryption::MultiCiphertext,
    group::{random_scalar_in, Group},
    keys::PublicKey,
};

pub(crate) mod proof;

pub use self::proof::ShuffleProof;

/// Errors raised for malformed shuffle inputs.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ShuffleError {
    /// The input batch is empty.
    Empty,
    /// The input multi-ciphertexts do not all have the same width.
    MixedWidths,
    /// The commitment key has fewer generators than there are inputs.
    CommitmentKeyTooSmall {
        /// Number of generators required (one per input).
        required: usize,
        /// Number of generators available.
        actual: usize,
    },
}

impl fmt::Display for ShuffleError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => formatter.write_str("cannot shuffle an empty batch"),
            Self::MixedWidths => {
                formatter.write_str("input multi-ciphertexts have mixed widths")
            }
            Self::CommitmentKeyTooSmall { required, actual } => write!(
                formatter,
                "commitment key has {actual} generator(s), {required} required"
            ),
        }
    }
}

impl std::error::Error for ShuffleError {}

/// Checks that the batch is non-empty and of uniform width; returns the
/// width.
pub(crate) fn uniform_width<G: Group>(
    batch: &[MultiCiphertext<G>],
) -> Result<usize, ShuffleError> {
    let width = batch.first().ok_or(ShuffleError::Empty)?.width();
    if batch.iter().any(|multi| multi.width() != width) {
        return Err(ShuffleError::MixedWidths);
    }
    Ok(width)
}

/// Permutation of `{0, …, N−1}`, stored as the forward array together
/// with its precomputed inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    forward: Vec<usize>,
    inverse: Vec<usize>,
}

impl Permutation {
    /// Samples a uniform permutation of the given size via Fisher–Yates.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn random<R: CryptoRng + RngCore>(size: usize, rng: &mut R) -> Self {
        assert!(size > 0, "cannot permute an empty set");
        let mut forward: Vec<_> = (0..size).collect();
        for position in (1..size).rev() {
            let other = uniform_index(rng, position + 1);
            forward.swap(position, other);
        }
        Self::from_forward_unchecked(forward)
    }

    /// Builds a permutation from its forward array after checking it is a
    /// bijection of `{0, …, N−1}`.
    pub fn from_forward(forward: Vec<usize>) -> Option<Self> {
        let mut seen = vec![false; forward.len()];
        for &image in &forward {
            if image >= forward.len() || seen[image] {
                return None;
            }
            seen[image] = true;
        }
        Some(Self::from_forward_unchecked(forward))
    }

    fn from_forward_unchecked(forward: Vec<usize>) -> Self {
        let mut inverse = vec![0; forward.len()];
        for (position, &image) in forward.iter().enumerate() {
            inverse[image] = position;
        }
        Self { forward, inverse }
    }

    /// Returns the number of permuted positions.
    pub fn size(&self) -> usize {
        self.forward.len()
    }

    /// Returns `π(position)`.
    pub fn apply(&self, position: usize) -> usize {
        self.forward[position]
    }

    /// Returns `π⁻¹(position)`.
    pub fn invert(&self, position: usize) -> usize {
        self.inverse[position]
    }
}

/// Samples a uniform index in `[0, bound)` by rejection.
fn uniform_index<R: CryptoRng + RngCore>(rng: &mut R, bound: usize) -> usize {
    let bound = bound as u32;
    let zone = u32::MAX - u32::MAX % bound;
    loop {
        let candidate = rng.next_u32();
        if candidate < zone {
            return (candidate % bound) as usize;
        }
    }
}

/// Secret witness of a shuffle: the permutation and the per-ciphertext
/// re-encryption coins.
#[derive(Debug, Clone)]
pub struct ShuffleWitness {
    pub(crate) permutation: Permutation,
    /// `coins[i][j]` re-randomizes component `j` of input `i`.
    pub(crate) coins: Vec<Vec<BigUint>>,
}

/// A re-encryption shuffle: permuted, re-randomized outputs plus the
/// secret witness needed to prove correctness.
pub struct Shuffle<G: Group> {
    outputs: Vec<MultiCiphertext<G>>,
    witness: ShuffleWitness,
}

impl<G: Group> fmt::Debug for Shuffle<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Shuffle")
            .field("outputs", &self.outputs)
            .finish()
    }
}

impl<G: Group> Shuffle<G> {
    /// Shuffles `inputs` under `receiver`: draws re-encryption coins in
    /// `[2, q)` and a random permutation π, re-randomizes every component
    /// and places the re-encryption of input `π⁻¹(i)` at output position
    /// `i`. Auxiliary metadata travels with its ciphertext.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch is empty or of mixed widths.
    pub fn new<R: CryptoRng + RngCore>(
        inputs: &[MultiCiphertext<G>],
        receiver: &PublicKey<G>,
        rng: &mut R,
    ) -> Result<Self, ShuffleError> {
        uniform_width(inputs)?;
        let order = G::order();

        let coins: Vec<Vec<_>> = inputs
            .iter()
            .map(|multi| {
                (0..multi.width())
                    .map(|_| random_scalar_in(rng, 2, order))
                    .collect()
            })
            .collect();
        let permutation = Permutation::random(inputs.len(), rng);

        let re_encrypted: Vec<_> = inputs
            .iter()
            .zip(&coins)
            .map(|(multi, multi_coins)| {
                let ciphertexts = multi
                    .ciphertexts()
                    .iter()
                    .zip(multi_coins)
                    .map(|(ciphertext, coin)| ciphertext.re_randomize(receiver, coin))
                    .collect();
                MultiCiphertext::new(ciphertexts).with_aux_data(multi.aux_data().clone())
            })
            .collect();
        let outputs = (0..inputs.len())
            .map(|position| re_encrypted[permutation.invert(position)].clone())
            .collect();

        Ok(Self {
            outputs,
            witness: ShuffleWitness { permutation, coins },
        })
    }

    /// Returns the shuffled outputs.
    pub fn outputs(&self) -> &[MultiCiphertext<G>] {
        &self.outputs
    }

    /// Returns the secret witness.
    pub(crate) fn witness(&self) -> &ShuffleWitness {
        &self.witness
    }

    /// Discards the witness and returns the outputs.
    pub fn into_outputs(self) -> Vec<MultiCiphertext<G>> {
        self.outputs
    }
}

/// Shuffles `inputs` and proves the shuffle correct in one step.
///
/// # Errors
///
/// Returns an error if the batch is malformed or the commitment key is
/// too small.
pub fn shuffle_and_prove<G: Group, R: CryptoRng + RngCore>(
    inputs: &[MultiCiphertext<G>],
    receiver: &PublicKey<G>,
    commitment_key: &crate::commitments::MultiCommitmentKey<G>,
    rng: &mut R,
) -> Result<(Vec<MultiCiphertext<G>>, ShuffleProof<G>), ShuffleError> {
    let shuffle = Shuffle::new(inputs, receiver, rng)?;
    let proof = ShuffleProof::new(inputs, &shuffle, receiver, commitment_key, rng)?;
    Ok((shuffle.into_outputs(), proof))
}
