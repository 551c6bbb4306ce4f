//! Pedersen commitments, single and vectorized.

use num_bigint::BigUint;

use std::fmt;

use crate::group::Group;

/// Seed of the default Pedersen commitment key.
const COMMITMENT_KEY_SEED: &[u8] = b"pedersen-commitment-key";

/// Key for single-value Pedersen commitments: one independent generator
/// `ck` derived from a fixed seed.
///
/// `commit(v, r) = g^v · ck^r` is perfectly hiding and computationally
/// binding under the discrete-log assumption, since nobody knows
/// `log_g(ck)`.
pub struct CommitmentKey<G: Group> {
    element: G::Element,
}

impl<G: Group> Clone for CommitmentKey<G> {
    fn clone(&self) -> Self {
        Self {
            element: self.element.clone(),
        }
    }
}

impl<G: Group> fmt::Debug for CommitmentKey<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("CommitmentKey")
            .field(&hex::encode(G::serialize_element(&self.element)))
            .finish()
    }
}

impl<G: Group> CommitmentKey<G> {
    /// Derives the default commitment key from the fixed seed.
    ///
    /// Groups whose canonical commitment key has a published encoding
    /// (secp256k1) return that exact pinned element, so commitments
    /// interoperate byte-for-byte with other implementations.
    pub fn derive() -> Self {
        let mut elements = G::elements_from_seed(1, COMMITMENT_KEY_SEED);
        Self {
            element: elements.remove(0),
        }
    }

    /// Wraps an existing, validated group element as a commitment key.
    pub fn from_element(element: G::Element) -> Self {
        Self { element }
    }

    /// Returns the key element.
    pub fn element(&self) -> &G::Element {
        &self.element
    }

    /// Commits to `value` with the random coin `randomness`.
    pub fn commit(&self, value: &BigUint, randomness: &BigUint) -> G::Element {
        G::mul(
            &G::mul_generator(value),
            &G::pow(&self.element, randomness),
        )
    }
}

/// Key for vector Pedersen commitments: a blinding generator `h` and `n`
/// message generators `h₁ … hₙ`, all derived from one seed.
pub struct MultiCommitmentKey<G: Group> {
    h: G::Element,
    hs: Vec<G::Element>,
}

impl<G: Group> Clone for MultiCommitmentKey<G> {
    fn clone(&self) -> Self {
        Self {
            h: self.h.clone(),
            hs: self.hs.clone(),
        }
    }
}

impl<G: Group> fmt::Debug for MultiCommitmentKey<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MultiCommitmentKey")
            .field("h", &self.h)
            .field("size", &self.hs.len())
            .finish()
    }
}

impl<G: Group> MultiCommitmentKey<G> {
    /// Derives a key committing to up to `size` values from `seed`.
    pub fn derive(size: usize, seed: &[u8]) -> Self {
        let mut elements = G::elements_from_seed(size + 1, seed);
        let h = elements.remove(0);
        Self { h, hs: elements }
    }

    /// Returns the number of values this key can commit to.
    pub fn size(&self) -> usize {
        self.hs.len()
    }

    /// Returns the blinding generator `h`.
    pub fn h(&self) -> &G::Element {
        &self.h
    }

    /// Returns the message generators `h₁ … hₙ`.
    pub fn hs(&self) -> &[G::Element] {
        &self.hs
    }

    /// Commits to `values` with the random coin `randomness`:
    /// `h^r · Π hᵢ^{vᵢ}`.
    ///
    /// # Panics
    ///
    /// Panics if there are more values than message generators.
    pub fn commit(&self, values: &[BigUint], randomness: &BigUint) -> G::Element {
        assert!(
            values.len() <= self.hs.len(),
            "committing to {} values with a key of size {}",
            values.len(),
            self.hs.len()
        );
        values
            .iter()
            .zip(&self.hs)
            .fold(G::pow(&self.h, randomness), |acc, (value, generator)| {
                G::mul(&acc, &G::pow(generator, value))
            })
    }
}
