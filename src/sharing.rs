//! Verifiable threshold key generation and decryption based on
//! Shamir/Feldman secret sharing.
//!
//! Key generation is dealerless: each of `n` *tellers* holds a random
//! polynomial of length `t`, publishes Feldman commitments to its
//! coefficients (with a discrete-log proof per coefficient) and sends
//! every peer an evaluation of its polynomial. After verifying all peer
//! records a teller finalizes its [`PrivateKeyShare`]; any `t` verified
//! [`DecryptionShare`]s then suffice to decrypt, via Lagrange
//! interpolation at zero.

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use rand_core::{CryptoRng, RngCore};

use std::{collections::HashSet, fmt};

use crate::{
    bytes::ByteString,
    encryption::{chunks_to_message, Ciphertext, MessageError, MultiCiphertext},
    group::{invert_scalar, normalize_scalar, random_scalar_below, random_scalar_in, Group},
    proofs::{LogEqualityProof, VerificationResult},
};

mod key_set;
mod teller;

pub use self::{
    key_set::{KeySetError, PublicKeySet},
    teller::{DkgError, KeyShareRecord, PrivateKeyShare, Teller},
};

/// Parameters of a threshold scheme: `n` tellers of which any `t` can
/// decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdConfig {
    threshold: usize,
    tellers: usize,
}

impl ThresholdConfig {
    /// Creates a configuration with `threshold` = t and `tellers` = n.
    ///
    /// # Panics
    ///
    /// Panics unless `1 <= t <= n`.
    pub fn new(threshold: usize, tellers: usize) -> Self {
        assert!(
            threshold >= 1 && threshold <= tellers,
            "threshold {threshold} is not in 1..={tellers}"
        );
        Self { threshold, tellers }
    }

    /// Returns the threshold `t`.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the number of tellers `n`.
    pub fn tellers(&self) -> usize {
        self.tellers
    }
}

/// Polynomial over Z_q, stored as its coefficient sequence
/// `a[0] + a[1]·x + … + a[t−1]·x^{t−1}`.
#[derive(Debug, Clone)]
pub(crate) struct Polynomial {
    coefficients: Vec<BigUint>,
}

impl Polynomial {
    /// Samples a random polynomial of the given length with a nonzero
    /// leading coefficient.
    pub fn random<R: CryptoRng + RngCore>(length: usize, order: &BigUint, rng: &mut R) -> Self {
        assert!(length >= 1, "polynomial must have at least one coefficient");
        let mut coefficients: Vec<_> = (0..length - 1)
            .map(|_| random_scalar_below(rng, order))
            .collect();
        coefficients.push(random_scalar_in(rng, 1, order));
        Self { coefficients }
    }

    /// Evaluates the polynomial at `point` modulo `order` (Horner).
    pub fn evaluate(&self, point: u64, order: &BigUint) -> BigUint {
        let point = BigUint::from(point);
        self.coefficients
            .iter()
            .rev()
            .fold(BigUint::zero(), |acc, coefficient| {
                (acc * &point + coefficient) % order
            })
    }

    pub fn coefficients(&self) -> &[BigUint] {
        &self.coefficients
    }
}

/// Lagrange coefficients at zero for the (1-based) interpolation points
/// `indices`: `ℓ_k = Π_{m ≠ k} m · (m − k)⁻¹ mod q`.
pub(crate) fn lagrange_at_zero(indices: &[u64], order: &BigUint) -> Vec<BigUint> {
    indices
        .iter()
        .map(|&k| {
            let mut numerator = BigUint::one();
            let mut denominator = BigUint::one();
            for &m in indices {
                if m == k {
                    continue;
                }
                numerator = numerator * m % order;
                let difference =
                    normalize_scalar(&(BigInt::from(m) - BigInt::from(k)), order);
                denominator = denominator * difference % order;
            }
            numerator * invert_scalar(&denominator, order) % order
        })
        .collect()
}

/// Errors that can occur while combining decryption shares.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CombineError {
    /// Fewer than `t` shares were provided.
    NotEnoughShares {
        /// Threshold `t` of the scheme.
        required: usize,
        /// Number of shares provided.
        actual: usize,
    },
    /// Two shares carry the same teller index.
    DuplicateIndex(usize),
    /// A share index lies outside `[1, n]`.
    IndexOutOfRange(usize),
    /// A multi-ciphertext share does not match the ciphertext width.
    WidthMismatch,
    /// The combined chunks do not form a valid padded message.
    Message(MessageError),
}

impl fmt::Display for CombineError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnoughShares { required, actual } => write!(
                formatter,
                "{actual} decryption share(s) provided, at least {required} required"
            ),
            Self::DuplicateIndex(index) => {
                write!(formatter, "duplicate decryption share for teller {index}")
            }
            Self::IndexOutOfRange(index) => {
                write!(formatter, "share index {index} is out of range")
            }
            Self::WidthMismatch => {
                formatter.write_str("share width does not match the ciphertext width")
            }
            Self::Message(err) => write!(formatter, "cannot decode combined plaintext: {err}"),
        }
    }
}

impl std::error::Error for CombineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Message(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MessageError> for CombineError {
    fn from(err: MessageError) -> Self {
        Self::Message(err)
    }
}

/// Decryption share of a single ciphertext `(α, β)` produced by teller
/// `nr`: the factor `D = α^{y}` and an equality-of-logs proof tying it to
/// the teller's public key share.
pub struct DecryptionShare<G: Group> {
    index: usize,
    factor: G::Element,
    proof: LogEqualityProof<G>,
}

impl<G: Group> Clone for DecryptionShare<G> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            factor: self.factor.clone(),
            proof: self.proof.clone(),
        }
    }
}

impl<G: Group> fmt::Debug for DecryptionShare<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DecryptionShare")
            .field("index", &self.index)
            .field("factor", &self.factor)
            .finish()
    }
}

impl<G: Group> DecryptionShare<G> {
    /// Produces this teller's share of the decryption of `ciphertext`.
    pub fn new<R: CryptoRng + RngCore>(
        ciphertext: &Ciphertext<G>,
        key_share: &PrivateKeyShare<G>,
        rng: &mut R,
    ) -> Self {
        let factor = G::pow(ciphertext.x(), key_share.secret());
        let generator = G::generator();
        let proof = LogEqualityProof::new(
            (&generator, ciphertext.x()),
            key_share.secret(),
            (key_share.commitment(), &factor),
            rng,
        );
        Self {
            index: key_share.index(),
            factor,
            proof,
        }
    }

    /// Returns the producing teller's index (`nr`).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the decryption factor.
    pub fn factor(&self) -> &G::Element {
        &self.factor
    }

    /// Returns the validity proof.
    pub fn proof(&self) -> &LogEqualityProof<G> {
        &self.proof
    }

    /// Assembles a share from its components.
    pub fn from_parts(index: usize, factor: G::Element, proof: LogEqualityProof<G>) -> Self {
        Self {
            index,
            factor,
            proof,
        }
    }

    /// Verifies this share against the producing teller's public key share
    /// `Y_l`.
    pub fn verify(
        &self,
        ciphertext: &Ciphertext<G>,
        share_commitment: &G::Element,
    ) -> VerificationResult {
        let generator = G::generator();
        self.proof.verify(
            (&generator, ciphertext.x()),
            (share_commitment, &self.factor),
        )
    }
}

/// Decryption shares of every component of a multi-ciphertext, produced by
/// one teller.
pub struct MultiDecryptionShare<G: Group> {
    index: usize,
    shares: Vec<DecryptionShare<G>>,
}

impl<G: Group> Clone for MultiDecryptionShare<G> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            shares: self.shares.clone(),
        }
    }
}

impl<G: Group> fmt::Debug for MultiDecryptionShare<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MultiDecryptionShare")
            .field("index", &self.index)
            .field("shares", &self.shares)
            .finish()
    }
}

impl<G: Group> MultiDecryptionShare<G> {
    /// Produces shares for every component of `multi`.
    pub fn new<R: CryptoRng + RngCore>(
        multi: &MultiCiphertext<G>,
        key_share: &PrivateKeyShare<G>,
        rng: &mut R,
    ) -> Self {
        let shares = multi
            .ciphertexts()
            .iter()
            .map(|ciphertext| DecryptionShare::new(ciphertext, key_share, rng))
            .collect();
        Self {
            index: key_share.index(),
            shares,
        }
    }

    /// Returns the producing teller's index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the per-component shares.
    pub fn shares(&self) -> &[DecryptionShare<G>] {
        &self.shares
    }

    /// Verifies every component share, stopping at the first failure.
    pub fn verify(
        &self,
        multi: &MultiCiphertext<G>,
        share_commitment: &G::Element,
    ) -> VerificationResult {
        if self.shares.len() != multi.width() {
            return VerificationResult::failed(
                "share count does not match the ciphertext width",
            );
        }
        for (position, (share, ciphertext)) in
            self.shares.iter().zip(multi.ciphertexts()).enumerate()
        {
            if let VerificationResult::Failed(reason) =
                share.verify(ciphertext, share_commitment)
            {
                return VerificationResult::failed(format!("component {position}: {reason}"));
            }
        }
        VerificationResult::Correct
    }
}

fn check_share_indices(
    config: &ThresholdConfig,
    indices: impl Iterator<Item = usize> + Clone,
) -> Result<(), CombineError> {
    let count = indices.clone().count();
    if count < config.threshold() {
        return Err(CombineError::NotEnoughShares {
            required: config.threshold(),
            actual: count,
        });
    }
    let mut seen = HashSet::new();
    for index in indices {
        if index < 1 || index > config.tellers() {
            return Err(CombineError::IndexOutOfRange(index));
        }
        if !seen.insert(index) {
            return Err(CombineError::DuplicateIndex(index));
        }
    }
    Ok(())
}

/// Combines at least `t` verified decryption shares with distinct indices
/// into the plaintext of `ciphertext`.
///
/// The shares are assumed to be verified; combining unverified shares
/// yields garbage rather than an error.
pub fn combine_shares<G: Group>(
    config: &ThresholdConfig,
    ciphertext: &Ciphertext<G>,
    shares: &[DecryptionShare<G>],
) -> Result<BigUint, CombineError> {
    check_share_indices(config, shares.iter().map(DecryptionShare::index))?;

    let order = G::order();
    let indices: Vec<_> = shares.iter().map(|share| share.index() as u64).collect();
    let coefficients = lagrange_at_zero(&indices, order);

    let combined = shares.iter().zip(&coefficients).fold(
        G::identity(),
        |acc, (share, coefficient)| G::mul(&acc, &G::pow(&share.factor, coefficient)),
    );
    Ok(G::decode(&G::div(ciphertext.y(), &combined)))
}

/// Combines multi-ciphertext shares and decodes the chunked plaintext.
pub fn combine_multi_shares<G: Group>(
    config: &ThresholdConfig,
    multi: &MultiCiphertext<G>,
    shares: &[MultiDecryptionShare<G>],
) -> Result<ByteString, CombineError> {
    if shares.iter().any(|share| share.shares.len() != multi.width()) {
        return Err(CombineError::WidthMismatch);
    }
    check_share_indices(config, shares.iter().map(MultiDecryptionShare::index))?;

    let chunks = multi
        .ciphertexts()
        .iter()
        .enumerate()
        .map(|(position, ciphertext)| {
            let component_shares: Vec<_> = shares
                .iter()
                .map(|share| share.shares[position].clone())
                .collect();
            combine_shares(config, ciphertext, &component_shares)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(chunks_to_message::<G>(&chunks)?)
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;

    #[test]
    fn lagrange_coefficients_interpolate_known_polynomials() {
        // f(x) = 3 + 2x over Z_11: f(1) = 5, f(2) = 7.
        let order = BigUint::from(11_u32);
        let coefficients = lagrange_at_zero(&[1, 2], &order);
        let values = [BigUint::from(5_u32), BigUint::from(7_u32)];
        let secret = values
            .iter()
            .zip(&coefficients)
            .fold(BigUint::zero(), |acc, (value, coefficient)| {
                (acc + value * coefficient) % &order
            });
        assert_eq!(secret, BigUint::from(3_u32));

        // Same polynomial, interpolation points 2 and 3: f(3) = 9.
        let coefficients = lagrange_at_zero(&[2, 3], &order);
        let values = [BigUint::from(7_u32), BigUint::from(9_u32)];
        let secret = values
            .iter()
            .zip(&coefficients)
            .fold(BigUint::zero(), |acc, (value, coefficient)| {
                (acc + value * coefficient) % &order
            });
        assert_eq!(secret, BigUint::from(3_u32));
    }

    #[test]
    fn random_polynomials_have_nonzero_leading_coefficient() {
        let mut rng = thread_rng();
        let order = BigUint::from(11_u32);
        for _ in 0..50 {
            let polynomial = Polynomial::random(3, &order, &mut rng);
            assert_eq!(polynomial.coefficients().len(), 3);
            assert!(!polynomial.coefficients()[2].is_zero());
        }
    }

    #[test]
    fn polynomial_evaluation_is_hornered_correctly() {
        let order = BigUint::from(101_u32);
        let polynomial = Polynomial {
            coefficients: vec![
                BigUint::from(7_u32),
                BigUint::from(3_u32),
                BigUint::from(2_u32),
            ],
        };
        // 7 + 3·4 + 2·16 = 51.
        assert_eq!(polynomial.evaluate(4, &order), BigUint::from(51_u32));
        assert_eq!(polynomial.evaluate(0, &order), BigUint::from(7_u32));
    }

    #[test]
    fn config_accessors() {
        let config = ThresholdConfig::new(2, 5);
        assert_eq!(config.threshold(), 2);
        assert_eq!(config.tellers(), 5);
    }

    #[test]
    #[should_panic(expected = "threshold 3 is not in 1..=2")]
    fn invalid_config_is_rejected() {
        ThresholdConfig::new(3, 2);
    }
}
