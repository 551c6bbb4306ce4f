//! Public key material collected from all tellers.

use num_bigint::BigUint;

use std::fmt;

use crate::{
    group::Group,
    keys::PublicKey,
    sharing::ThresholdConfig,
};

/// Errors creating a [`PublicKeySet`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum KeySetError {
    /// A different number of contributions than `n` was provided.
    WrongContributionCount {
        /// Expected number of contributions.
        expected: usize,
        /// Provided number of contributions.
        actual: usize,
    },
    /// A teller's contribution does not have exactly `t` coefficients.
    MalformedContribution {
        /// 1-based index of the offending teller.
        teller: usize,
    },
    /// A contributed coefficient is not a valid group element.
    InvalidElement {
        /// 1-based index of the offending teller.
        teller: usize,
    },
}

impl fmt::Display for KeySetError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongContributionCount { expected, actual } => write!(
                formatter,
                "expected contributions from {expected} teller(s), got {actual}"
            ),
            Self::MalformedContribution { teller } => write!(
                formatter,
                "contribution from teller {teller} has the wrong number of coefficients"
            ),
            Self::InvalidElement { teller } => write!(
                formatter,
                "contribution from teller {teller} contains an invalid group element"
            ),
        }
    }
}

impl std::error::Error for KeySetError {}

/// Blinded coefficient vectors of all `n` tellers, ordered by teller
/// index.
///
/// From these public values alone anyone can compute the combined
/// encryption key `Y₀ = Π_k A[k,0]` and every teller's public key share
/// `Y_l = Π_k Π_i A[k,i]^{l^i}` — the same value the teller derives
/// privately as `g^{y_l}`.
pub struct PublicKeySet<G: Group> {
    config: ThresholdConfig,
    coefficients: Vec<Vec<G::Element>>,
}

impl<G: Group> Clone for PublicKeySet<G> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            coefficients: self.coefficients.clone(),
        }
    }
}

impl<G: Group> fmt::Debug for PublicKeySet<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PublicKeySet")
            .field("config", &self.config)
            .field("coefficients", &self.coefficients)
            .finish()
    }
}

impl<G: Group> PublicKeySet<G> {
    /// Collects the blinded coefficient vectors of all tellers, ordered by
    /// teller index. Requires exactly `n` contributions of `t` valid
    /// elements each.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending teller on any inconsistency.
    pub fn new(
        config: ThresholdConfig,
        coefficients: Vec<Vec<G::Element>>,
    ) -> Result<Self, KeySetError> {
        if coefficients.len() != config.tellers() {
            return Err(KeySetError::WrongContributionCount {
                expected: config.tellers(),
                actual: coefficients.len(),
            });
        }
        for (position, contribution) in coefficients.iter().enumerate() {
            let teller = position + 1;
            if contribution.len() != config.threshold() {
                return Err(KeySetError::MalformedContribution { teller });
            }
            if contribution
                .iter()
                .any(|element| !G::is_valid_element(element))
            {
                return Err(KeySetError::InvalidElement { teller });
            }
        }
        Ok(Self {
            config,
            coefficients,
        })
    }

    /// Returns the scheme configuration.
    pub fn config(&self) -> ThresholdConfig {
        self.config
    }

    /// Returns the combined public encryption key `Y₀ = Π_k A[k,0]`.
    pub fn shared_key(&self) -> PublicKey<G> {
        let element = self
            .coefficients
            .iter()
            .fold(G::identity(), |acc, contribution| {
                G::mul(&acc, &contribution[0])
            });
        PublicKey::from_element(element)
    }

    /// Returns teller `index`'s public key share
    /// `Y_l = Π_k Π_i A[k,i]^{l^i}` (1-based `index`).
    ///
    /// # Panics
    ///
    /// Panics if `index` is not in `[1, n]`.
    pub fn participant_key(&self, index: usize) -> PublicKey<G> {
        assert!(
            (1..=self.config.tellers()).contains(&index),
            "teller index {index} is not in 1..={}",
            self.config.tellers()
        );
        let order = G::order();
        let point = BigUint::from(index as u64);
        let element = self
            .coefficients
            .iter()
            .fold(G::identity(), |acc, contribution| {
                let mut power = BigUint::from(1_u32);
                let value = contribution.iter().fold(G::identity(), |acc, coefficient| {
                    let term = G::pow(coefficient, &power);
                    power = &power * &point % order;
                    G::mul(&acc, &term)
                });
                G::mul(&acc, &value)
            });
        PublicKey::from_element(element)
    }
}
