//! Per-teller state of the distributed key generation.

use num_bigint::BigUint;
use rand_core::{CryptoRng, RngCore};

use std::{collections::HashSet, fmt};

use crate::{
    group::Group,
    keys::SecretKey,
    proofs::DlogProof,
    sharing::{Polynomial, ThresholdConfig},
};

/// Errors aborting DKG finalization. Wherever possible the error names the
/// misbehaving teller.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DkgError {
    /// A different number of peer records than `n − 1` was provided.
    WrongRecordCount {
        /// Expected number of records.
        expected: usize,
        /// Provided number of records.
        actual: usize,
    },
    /// A record's producer index lies outside `[1, n]`.
    ProducerOutOfRange {
        /// The offending producer index.
        producer: usize,
    },
    /// Two records come from the same producer.
    DuplicateProducer {
        /// The offending producer index.
        producer: usize,
    },
    /// A record claims to come from the finalizing teller itself.
    SelfRecord {
        /// The teller's own index.
        index: usize,
    },
    /// A record's coefficient or proof counts do not match the threshold.
    MalformedRecord {
        /// The offending producer index.
        producer: usize,
    },
    /// A blinded coefficient's discrete-log proof does not verify.
    InvalidCoefficientProof {
        /// The offending producer index.
        producer: usize,
        /// Zero-based coefficient position.
        coefficient: usize,
    },
    /// The secret share does not match the producer's public polynomial.
    ShareMismatch {
        /// The offending producer index.
        producer: usize,
    },
}

impl fmt::Display for DkgError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongRecordCount { expected, actual } => write!(
                formatter,
                "expected {expected} peer record(s), got {actual}"
            ),
            Self::ProducerOutOfRange { producer } => {
                write!(formatter, "teller index {producer} is out of range")
            }
            Self::DuplicateProducer { producer } => {
                write!(formatter, "duplicate record from teller {producer}")
            }
            Self::SelfRecord { index } => {
                write!(formatter, "teller {index} received its own record as a peer record")
            }
            Self::MalformedRecord { producer } => write!(
                formatter,
                "record from teller {producer} has a malformed coefficient or proof count"
            ),
            Self::InvalidCoefficientProof {
                producer,
                coefficient,
            } => write!(
                formatter,
                "teller {producer} provided an invalid proof for coefficient {coefficient}"
            ),
            Self::ShareMismatch { producer } => write!(
                formatter,
                "secret share from teller {producer} does not match its public polynomial"
            ),
        }
    }
}

impl std::error::Error for DkgError {}

/// Record a teller hands to one peer: the producer index, the secret
/// polynomial evaluation for that peer, and the producer's public
/// (blinded) coefficients with their proofs.
pub struct KeyShareRecord<G: Group> {
    producer: usize,
    share: BigUint,
    blinded_coefficients: Vec<G::Element>,
    proofs: Vec<DlogProof<G>>,
}

impl<G: Group> Clone for KeyShareRecord<G> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer,
            share: self.share.clone(),
            blinded_coefficients: self.blinded_coefficients.clone(),
            proofs: self.proofs.clone(),
        }
    }
}

impl<G: Group> fmt::Debug for KeyShareRecord<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("KeyShareRecord")
            .field("producer", &self.producer)
            .field("blinded_coefficients", &self.blinded_coefficients)
            .finish()
    }
}

impl<G: Group> KeyShareRecord<G> {
    /// Returns the producing teller's 1-based index.
    pub fn producer(&self) -> usize {
        self.producer
    }

    /// Returns the secret polynomial evaluation carried by this record.
    pub fn share(&self) -> &BigUint {
        &self.share
    }

    /// Returns the producer's blinded coefficients `A[k,i] = g^{a[k,i]}`.
    pub fn blinded_coefficients(&self) -> &[G::Element] {
        &self.blinded_coefficients
    }

    /// Returns the discrete-log proofs, one per blinded coefficient.
    pub fn proofs(&self) -> &[DlogProof<G>] {
        &self.proofs
    }

    /// Assembles a record from its components (e.g. after
    /// deserialization).
    pub fn from_parts(
        producer: usize,
        share: BigUint,
        blinded_coefficients: Vec<G::Element>,
        proofs: Vec<DlogProof<G>>,
    ) -> Self {
        Self {
            producer,
            share,
            blinded_coefficients,
            proofs,
        }
    }
}

/// Private key share held by one teller after finalization:
/// `(nr, y_l, Y_l = g^{y_l})`.
pub struct PrivateKeyShare<G: Group> {
    index: usize,
    secret: BigUint,
    commitment: G::Element,
}

impl<G: Group> Clone for PrivateKeyShare<G> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            secret: self.secret.clone(),
            commitment: self.commitment.clone(),
        }
    }
}

impl<G: Group> fmt::Debug for PrivateKeyShare<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PrivateKeyShare")
            .field("index", &self.index)
            .field("commitment", &self.commitment)
            .finish()
    }
}

impl<G: Group> PrivateKeyShare<G> {
    /// Returns the holding teller's 1-based index (`nr`).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the secret scalar `y_l`. Use with care.
    pub fn secret(&self) -> &BigUint {
        &self.secret
    }

    /// Returns the public commitment `Y_l = g^{y_l}`.
    pub fn commitment(&self) -> &G::Element {
        &self.commitment
    }

    /// Assembles a share from its components (e.g. after
    /// deserialization).
    pub fn from_parts(index: usize, secret: BigUint, commitment: G::Element) -> Self {
        Self {
            index,
            secret,
            commitment,
        }
    }
}

/// A teller participating in distributed key generation.
///
/// Holds a secret polynomial of length `t` and exposes the blinded
/// coefficients with one [`DlogProof`] each. [`Self::share_with()`]
/// produces the record for one peer; [`Self::finalize()`] consumes the
/// records received from all peers and yields the teller's
/// [`PrivateKeyShare`].
pub struct Teller<G: Group> {
    config: ThresholdConfig,
    index: usize,
    polynomial: Polynomial,
    blinded_coefficients: Vec<G::Element>,
    proofs: Vec<DlogProof<G>>,
}

impl<G: Group> fmt::Debug for Teller<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Teller")
            .field("config", &self.config)
            .field("index", &self.index)
            .field("blinded_coefficients", &self.blinded_coefficients)
            .finish()
    }
}

impl<G: Group> Teller<G> {
    /// Creates teller number `index` (1-based), generating its secret
    /// polynomial and coefficient proofs.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not in `[1, n]`.
    pub fn new<R: CryptoRng + RngCore>(
        config: ThresholdConfig,
        index: usize,
        rng: &mut R,
    ) -> Self {
        assert!(
            (1..=config.tellers()).contains(&index),
            "teller index {index} is not in 1..={}",
            config.tellers()
        );
        let polynomial = Polynomial::random(config.threshold(), G::order(), rng);
        let blinded_coefficients: Vec<_> = polynomial
            .coefficients()
            .iter()
            .map(|coefficient| G::mul_generator(coefficient))
            .collect();
        let proofs = polynomial
            .coefficients()
            .iter()
            .zip(&blinded_coefficients)
            .map(|(coefficient, blinded)| {
                DlogProof::from_secret(&SecretKey::new(coefficient.clone()), blinded, rng)
            })
            .collect();

        Self {
            config,
            index,
            polynomial,
            blinded_coefficients,
            proofs,
        }
    }

    /// Returns the teller's 1-based index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the scheme configuration.
    pub fn config(&self) -> ThresholdConfig {
        self.config
    }

    /// Returns the blinded coefficients `A[k,i] = g^{a[k,i]}`.
    pub fn blinded_coefficients(&self) -> &[G::Element] {
        &self.blinded_coefficients
    }

    /// Returns the discrete-log proofs, one per blinded coefficient.
    pub fn coefficient_proofs(&self) -> &[DlogProof<G>] {
        &self.proofs
    }

    /// Produces the record to send to teller `peer`.
    ///
    /// # Panics
    ///
    /// Panics if `peer` is not in `[1, n]`.
    pub fn share_with(&self, peer: usize) -> KeyShareRecord<G> {
        assert!(
            (1..=self.config.tellers()).contains(&peer),
            "peer index {peer} is not in 1..={}",
            self.config.tellers()
        );
        KeyShareRecord {
            producer: self.index,
            share: self.polynomial.evaluate(peer as u64, G::order()),
            blinded_coefficients: self.blinded_coefficients.clone(),
            proofs: self.proofs.clone(),
        }
    }

    /// Verifies a peer record and returns the first failing check, if any.
    fn verify_record(&self, record: &KeyShareRecord<G>) -> Result<(), DkgError> {
        let threshold = self.config.threshold();
        // Coefficient and proof counts must both match the threshold.
        if record.blinded_coefficients.len() != threshold
            || record.proofs.len() != threshold
            || record.share >= *G::order()
        {
            return Err(DkgError::MalformedRecord {
                producer: record.producer,
            });
        }

        for (position, (coefficient, proof)) in record
            .blinded_coefficients
            .iter()
            .zip(&record.proofs)
            .enumerate()
        {
            if !G::is_valid_element(coefficient) || !proof.verify(coefficient).is_correct() {
                return Err(DkgError::InvalidCoefficientProof {
                    producer: record.producer,
                    coefficient: position,
                });
            }
        }

        // Feldman check: g^{p_k(l)} == Π_i A[k,i]^{l^i}.
        let order = G::order();
        let point = BigUint::from(self.index as u64);
        let mut power = BigUint::from(1_u32);
        let mut expected = G::identity();
        for coefficient in &record.blinded_coefficients {
            expected = G::mul(&expected, &G::pow(coefficient, &power));
            power = power * &point % order;
        }
        if G::mul_generator(&record.share) != expected {
            return Err(DkgError::ShareMismatch {
                producer: record.producer,
            });
        }
        Ok(())
    }

    /// Finalizes key generation from exactly `n − 1` peer records.
    ///
    /// All records are verified; the share is
    /// `y_l = Σ_k p_k(l) mod q` over all tellers including this one, with
    /// public commitment `Y_l = g^{y_l}`.
    ///
    /// # Errors
    ///
    /// Aborts with a [`DkgError`] naming the offending teller on any
    /// inconsistency.
    pub fn finalize(self, records: &[KeyShareRecord<G>]) -> Result<PrivateKeyShare<G>, DkgError> {
        let expected = self.config.tellers() - 1;
        if records.len() != expected {
            return Err(DkgError::WrongRecordCount {
                expected,
                actual: records.len(),
            });
        }

        let mut producers = HashSet::new();
        for record in records {
            if record.producer < 1 || record.producer > self.config.tellers() {
                return Err(DkgError::ProducerOutOfRange {
                    producer: record.producer,
                });
            }
            if record.producer == self.index {
                return Err(DkgError::SelfRecord { index: self.index });
            }
            if !producers.insert(record.producer) {
                return Err(DkgError::DuplicateProducer {
                    producer: record.producer,
                });
            }
            self.verify_record(record)?;
        }

        let order = G::order();
        let own_share = self.polynomial.evaluate(self.index as u64, order);
        let secret = records
            .iter()
            .fold(own_share, |acc, record| (acc + &record.share) % order);
        let commitment = G::mul_generator(&secret);

        Ok(PrivateKeyShare {
            index: self.index,
            secret,
            commitment,
        })
    }
}
