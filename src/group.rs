//! Prime-order group framework for ElGamal encryption and the protocols
//! built on top of it.
//!
//! A [`Group`] is a pure capability set: order, identity, generator,
//! multiplication, exponentiation, inversion, integer encoding, canonical
//! byte serialization, validity checking and reproducible derivation of
//! independent generators. Every higher component of this crate is generic
//! over it. Two instantiations are provided:
//!
//! - [`Schnorr`] groups: the prime-order subgroup of quadratic residues
//!   modulo a safe prime, with predefined parameter sets at 512, 1536,
//!   2048 and 3072 bits;
//! - [`Secp256k1`]: the eponymous elliptic curve with Koblitz message
//!   encoding.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::Zero;
use rand_core::{CryptoRng, RngCore};

use std::fmt;

mod schnorr;
mod secp256k1;

pub use self::{
    schnorr::{Schnorr, Schnorr1536, Schnorr2048, Schnorr3072, Schnorr512, SchnorrParams},
    secp256k1::Secp256k1,
};

/// Errors that can occur when mapping integers to group elements.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EncodingError {
    /// The message is not in `[0, message_upper_bound)`.
    MessageOutOfRange,
    /// No group element encodes the message (the Koblitz candidate search
    /// was exhausted).
    NoEncodableElement,
}

impl fmt::Display for EncodingError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageOutOfRange => {
                formatter.write_str("message is outside the encodable range of the group")
            }
            Self::NoEncodableElement => formatter.write_str("no group element encodes the message"),
        }
    }
}

impl std::error::Error for EncodingError {}

/// Cyclic group of prime order `q` with a fixed generator.
///
/// Scalars are [`BigUint`] values; all exponents are reduced modulo `q`
/// before use, and negative exponents (carried as [`BigInt`]) are
/// normalized into `[0, q)`.
pub trait Group: Copy + Clone + fmt::Debug + 'static {
    /// Group element. Equality is structural algebraic equality.
    type Element: Clone + PartialEq + fmt::Debug + Send + Sync;

    /// Order `q` of the group. Prime.
    fn order() -> &'static BigUint;

    /// Neutral element of the group.
    fn identity() -> Self::Element;

    /// Agreed-upon generator of the group.
    fn generator() -> Self::Element;

    /// Exclusive upper bound of the integer range [`Self::encode()`]
    /// accepts. At most `q`.
    fn message_upper_bound() -> &'static BigUint;

    /// Multiplies two group elements.
    fn mul(lhs: &Self::Element, rhs: &Self::Element) -> Self::Element;

    /// Raises `base` to `exponent`. The exponent is reduced modulo
    /// [`Self::order()`] before use.
    fn pow(base: &Self::Element, exponent: &BigUint) -> Self::Element;

    /// Inverts a group element.
    fn invert(element: &Self::Element) -> Self::Element;

    /// Encodes a message in `[0, message_upper_bound)` as a group element.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is out of range or (for curve
    /// groups) no encodable element exists.
    fn encode(message: &BigUint) -> Result<Self::Element, EncodingError>;

    /// Decodes an element produced by [`Self::encode()`]. Left inverse of
    /// encoding: `decode(encode(m)) == m` for all admissible `m`.
    fn decode(element: &Self::Element) -> BigUint;

    /// Canonical byte serialization of an element.
    fn serialize_element(element: &Self::Element) -> Vec<u8>;

    /// Parses an element from its canonical bytes, validating it.
    /// Returns `None` for bytes that do not represent a valid element.
    fn deserialize_element(bytes: &[u8]) -> Option<Self::Element>;

    /// Checks whether `element` is a valid member of the group for use in
    /// protocols. Elements received over the wire must pass this check
    /// before use.
    fn is_valid_element(element: &Self::Element) -> bool;

    /// Derives `count` pseudo-random, independent group elements from
    /// `seed`, reproducibly.
    fn elements_from_seed(count: usize, seed: &[u8]) -> Vec<Self::Element>;

    /// Raises `base` to a possibly negative exponent, normalized modulo
    /// [`Self::order()`].
    fn pow_signed(base: &Self::Element, exponent: &BigInt) -> Self::Element {
        Self::pow(base, &normalize_scalar(exponent, Self::order()))
    }

    /// Multiplies `lhs` by the inverse of `rhs`.
    fn div(lhs: &Self::Element, rhs: &Self::Element) -> Self::Element {
        Self::mul(lhs, &Self::invert(rhs))
    }

    /// Raises the group generator to `exponent`.
    fn mul_generator(exponent: &BigUint) -> Self::Element {
        Self::pow(&Self::generator(), exponent)
    }

    /// Samples a scalar uniformly in `[0, q)`.
    fn generate_scalar<R: CryptoRng + RngCore>(rng: &mut R) -> BigUint {
        random_scalar_below(rng, Self::order())
    }

    /// Samples a scalar uniformly in `[1, q)`.
    fn generate_nonzero_scalar<R: CryptoRng + RngCore>(rng: &mut R) -> BigUint {
        random_scalar_in(rng, 1, Self::order())
    }
}

/// Samples an integer uniformly in `[0, bound)` by rejection.
///
/// # Panics
///
/// Panics if `bound` is zero.
pub fn random_scalar_below<R: CryptoRng + RngCore>(rng: &mut R, bound: &BigUint) -> BigUint {
    assert!(!bound.is_zero(), "bound must be positive");
    let bits = bound.bits();
    let byte_len = ((bits + 7) / 8) as usize;
    let excess_bits = (byte_len as u64 * 8 - bits) as u32;

    let mut buffer = vec![0_u8; byte_len];
    loop {
        rng.fill_bytes(&mut buffer);
        if excess_bits > 0 {
            buffer[0] &= 0xff >> excess_bits;
        }
        let candidate = BigUint::from_bytes_be(&buffer);
        if &candidate < bound {
            return candidate;
        }
    }
}

/// Samples an integer uniformly in `[low, bound)`.
///
/// # Panics
///
/// Panics if `low >= bound`.
pub fn random_scalar_in<R: CryptoRng + RngCore>(rng: &mut R, low: u32, bound: &BigUint) -> BigUint {
    let low = BigUint::from(low);
    assert!(low < *bound, "empty sampling range");
    random_scalar_below(rng, &(bound - &low)) + low
}

/// Inverts `value` modulo the prime `modulus` via Fermat's little theorem.
///
/// The caller must ensure `value` is nonzero modulo `modulus`.
pub(crate) fn invert_scalar(value: &BigUint, modulus: &BigUint) -> BigUint {
    debug_assert!(!(value % modulus).is_zero(), "cannot invert zero");
    value.modpow(&(modulus - 2_u32), modulus)
}

/// Normalizes a possibly negative scalar into `[0, modulus)`.
pub(crate) fn normalize_scalar(value: &BigInt, modulus: &BigUint) -> BigUint {
    let modulus = BigInt::from(modulus.clone());
    value.mod_floor(&modulus).to_biguint().unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod law_tests {
    //! Law tests instantiated by each group implementation.

    use num_traits::One;
    use rand::thread_rng;

    use super::*;

    pub fn group_laws<G: Group>() {
        let mut rng = thread_rng();
        let one = BigUint::one();
        let q = G::order();

        for _ in 0..5 {
            let a = G::mul_generator(&G::generate_scalar(&mut rng));
            let b = G::mul_generator(&G::generate_scalar(&mut rng));
            let c = G::mul_generator(&G::generate_scalar(&mut rng));

            assert_eq!(G::mul(&a, &b), G::mul(&b, &a));
            assert_eq!(G::mul(&G::mul(&a, &b), &c), G::mul(&a, &G::mul(&b, &c)));
            assert_eq!(G::mul(&G::identity(), &a), a);
            assert_eq!(G::mul(&a, &G::invert(&a)), G::identity());

            let x = G::generate_scalar(&mut rng);
            let y = G::generate_scalar(&mut rng);
            assert_eq!(G::pow(&G::pow(&a, &x), &y), G::pow(&a, &(&x * &y)));
            assert_eq!(
                G::pow(&a, &(&x + &y)),
                G::mul(&G::pow(&a, &x), &G::pow(&a, &y))
            );
            assert_eq!(
                G::pow_signed(&a, &-BigInt::from(x.clone())),
                G::invert(&G::pow(&a, &x))
            );
        }

        assert_eq!(G::pow(&G::generator(), q), G::identity());
        assert_eq!(
            G::pow(&G::generator(), &(q - &one)),
            G::invert(&G::generator())
        );
    }

    pub fn encode_decode_round_trip<G: Group>() {
        let mut rng = thread_rng();
        for _ in 0..10 {
            let message = random_scalar_below(&mut rng, G::message_upper_bound());
            let element = G::encode(&message).unwrap();
            assert!(G::is_valid_element(&element));
            assert_eq!(G::decode(&element), message);
        }
        let zero = BigUint::default();
        assert_eq!(G::decode(&G::encode(&zero).unwrap()), zero);
        let max = G::message_upper_bound() - 1_u32;
        assert_eq!(G::decode(&G::encode(&max).unwrap()), max);
        assert_eq!(
            G::encode(G::message_upper_bound()),
            Err(EncodingError::MessageOutOfRange)
        );
    }

    pub fn serialization_round_trip<G: Group>() {
        let mut rng = thread_rng();
        for _ in 0..10 {
            let element = G::mul_generator(&G::generate_nonzero_scalar(&mut rng));
            let bytes = G::serialize_element(&element);
            let restored = G::deserialize_element(&bytes).expect("canonical bytes round-trip");
            assert_eq!(restored, element);
        }
        assert!(G::deserialize_element(b"definitely not an element").is_none());
    }

    pub fn seeded_elements_are_reproducible<G: Group>() {
        let elements = G::elements_from_seed(3, b"seed");
        assert_eq!(elements, G::elements_from_seed(3, b"seed"));
        assert_ne!(elements, G::elements_from_seed(3, b"other-seed"));
        for element in &elements {
            assert!(G::is_valid_element(element));
        }
        // Deriving fewer elements yields a prefix of the longer derivation.
        assert_eq!(elements[..2], G::elements_from_seed(2, b"seed")[..]);
    }
}
