//! Key types for ElGamal encryption and related protocols.

use num_bigint::BigUint;
use rand_core::{CryptoRng, RngCore};

use std::fmt;

use crate::group::Group;

/// Secret key: a scalar in `[1, q)`.
pub struct SecretKey<G: Group> {
    pub(crate) scalar: BigUint,
    _group: std::marker::PhantomData<G>,
}

impl<G: Group> fmt::Debug for SecretKey<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SecretKey")
            .field("public", &PublicKey::from(self))
            .finish()
    }
}

impl<G: Group> Clone for SecretKey<G> {
    fn clone(&self) -> Self {
        Self::new(self.scalar.clone())
    }
}

impl<G: Group> SecretKey<G> {
    pub(crate) fn new(scalar: BigUint) -> Self {
        Self {
            scalar,
            _group: std::marker::PhantomData,
        }
    }

    /// Generates a random secret key.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self::new(G::generate_nonzero_scalar(rng))
    }

    /// Creates a key from a scalar, reducing it modulo the group order.
    pub fn from_scalar(scalar: BigUint) -> Self {
        Self::new(scalar % G::order())
    }

    /// Returns the secret scalar. Use with care.
    pub fn expose_scalar(&self) -> &BigUint {
        &self.scalar
    }
}

/// Public key for ElGamal encryption and related protocols.
///
/// Both the canonical bytes (fed into Fiat–Shamir transcripts) and the
/// decoded group element (used in arithmetic) are kept.
pub struct PublicKey<G: Group> {
    pub(crate) bytes: Vec<u8>,
    pub(crate) element: G::Element,
}

impl<G: Group> Clone for PublicKey<G> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            element: self.element.clone(),
        }
    }
}

impl<G: Group> fmt::Debug for PublicKey<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("PublicKey")
            .field(&hex::encode(&self.bytes))
            .finish()
    }
}

impl<G: Group> PartialEq for PublicKey<G> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<G: Group> PublicKey<G> {
    /// Deserializes a public key from canonical bytes. Returns `None` if
    /// the bytes do not represent a valid non-identity group element.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let element = G::deserialize_element(bytes)?;
        Some(Self {
            bytes: bytes.to_vec(),
            element,
        })
    }

    /// Wraps a group element as a public key.
    pub fn from_element(element: G::Element) -> Self {
        Self {
            bytes: G::serialize_element(&element),
            element,
        }
    }

    /// Returns the canonical bytes of this key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the group element of this key.
    pub fn as_element(&self) -> &G::Element {
        &self.element
    }
}

impl<G: Group> From<&SecretKey<G>> for PublicKey<G> {
    fn from(secret_key: &SecretKey<G>) -> Self {
        Self::from_element(G::mul_generator(&secret_key.scalar))
    }
}

/// Keypair consisting of a [`SecretKey`] and the matching [`PublicKey`].
pub struct Keypair<G: Group> {
    secret: SecretKey<G>,
    public: PublicKey<G>,
}

impl<G: Group> fmt::Debug for Keypair<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Keypair")
            .field("public", &self.public)
            .finish()
    }
}

impl<G: Group> Clone for Keypair<G> {
    fn clone(&self) -> Self {
        Self {
            secret: self.secret.clone(),
            public: self.public.clone(),
        }
    }
}

impl<G: Group> Keypair<G> {
    /// Generates a random keypair.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        SecretKey::generate(rng).into()
    }

    /// Returns the public part of this keypair.
    pub fn public(&self) -> &PublicKey<G> {
        &self.public
    }

    /// Returns the secret part of this keypair.
    pub fn secret(&self) -> &SecretKey<G> {
        &self.secret
    }

    /// Splits the keypair into its parts.
    pub fn into_tuple(self) -> (PublicKey<G>, SecretKey<G>) {
        (self.public, self.secret)
    }
}

impl<G: Group> From<SecretKey<G>> for Keypair<G> {
    fn from(secret: SecretKey<G>) -> Self {
        Self {
            public: PublicKey::from(&secret),
            secret,
        }
    }
}

#[cfg(test)]
mod tests {
    use num_traits::Zero;
    use rand::thread_rng;

    use super::*;
    use crate::group::Secp256k1;

    #[test]
    fn public_key_round_trips_through_bytes() {
        let mut rng = thread_rng();
        let keypair = Keypair::<Secp256k1>::generate(&mut rng);
        let restored = PublicKey::<Secp256k1>::from_bytes(keypair.public().as_bytes()).unwrap();
        assert_eq!(restored, *keypair.public());
    }

    #[test]
    fn secret_keys_are_nonzero_and_below_order() {
        let mut rng = thread_rng();
        for _ in 0..10 {
            let secret = SecretKey::<Secp256k1>::generate(&mut rng);
            assert!(!secret.expose_scalar().is_zero());
            assert!(secret.expose_scalar() < Secp256k1::order());
        }
    }

    #[test]
    fn garbage_public_key_bytes_fail() {
        assert!(PublicKey::<Secp256k1>::from_bytes(b"garbage").is_none());
    }
}
