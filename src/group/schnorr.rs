//! Prime-order subgroups of quadratic residues modulo a safe prime.

use num_bigint::{BigInt, BigUint};
use num_traits::One;
use once_cell::sync::Lazy;

use std::marker::PhantomData;

use super::{EncodingError, Group};
use crate::kdf::{to_signed_bytes_be, UniformNumbers};

/// Parameters of a Schnorr group: a safe prime `p = 2q + 1` and a
/// generator of the subgroup of quadratic residues, which has prime
/// order `q`.
pub trait SchnorrParams: Copy + Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Safe prime modulus `p`.
    fn modulus() -> &'static BigUint;
    /// Subgroup order `q = (p − 1) / 2`. Prime.
    fn subgroup_order() -> &'static BigUint;
    /// Generator of the subgroup of quadratic residues.
    fn generator() -> &'static BigUint;
}

/// Subgroup of quadratic residues modulo the safe prime from `P`.
///
/// Elements are integers in `[1, p)` with `a^q ≡ 1 (mod p)`; the group
/// operation is multiplication modulo `p`. Messages in `[0, q)` are
/// encoded by mapping `m + 1` onto whichever of `±(m + 1)` is a quadratic
/// residue.
#[derive(Debug, Clone, Copy)]
pub struct Schnorr<P>(PhantomData<P>);

impl<P: SchnorrParams> Group for Schnorr<P> {
    type Element = BigUint;

    fn order() -> &'static BigUint {
        P::subgroup_order()
    }

    fn identity() -> Self::Element {
        BigUint::one()
    }

    fn generator() -> Self::Element {
        P::generator().clone()
    }

    fn message_upper_bound() -> &'static BigUint {
        P::subgroup_order()
    }

    fn mul(lhs: &Self::Element, rhs: &Self::Element) -> Self::Element {
        (lhs * rhs) % P::modulus()
    }

    fn pow(base: &Self::Element, exponent: &BigUint) -> Self::Element {
        base.modpow(&(exponent % P::subgroup_order()), P::modulus())
    }

    fn invert(element: &Self::Element) -> Self::Element {
        element.modpow(&(P::modulus() - 2_u32), P::modulus())
    }

    fn encode(message: &BigUint) -> Result<Self::Element, EncodingError> {
        if message >= P::subgroup_order() {
            return Err(EncodingError::MessageOutOfRange);
        }
        let candidate = message + 1_u32;
        if candidate.modpow(P::subgroup_order(), P::modulus()).is_one() {
            Ok(candidate)
        } else {
            Ok(P::modulus() - candidate)
        }
    }

    fn decode(element: &Self::Element) -> BigUint {
        if element <= P::subgroup_order() {
            element - 1_u32
        } else {
            P::modulus() - element - 1_u32
        }
    }

    fn serialize_element(element: &Self::Element) -> Vec<u8> {
        to_signed_bytes_be(element)
    }

    fn deserialize_element(bytes: &[u8]) -> Option<Self::Element> {
        let value = BigInt::from_signed_bytes_be(bytes).to_biguint()?;
        Self::is_valid_element(&value).then_some(value)
    }

    fn is_valid_element(element: &Self::Element) -> bool {
        element >= &BigUint::one()
            && element < P::modulus()
            && element.modpow(P::subgroup_order(), P::modulus()).is_one()
    }

    fn elements_from_seed(count: usize, seed: &[u8]) -> Vec<Self::Element> {
        (0..count)
            .map(|index| {
                let mut indexed_seed = seed.to_vec();
                indexed_seed.extend_from_slice(b"ggen");
                indexed_seed.extend_from_slice(&(index as u32).to_be_bytes());

                UniformNumbers::new(P::modulus().clone(), &indexed_seed)
                    .map(|w| (&w * &w) % P::modulus())
                    .find(|candidate| candidate >= &BigUint::from(2_u32))
                    .expect("stream is infinite")
            })
            .collect()
    }
}

macro_rules! schnorr_params {
    (
        $(#[$attr:meta])*
        $params:ident, $group_alias:ident, generator = $gen:expr, modulus = $modulus:expr
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy)]
        pub struct $params;

        impl SchnorrParams for $params {
            fn modulus() -> &'static BigUint {
                static MODULUS: Lazy<BigUint> = Lazy::new(|| {
                    BigUint::parse_bytes($modulus.as_bytes(), 16)
                        .expect("modulus is valid hex")
                });
                &MODULUS
            }

            fn subgroup_order() -> &'static BigUint {
                static ORDER: Lazy<BigUint> =
                    Lazy::new(|| ($params::modulus() - 1_u32) >> 1_u32);
                &ORDER
            }

            fn generator() -> &'static BigUint {
                static GENERATOR: Lazy<BigUint> = Lazy::new(|| BigUint::from($gen as u32));
                &GENERATOR
            }
        }

        $(#[$attr])*
        pub type $group_alias = Schnorr<$params>;
    };
}

schnorr_params!(
    /// 512-bit Schnorr group: the largest 512-bit safe prime with
    /// `p ≡ 7 (mod 8)`, generator `4 = 2²`.
    Params512, Schnorr512, generator = 4, modulus =
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
     FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFC665F"
);

schnorr_params!(
    /// 1536-bit MODP group (RFC 3526, group 5), generator 2.
    Params1536, Schnorr1536, generator = 2, modulus =
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
     020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
     4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
     EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
     98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
     9ED529077096966D670C354E4ABC9804F1746C08CA237327FFFFFFFFFFFFFFFF"
);

schnorr_params!(
    /// 2048-bit MODP group (RFC 3526, group 14), generator 2.
    Params2048, Schnorr2048, generator = 2, modulus =
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
     020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
     4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
     EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
     98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
     9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
     E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
     3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF"
);

schnorr_params!(
    /// 3072-bit MODP group (RFC 3526, group 15), generator 2.
    Params3072, Schnorr3072, generator = 2, modulus =
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
     020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
     4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
     EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
     98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
     9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
     E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
     3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D04507A33\
     A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7\
     ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA06D98A0864\
     D87602733EC86A64521F2B18177B200CBBE117577A615D6C770988C0BAD946E2\
     08E24FA074E5AB3143DB5BFCE0FD108E4B82D120A93AD2CAFFFFFFFFFFFFFFFF"
);
