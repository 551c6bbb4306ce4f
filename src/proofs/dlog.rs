//! Proof of knowledge of a discrete logarithm (Schnorr protocol).

use num_bigint::{BigInt, BigUint};
use rand_core::{CryptoRng, RngCore};

use std::fmt;

use crate::{
    group::Group,
    kdf::Transcript,
    keys::{Keypair, SecretKey},
    proofs::VerificationResult,
};

/// Non-interactive proof of knowledge of `x` with `X = g^x`.
///
/// The proof is the pair `(c, f)`: the Fiat–Shamir challenge and the
/// response `f = a + c·x mod q` for a random announcement `A = g^a`.
/// The default transcript is `g ‖ X ‖ A`; a *custom challenger* may
/// replace it, which turns the proof into a Schnorr-signature-style
/// construction over arbitrary context.
pub struct DlogProof<G: Group> {
    challenge: BigUint,
    response: BigUint,
    _group: std::marker::PhantomData<G>,
}

impl<G: Group> Clone for DlogProof<G> {
    fn clone(&self) -> Self {
        Self {
            challenge: self.challenge.clone(),
            response: self.response.clone(),
            _group: std::marker::PhantomData,
        }
    }
}

impl<G: Group> PartialEq for DlogProof<G> {
    fn eq(&self, other: &Self) -> bool {
        self.challenge == other.challenge && self.response == other.response
    }
}

impl<G: Group> fmt::Debug for DlogProof<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DlogProof")
            .field("challenge", &self.challenge)
            .field("response", &self.response)
            .finish()
    }
}

fn default_challenge<G: Group>(statement: &G::Element, announcement: &G::Element) -> BigUint {
    let mut transcript = Transcript::new();
    transcript
        .append_element::<G>(&G::generator())
        .append_element::<G>(statement)
        .append_element::<G>(announcement);
    transcript.challenge(G::order())
}

impl<G: Group> DlogProof<G> {
    /// Proves knowledge of the secret scalar of `keypair`.
    pub fn new<R: CryptoRng + RngCore>(keypair: &Keypair<G>, rng: &mut R) -> Self {
        Self::from_secret(keypair.secret(), keypair.public().as_element(), rng)
    }

    /// Proves knowledge of `secret` with `statement = g^secret`.
    pub fn from_secret<R: CryptoRng + RngCore>(
        secret: &SecretKey<G>,
        statement: &G::Element,
        rng: &mut R,
    ) -> Self {
        Self::with_challenger(
            secret,
            rng,
            |announcement| default_challenge::<G>(statement, announcement),
        )
    }

    /// Proves knowledge of `secret` deriving the challenge from
    /// `challenger` instead of the default transcript.
    pub fn with_challenger<R: CryptoRng + RngCore>(
        secret: &SecretKey<G>,
        rng: &mut R,
        challenger: impl FnOnce(&G::Element) -> BigUint,
    ) -> Self {
        let order = G::order();
        let blinding = G::generate_scalar(rng);
        let announcement = G::mul_generator(&blinding);
        let challenge = challenger(&announcement) % order;
        let response = (blinding + &challenge * secret.expose_scalar()) % order;
        Self {
            challenge,
            response,
            _group: std::marker::PhantomData,
        }
    }

    /// Verifies this proof against `statement` using the default
    /// transcript.
    pub fn verify(&self, statement: &G::Element) -> VerificationResult {
        self.verify_with_challenger(|announcement| {
            default_challenge::<G>(statement, announcement)
        }, statement)
    }

    /// Verifies this proof, deriving the expected challenge from
    /// `challenger` applied to the reconstructed announcement.
    pub fn verify_with_challenger(
        &self,
        challenger: impl FnOnce(&G::Element) -> BigUint,
        statement: &G::Element,
    ) -> VerificationResult {
        if !G::is_valid_element(statement) {
            return VerificationResult::failed("statement is not a valid group element");
        }
        // A' = g^f · X^{-c}.
        let reconstructed = G::mul(
            &G::mul_generator(&self.response),
            &G::pow_signed(statement, &-BigInt::from(self.challenge.clone())),
        );
        let expected = challenger(&reconstructed) % G::order();
        VerificationResult::check(expected == self.challenge, "dlog challenge mismatch")
    }

    /// Returns the challenge `c`.
    pub fn challenge(&self) -> &BigUint {
        &self.challenge
    }

    /// Returns the response `f`.
    pub fn response(&self) -> &BigUint {
        &self.response
    }

    /// Assembles a proof from its components (e.g. after
    /// deserialization).
    pub fn from_parts(challenge: BigUint, response: BigUint) -> Self {
        Self {
            challenge,
            response,
            _group: std::marker::PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;
    use crate::group::{Schnorr512, Secp256k1};

    fn proof_basics<G: Group>() {
        let mut rng = thread_rng();
        let keypair = Keypair::<G>::generate(&mut rng);
        let proof = DlogProof::new(&keypair, &mut rng);
        proof
            .verify(keypair.public().as_element())
            .expect("honest proof verifies");

        // Tampering with the statement must break the proof.
        let other = Keypair::<G>::generate(&mut rng);
        assert!(!proof.verify(other.public().as_element()).is_correct());

        // Tampering with the response must break the proof.
        let tampered = DlogProof::<G>::from_parts(
            proof.challenge().clone(),
            (proof.response() + 1_u32) % G::order(),
        );
        assert!(!tampered.verify(keypair.public().as_element()).is_correct());
    }

    #[test]
    fn proof_verifies_and_tampering_fails() {
        proof_basics::<Secp256k1>();
        proof_basics::<Schnorr512>();
    }

    #[test]
    fn custom_challenger_binds_context() {
        let mut rng = thread_rng();
        let keypair = Keypair::<Secp256k1>::generate(&mut rng);
        let statement = keypair.public().as_element().clone();

        let challenger_for = |context: &'static str| {
            let statement = statement.clone();
            move |announcement: &<Secp256k1 as Group>::Element| {
                let mut transcript = Transcript::new();
                transcript
                    .append_str(context)
                    .append_element::<Secp256k1>(&statement)
                    .append_element::<Secp256k1>(announcement);
                transcript.challenge(Secp256k1::order())
            }
        };

        let proof =
            DlogProof::with_challenger(keypair.secret(), &mut rng, challenger_for("signing"));
        proof
            .verify_with_challenger(challenger_for("signing"), &statement)
            .expect("challenger contexts match");
        assert!(!proof
            .verify_with_challenger(challenger_for("other"), &statement)
            .is_correct());
    }
}
