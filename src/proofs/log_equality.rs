//! Proof of equality of discrete logarithms in two bases
//! (Chaum–Pedersen protocol).

use num_bigint::{BigInt, BigUint};
use rand_core::{CryptoRng, RngCore};

use std::fmt;

use crate::{group::Group, kdf::Transcript, proofs::VerificationResult};

/// Non-interactive proof of knowledge of `x` with `X = gX^x` and
/// `Y = gY^x` for public bases `(gX, gY)`.
///
/// Represented as `(c, f)`; verification reconstructs both announcements
/// `A' = gX^f · X^{-c}` and `B' = gY^f · Y^{-c}` and re-derives the
/// challenge over the transcript `gX ‖ gY ‖ X ‖ Y ‖ A ‖ B`.
pub struct LogEqualityProof<G: Group> {
    challenge: BigUint,
    response: BigUint,
    _group: std::marker::PhantomData<G>,
}

impl<G: Group> Clone for LogEqualityProof<G> {
    fn clone(&self) -> Self {
        Self {
            challenge: self.challenge.clone(),
            response: self.response.clone(),
            _group: std::marker::PhantomData,
        }
    }
}

impl<G: Group> PartialEq for LogEqualityProof<G> {
    fn eq(&self, other: &Self) -> bool {
        self.challenge == other.challenge && self.response == other.response
    }
}

impl<G: Group> fmt::Debug for LogEqualityProof<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LogEqualityProof")
            .field("challenge", &self.challenge)
            .field("response", &self.response)
            .finish()
    }
}

fn challenge<G: Group>(
    bases: (&G::Element, &G::Element),
    powers: (&G::Element, &G::Element),
    announcements: (&G::Element, &G::Element),
) -> BigUint {
    let mut transcript = Transcript::new();
    transcript
        .append_element::<G>(bases.0)
        .append_element::<G>(bases.1)
        .append_element::<G>(powers.0)
        .append_element::<G>(powers.1)
        .append_element::<G>(announcements.0)
        .append_element::<G>(announcements.1);
    transcript.challenge(G::order())
}

impl<G: Group> LogEqualityProof<G> {
    /// Proves that `powers == (bases.0^secret, bases.1^secret)`.
    ///
    /// The relation itself is not checked; a proof for mismatched inputs
    /// simply will not verify.
    pub fn new<R: CryptoRng + RngCore>(
        bases: (&G::Element, &G::Element),
        secret: &BigUint,
        powers: (&G::Element, &G::Element),
        rng: &mut R,
    ) -> Self {
        let order = G::order();
        let blinding = G::generate_scalar(rng);
        let announcements = (G::pow(bases.0, &blinding), G::pow(bases.1, &blinding));
        let challenge =
            challenge::<G>(bases, powers, (&announcements.0, &announcements.1));
        let response = (blinding + &challenge * secret) % order;
        Self {
            challenge,
            response,
            _group: std::marker::PhantomData,
        }
    }

    /// Verifies this proof for the given bases and powers.
    pub fn verify(
        &self,
        bases: (&G::Element, &G::Element),
        powers: (&G::Element, &G::Element),
    ) -> VerificationResult {
        if !G::is_valid_element(powers.0) || !G::is_valid_element(powers.1) {
            return VerificationResult::failed("power is not a valid group element");
        }
        let minus_challenge = -BigInt::from(self.challenge.clone());
        let reconstructed = (
            G::mul(
                &G::pow(bases.0, &self.response),
                &G::pow_signed(powers.0, &minus_challenge),
            ),
            G::mul(
                &G::pow(bases.1, &self.response),
                &G::pow_signed(powers.1, &minus_challenge),
            ),
        );
        let expected = challenge::<G>(bases, powers, (&reconstructed.0, &reconstructed.1));
        VerificationResult::check(
            expected == self.challenge,
            "log-equality challenge mismatch",
        )
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
