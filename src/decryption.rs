//! Verifiable ElGamal decryption.

use num_bigint::BigUint;
use rand_core::{CryptoRng, RngCore};

use std::fmt;

use crate::{
    encryption::Ciphertext,
    group::Group,
    keys::{Keypair, PublicKey},
    proofs::{LogEqualityProof, VerificationResult},
};

/// Decryption factor `D = α^sk` for a ciphertext `(α, β)` together with a
/// proof that the same secret underlies the public key and the factor:
/// an equality-of-logs proof for bases `(g, α)` and statement `(pk, D)`.
///
/// Anyone holding the factor can finish the decryption as
/// `decode(β · D⁻¹)` and check it against a claimed plaintext.
pub struct VerifiableDecryption<G: Group> {
    factor: G::Element,
    proof: LogEqualityProof<G>,
}

impl<G: Group> Clone for VerifiableDecryption<G> {
    fn clone(&self) -> Self {
        Self {
            factor: self.factor.clone(),
            proof: self.proof.clone(),
        }
    }
}

impl<G: Group> fmt::Debug for VerifiableDecryption<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("VerifiableDecryption")
            .field("factor", &self.factor)
            .field("proof", &self.proof)
            .finish()
    }
}

impl<G: Group> VerifiableDecryption<G> {
    /// Decrypts `ciphertext` with the secret key of `keypair`, producing
    /// the decryption factor and its validity proof.
    pub fn new<R: CryptoRng + RngCore>(
        ciphertext: &Ciphertext<G>,
        keypair: &Keypair<G>,
        rng: &mut R,
    ) -> Self {
        let secret = keypair.secret().expose_scalar();
        let factor = G::pow(ciphertext.x(), secret);
        let generator = G::generator();
        let proof = LogEqualityProof::new(
            (&generator, ciphertext.x()),
            secret,
            (keypair.public().as_element(), &factor),
            rng,
        );
        Self { factor, proof }
    }

    /// Verifies the decryption factor against the ciphertext and the
    /// decrypter's public key.
    pub fn verify(
        &self,
        ciphertext: &Ciphertext<G>,
        decrypter: &PublicKey<G>,
    ) -> VerificationResult {
        let generator = G::generator();
        self.proof.verify(
            (&generator, ciphertext.x()),
            (decrypter.as_element(), &self.factor),
        )
    }

    /// Verifies the decryption factor and additionally checks that the
    /// ciphertext decrypts to `claimed`.
    pub fn verify_with_plaintext(
        &self,
        ciphertext: &Ciphertext<G>,
        decrypter: &PublicKey<G>,
        claimed: &BigUint,
    ) -> VerificationResult {
        self.verify(ciphertext, decrypter).and_expect(
            &self.plaintext(ciphertext) == claimed,
            "decrypted plaintext does not match the claim",
        )
    }

    /// Finishes the decryption: `decode(β · D⁻¹)`.
    pub fn plaintext(&self, ciphertext: &Ciphertext<G>) -> BigUint {
        G::decode(&G::div(ciphertext.y(), &self.factor))
    }

    /// Returns the decryption factor.
    pub fn factor(&self) -> &G::Element {
        &self.factor
    }

    /// Returns the validity proof.
    pub fn proof(&self) -> &LogEqualityProof<G> {
        &self.proof
    }

    /// Assembles a verifiable decryption from its components.
    pub fn from_parts(factor: G::Element, proof: LogEqualityProof<G>) -> Self {
        Self { factor, proof }
    }
}
