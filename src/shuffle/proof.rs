//! Zero-knowledge proof of a correct re-encryption shuffle
//! (Haenni–Locher–Koenig–Dubuis 2017).

use num_bigint::{BigInt, BigUint};
use rand_core::{CryptoRng, RngCore};
use rayon::prelude::*;

use std::fmt;

use crate::{
    commitments::MultiCommitmentKey,
    encryption::MultiCiphertext,
    group::{random_scalar_below, random_scalar_in, Group},
    kdf::Transcript,
    keys::PublicKey,
    proofs::VerificationResult,
    shuffle::{uniform_width, Shuffle, ShuffleError},
};

/// The announcement 6-tuple `t`.
pub(crate) struct Announcement<G: Group> {
    pub(crate) t1: G::Element,
    pub(crate) t2: G::Element,
    pub(crate) t3: G::Element,
    pub(crate) t4x: Vec<G::Element>,
    pub(crate) t4y: Vec<G::Element>,
    pub(crate) t_hat: Vec<G::Element>,
}

impl<G: Group> Clone for Announcement<G> {
    fn clone(&self) -> Self {
        Self {
            t1: self.t1.clone(),
            t2: self.t2.clone(),
            t3: self.t3.clone(),
            t4x: self.t4x.clone(),
            t4y: self.t4y.clone(),
            t_hat: self.t_hat.clone(),
        }
    }
}

/// The response tuple `s`.
#[derive(Debug, Clone)]
pub(crate) struct Responses {
    pub(crate) s1: BigUint,
    pub(crate) s2: BigUint,
    pub(crate) s3: BigUint,
    pub(crate) s4: Vec<BigUint>,
    pub(crate) s_hat: Vec<BigUint>,
    pub(crate) s_prime: Vec<BigUint>,
}

/// Proof that a batch of output multi-ciphertexts is a re-encryption and
/// permutation of a batch of inputs.
///
/// Consists of the permutation commitments `c`, the chain commitments
/// `ĉ`, the announcement 6-tuple `t` and the responses `s`. Verification
/// recomputes the challenge stream and checks the six dual equations of
/// the announcement.
pub struct ShuffleProof<G: Group> {
    pub(crate) permutation_commitments: Vec<G::Element>,
    pub(crate) chain_commitments: Vec<G::Element>,
    pub(crate) announcement: Announcement<G>,
    pub(crate) responses: Responses,
}

impl<G: Group> Clone for ShuffleProof<G> {
    fn clone(&self) -> Self {
        Self {
            permutation_commitments: self.permutation_commitments.clone(),
            chain_commitments: self.chain_commitments.clone(),
            announcement: self.announcement.clone(),
            responses: self.responses.clone(),
        }
    }
}

impl<G: Group> fmt::Debug for ShuffleProof<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ShuffleProof")
            .field("permutation_commitments", &self.permutation_commitments)
            .field("chain_commitments", &self.chain_commitments)
            .finish()
    }
}

/// Multiplies the elements produced by `terms` in any order.
fn product<G: Group, I>(terms: I) -> G::Element
where
    I: IndexedParallelIterator<Item = G::Element>,
{
    terms
        .reduce(G::identity, |lhs, rhs| G::mul(&lhs, &rhs))
}

/// Shared transcript prefix over the public shuffle instance:
/// `(g, pk, h, h₁…h_N, inputs, outputs, c)`.
fn seed_transcript<G: Group>(
    inputs: &[MultiCiphertext<G>],
    outputs: &[MultiCiphertext<G>],
    receiver: &PublicKey<G>,
    commitment_key: &MultiCommitmentKey<G>,
    permutation_commitments: &[G::Element],
) -> Transcript {
    let mut transcript = Transcript::new();
    transcript
        .append_element::<G>(&G::generator())
        .append_element::<G>(receiver.as_element())
        .append_element::<G>(commitment_key.h());
    for generator in &commitment_key.hs()[..inputs.len()] {
        transcript.append_element::<G>(generator);
    }
    for batch in [inputs, outputs] {
        for multi in batch {
            for ciphertext in multi.ciphertexts() {
                transcript
                    .append_element::<G>(ciphertext.x())
                    .append_element::<G>(ciphertext.y());
            }
        }
    }
    for commitment in permutation_commitments {
        transcript.append_element::<G>(commitment);
    }
    transcript
}

/// Derives the per-input challenge vector `u` from branches of the seed
/// transcript.
fn challenge_vector<G: Group>(seed: &Transcript, count: usize) -> Vec<BigUint> {
    (0..count)
        .map(|index| {
            let mut branch = seed.clone();
            branch.append_i32(index as i32 + 1);
            branch.challenge(G::order())
        })
        .collect()
}

/// Derives the final scalar challenge `C` from the seed transcript and the
/// announcement.
fn final_challenge<G: Group>(
    seed: &Transcript,
    chain_commitments: &[G::Element],
    announcement: &Announcement<G>,
) -> BigUint {
    let mut transcript = seed.clone();
    for commitment in chain_commitments {
        transcript.append_element::<G>(commitment);
    }
    transcript
        .append_element::<G>(&announcement.t1)
        .append_element::<G>(&announcement.t2)
        .append_element::<G>(&announcement.t3);
    for (t4x, t4y) in announcement.t4x.iter().zip(&announcement.t4y) {
        transcript
            .append_element::<G>(t4x)
            .append_element::<G>(t4y);
    }
    for t_hat in &announcement.t_hat {
        transcript.append_element::<G>(t_hat);
    }
    transcript.challenge(G::order())
}

impl<G: Group> ShuffleProof<G> {
    /// Proves that `shuffle` is a correct re-encryption shuffle of
    /// `inputs` under `receiver`.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch is malformed or `commitment_key` has
    /// fewer generators than inputs.
    pub fn new<R: CryptoRng + RngCore>(
        inputs: &[MultiCiphertext<G>],
        shuffle: &Shuffle<G>,
        receiver: &PublicKey<G>,
        commitment_key: &MultiCommitmentKey<G>,
        rng: &mut R,
    ) -> Result<Self, ShuffleError> {
        let width = uniform_width(inputs)?;
        let count = inputs.len();
        if commitment_key.size() < count {
            return Err(ShuffleError::CommitmentKeyTooSmall {
                required: count,
                actual: commitment_key.size(),
            });
        }

        let order = G::order();
        let outputs = shuffle.outputs();
        let witness = shuffle.witness();
        let permutation = &witness.permutation;
        let h = commitment_key.h();
        let hs = commitment_key.hs();

        // Permutation commitments c_i = h^{r_i} · h_{π(i)}.
        let commitment_coins: Vec<_> = (0..count)
            .map(|_| random_scalar_below(rng, order))
            .collect();
        let permutation_commitments: Vec<_> = commitment_coins
            .par_iter()
            .enumerate()
            .map(|(index, coin)| G::mul(&G::pow(h, coin), &hs[permutation.apply(index)]))
            .collect();

        // Challenge vector u and its permuted companion u'_i = u_{π⁻¹(i)}.
        let seed = seed_transcript(
            inputs,
            outputs,
            receiver,
            commitment_key,
            &permutation_commitments,
        );
        let challenges = challenge_vector::<G>(&seed, count);
        let permuted_challenges: Vec<_> = (0..count)
            .map(|index| challenges[permutation.invert(index)].clone())
            .collect();

        // Chain commitments ĉ.
        let chain_coins: Vec<_> = (0..count)
            .map(|_| random_scalar_below(rng, order))
            .collect();
        let mut chain_commitments = Vec::with_capacity(count);
        for index in 0..count {
            let previous = if index == 0 {
                &hs[0]
            } else {
                &chain_commitments[index - 1]
            };
            chain_commitments.push(G::mul(
                &G::pow(h, &chain_coins[index]),
                &G::pow(previous, &permuted_challenges[index]),
            ));
        }

        // Witness aggregates.
        let r_bar = commitment_coins
            .iter()
            .fold(BigUint::default(), |acc, coin| (acc + coin) % order);
        let r_tilde = commitment_coins
            .iter()
            .zip(&challenges)
            .fold(BigUint::default(), |acc, (coin, challenge)| {
                (acc + coin * challenge) % order
            });
        let r_star: Vec<_> = (0..width)
            .map(|component| {
                witness
                    .coins
                    .iter()
                    .zip(&challenges)
                    .fold(BigUint::default(), |acc, (coins, challenge)| {
                        (acc + &coins[component] * challenge) % order
                    })
            })
            .collect();
        let r_diamond = {
            let mut sum = BigUint::default();
            let mut cumulative = BigUint::from(1_u32);
            for index in (0..count).rev() {
                sum = (sum + &chain_coins[index] * &cumulative) % order;
                cumulative = cumulative * &permuted_challenges[index] % order;
            }
            sum
        };

        // Announcement.
        let omega1 = random_scalar_in(rng, 2, order);
        let omega2 = random_scalar_in(rng, 2, order);
        let omega3 = random_scalar_in(rng, 2, order);
        let omega4: Vec<_> = (0..width)
            .map(|_| random_scalar_below(rng, order))
            .collect();
        let omega_hat: Vec<_> = (0..count)
            .map(|_| random_scalar_below(rng, order))
            .collect();
        let omega_prime: Vec<_> = (0..count)
            .map(|_| random_scalar_below(rng, order))
            .collect();

        let t1 = G::pow(h, &omega1);
        let t2 = G::pow(h, &omega2);
        let t3 = G::mul(
            &G::pow(h, &omega3),
            &product::<G, _>(
                (0..count)
                    .into_par_iter()
                    .map(|index| G::pow(&hs[index], &omega_prime[index])),
            ),
        );
        let t4x: Vec<_> = (0..width)
            .into_par_iter()
            .map(|component| {
                let blinded = G::invert(&G::mul_generator(&omega4[component]));
                let spread = product::<G, _>((0..count).into_par_iter().map(|index| {
                    G::pow(
                        outputs[index].ciphertexts()[component].x(),
                        &omega_prime[index],
                    )
                }));
                G::mul(&blinded, &spread)
            })
            .collect();
        let t4y: Vec<_> = (0..width)
            .into_par_iter()
            .map(|component| {
                let blinded = G::invert(&G::pow(receiver.as_element(), &omega4[component]));
                let spread = product::<G, _>((0..count).into_par_iter().map(|index| {
                    G::pow(
                        outputs[index].ciphertexts()[component].y(),
                        &omega_prime[index],
                    )
                }));
                G::mul(&blinded, &spread)
            })
            .collect();
        let t_hat: Vec<_> = (0..count)
            .into_par_iter()
            .map(|index| {
                let previous = if index == 0 {
                    &hs[0]
                } else {
                    &chain_commitments[index - 1]
                };
                G::mul(
                    &G::pow(h, &omega_hat[index]),
                    &G::pow(previous, &omega_prime[index]),
                )
            })
            .collect();

        let announcement = Announcement {
            t1,
            t2,
            t3,
            t4x,
            t4y,
            t_hat,
        };
        let challenge = final_challenge::<G>(&seed, &chain_commitments, &announcement);

        // Responses.
        let responses = Responses {
            s1: (&omega1 + &challenge * &r_bar) % order,
            s2: (&omega2 + &challenge * &r_diamond) % order,
            s3: (&omega3 + &challenge * &r_tilde) % order,
            s4: omega4
                .iter()
                .zip(&r_star)
                .map(|(omega, r)| (omega + &challenge * r) % order)
                .collect(),
            s_hat: omega_hat
                .iter()
                .zip(&chain_coins)
                .map(|(omega, coin)| (omega + &challenge * coin) % order)
                .collect(),
            s_prime: omega_prime
                .iter()
                .zip(&permuted_challenges)
                .map(|(omega, u)| (omega + &challenge * u) % order)
                .collect(),
        };

        Ok(Self {
            permutation_commitments,
            chain_commitments,
            announcement,
            responses,
        })
    }

    /// Verifies this proof for the given inputs and outputs.
    ///
    /// Size checks come first; any malformed dimension or failing clause
    /// yields [`VerificationResult::Failed`] naming the clause.
    pub fn verify(
        &self,
        inputs: &[MultiCiphertext<G>],
        outputs: &[MultiCiphertext<G>],
        receiver: &PublicKey<G>,
        commitment_key: &MultiCommitmentKey<G>,
    ) -> VerificationResult {
        let width = match uniform_width(inputs) {
            Ok(width) => width,
            Err(err) => return VerificationResult::failed(format!("inputs: {err}")),
        };
        match uniform_width(outputs) {
            Ok(output_width) if output_width == width => {}
            Ok(_) => return VerificationResult::failed("output width differs from input width"),
            Err(err) => return VerificationResult::failed(format!("outputs: {err}")),
        }
        let count = inputs.len();
        let sizes = VerificationResult::check(
            outputs.len() == count,
            "output count differs from input count",
        )
        .and_expect(
            commitment_key.size() >= count,
            "commitment key is too small for the batch",
        )
        .and_expect(
            self.permutation_commitments.len() == count
                && self.chain_commitments.len() == count
                && self.announcement.t_hat.len() == count
                && self.responses.s_hat.len() == count
                && self.responses.s_prime.len() == count,
            "proof dimensions do not match the batch size",
        )
        .and_expect(
            self.announcement.t4x.len() == width
                && self.announcement.t4y.len() == width
                && self.responses.s4.len() == width,
            "proof dimensions do not match the ciphertext width",
        );
        if !sizes.is_correct() {
            return sizes;
        }

        let order = G::order();
        let h = commitment_key.h();
        let hs = commitment_key.hs();

        // Challenge recomputation.
        let seed = seed_transcript(
            inputs,
            outputs,
            receiver,
            commitment_key,
            &self.permutation_commitments,
        );
        let challenges = challenge_vector::<G>(&seed, count);
        let challenge = final_challenge::<G>(&seed, &self.chain_commitments, &self.announcement);
        let minus_challenge = -BigInt::from(challenge.clone());

        let announcement = &self.announcement;
        let responses = &self.responses;

        // t₁ = c̄^{-C} · h^{s₁} with c̄ = Π cᵢ · (Π hᵢ)^{-1}.
        let commitment_product = product::<G, _>(
            self.permutation_commitments
                .par_iter()
                .map(|commitment| commitment.clone()),
        );
        let generator_product =
            product::<G, _>(hs[..count].par_iter().map(|generator| generator.clone()));
        let c_bar = G::div(&commitment_product, &generator_product);
        let t1_check = G::mul(
            &G::pow_signed(&c_bar, &minus_challenge),
            &G::pow(h, &responses.s1),
        );
        let result = VerificationResult::check(
            t1_check == announcement.t1,
            "permutation commitment aggregate (t1) mismatch",
        );
        if !result.is_correct() {
            return result;
        }

        // t₂ = ĉ^{-C} · h^{s₂} with ĉ = ĉ_{N−1} · h₁^{-Π uᵢ}.
        let challenge_product = challenges
            .iter()
            .fold(BigUint::from(1_u32), |acc, u| acc * u % order);
        let c_hat_agg = G::div(
            &self.chain_commitments[count - 1],
            &G::pow(&hs[0], &challenge_product),
        );
        let t2_check = G::mul(
            &G::pow_signed(&c_hat_agg, &minus_challenge),
            &G::pow(h, &responses.s2),
        );
        let result = VerificationResult::check(
            t2_check == announcement.t2,
            "chain commitment aggregate (t2) mismatch",
        );
        if !result.is_correct() {
            return result;
        }

        // t₃ = c̃^{-C} · h^{s₃} · Π hᵢ^{s'ᵢ} with c̃ = Π cᵢ^{uᵢ}.
        let c_tilde = product::<G, _>(
            self.permutation_commitments
                .par_iter()
                .zip(challenges.par_iter())
                .map(|(commitment, u)| G::pow(commitment, u)),
        );
        let s_prime_spread = product::<G, _>(
            (0..count)
                .into_par_iter()
                .map(|index| G::pow(&hs[index], &responses.s_prime[index])),
        );
        let t3_check = G::mul(
            &G::mul(
                &G::pow_signed(&c_tilde, &minus_challenge),
                &G::pow(h, &responses.s3),
            ),
            &s_prime_spread,
        );
        let result = VerificationResult::check(
            t3_check == announcement.t3,
            "blinded permutation product (t3) mismatch",
        );
        if !result.is_correct() {
            return result;
        }

        // Per component j:
        //   t₄ˣ = a'^{-C} · g^{-s₄} · Π out.x^{s'},
        //   t₄ʸ = a'^{-C} · pk^{-s₄} · Π out.y^{s'}.
        for component in 0..width {
            let minus_s4 = -BigInt::from(responses.s4[component].clone());
            let input_x = product::<G, _>((0..count).into_par_iter().map(|index| {
                G::pow(
                    inputs[index].ciphertexts()[component].x(),
                    &challenges[index],
                )
            }));
            let output_x = product::<G, _>((0..count).into_par_iter().map(|index| {
                G::pow(
                    outputs[index].ciphertexts()[component].x(),
                    &responses.s_prime[index],
                )
            }));
            let t4x_check = G::mul(
                &G::mul(
                    &G::pow_signed(&input_x, &minus_challenge),
                    &G::pow_signed(&G::generator(), &minus_s4),
                ),
                &output_x,
            );
            if t4x_check != announcement.t4x[component] {
                return VerificationResult::failed(format!(
                    "re-encryption aggregate (t4x, component {component}) mismatch"
                ));
            }

            let input_y = product::<G, _>((0..count).into_par_iter().map(|index| {
                G::pow(
                    inputs[index].ciphertexts()[component].y(),
                    &challenges[index],
                )
            }));
            let output_y = product::<G, _>((0..count).into_par_iter().map(|index| {
                G::pow(
                    outputs[index].ciphertexts()[component].y(),
                    &responses.s_prime[index],
                )
            }));
            let t4y_check = G::mul(
                &G::mul(
                    &G::pow_signed(&input_y, &minus_challenge),
                    &G::pow_signed(receiver.as_element(), &minus_s4),
                ),
                &output_y,
            );
            if t4y_check != announcement.t4y[component] {
                return VerificationResult::failed(format!(
                    "re-encryption aggregate (t4y, component {component}) mismatch"
                ));
            }
        }

        // Per position i: t̂ᵢ = ĉᵢ^{-C} · h^{ŝᵢ} · ĉᵢ₋₁^{s'ᵢ}.
        let chain_failure = (0..count).into_par_iter().find_first(|&index| {
            let previous = if index == 0 {
                &hs[0]
            } else {
                &self.chain_commitments[index - 1]
            };
            let check = G::mul(
                &G::mul(
                    &G::pow_signed(&self.chain_commitments[index], &minus_challenge),
                    &G::pow(h, &responses.s_hat[index]),
                ),
                &G::pow(previous, &responses.s_prime[index]),
            );
            check != announcement.t_hat[index]
        });
        if let Some(index) = chain_failure {
            return VerificationResult::failed(format!(
                "chain commitment (tHat, position {index}) mismatch"
            ));
        }

        VerificationResult::Correct
    }

    /// Returns the permutation commitments `c`.
    pub fn permutation_commitments(&self) -> &[G::Element] {
        &self.permutation_commitments
    }

    /// Returns the chain commitments `ĉ`.
    pub fn chain_commitments(&self) -> &[G::Element] {
        &self.chain_commitments
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use rand::thread_rng;

    use super::*;
    use crate::{group::Secp256k1, Keypair};

    type G = Secp256k1;

    fn encrypted_batch(keypair: &Keypair<G>, count: usize, width: usize) -> Vec<MultiCiphertext<G>> {
        let mut rng = thread_rng();
        (0..count)
            .map(|index| {
                let ciphertexts = (0..width)
                    .map(|component| {
                        keypair
                            .public()
                            .encrypt(
                                &BigUint::from((index * width + component + 1) as u32),
                                &mut rng,
                            )
                            .unwrap()
                    })
                    .collect();
                MultiCiphertext::new(ciphertexts)
            })
            .collect()
    }

    #[test]
    fn honest_shuffle_proof_verifies() {
        let mut rng = thread_rng();
        let keypair = Keypair::<G>::generate(&mut rng);
        let inputs = encrypted_batch(&keypair, 4, 2);
        let key = MultiCommitmentKey::<G>::derive(4, b"shuffle-test-key");

        let shuffle = Shuffle::new(&inputs, keypair.public(), &mut rng).unwrap();
        let proof =
            ShuffleProof::new(&inputs, &shuffle, keypair.public(), &key, &mut rng).unwrap();
        proof
            .verify(&inputs, shuffle.outputs(), keypair.public(), &key)
            .expect("honest shuffle verifies");
    }

    #[test]
    fn substituted_output_fails() {
        let mut rng = thread_rng();
        let keypair = Keypair::<G>::generate(&mut rng);
        let inputs = encrypted_batch(&keypair, 4, 2);
        let key = MultiCommitmentKey::<G>::derive(4, b"shuffle-test-key");

        let (mut outputs, proof) =
            crate::shuffle::shuffle_and_prove(&inputs, keypair.public(), &key, &mut rng).unwrap();
        outputs[1] = MultiCiphertext::new(vec![
            keypair
                .public()
                .encrypt(&BigUint::from(999_u32), &mut rng)
                .unwrap(),
            keypair
                .public()
                .encrypt(&BigUint::from(998_u32), &mut rng)
                .unwrap(),
        ]);
        assert!(!proof
            .verify(&inputs, &outputs, keypair.public(), &key)
            .is_correct());
    }

    #[test]
    fn appended_output_fails_the_size_check() {
        let mut rng = thread_rng();
        let keypair = Keypair::<G>::generate(&mut rng);
        let inputs = encrypted_batch(&keypair, 3, 1);
        let key = MultiCommitmentKey::<G>::derive(8, b"shuffle-test-key");

        let (mut outputs, proof) =
            crate::shuffle::shuffle_and_prove(&inputs, keypair.public(), &key, &mut rng).unwrap();
        outputs.push(outputs[0].clone());
        let result = proof.verify(&inputs, &outputs, keypair.public(), &key);
        assert!(!result.is_correct());
    }

    #[test]
    fn reordered_outputs_fail() {
        let mut rng = thread_rng();
        let keypair = Keypair::<G>::generate(&mut rng);
        let inputs = encrypted_batch(&keypair, 4, 1);
        let key = MultiCommitmentKey::<G>::derive(4, b"shuffle-test-key");

        let (mut outputs, proof) =
            crate::shuffle::shuffle_and_prove(&inputs, keypair.public(), &key, &mut rng).unwrap();
        outputs.swap(0, 1);
        assert!(!proof
            .verify(&inputs, &outputs, keypair.public(), &key)
            .is_correct());
    }

    #[test]
    fn wrong_receiver_fails() {
        let mut rng = thread_rng();
        let keypair = Keypair::<G>::generate(&mut rng);
        let other = Keypair::<G>::generate(&mut rng);
        let inputs = encrypted_batch(&keypair, 3, 1);
        let key = MultiCommitmentKey::<G>::derive(3, b"shuffle-test-key");

        let (outputs, proof) =
            crate::shuffle::shuffle_and_prove(&inputs, keypair.public(), &key, &mut rng).unwrap();
        assert!(!proof
            .verify(&inputs, &outputs, other.public(), &key)
            .is_correct());
    }

    #[test]
    fn undersized_commitment_key_is_rejected() {
        let mut rng = thread_rng();
        let keypair = Keypair::<G>::generate(&mut rng);
        let inputs = encrypted_batch(&keypair, 4, 1);
        let key = MultiCommitmentKey::<G>::derive(2, b"shuffle-test-key");

        let shuffle = Shuffle::new(&inputs, keypair.public(), &mut rng).unwrap();
        let result = ShuffleProof::new(&inputs, &shuffle, keypair.public(), &key, &mut rng);
        assert_eq!(
            result.unwrap_err(),
            ShuffleError::CommitmentKeyTooSmall {
                required: 4,
                actual: 2
            }
        );
    }
}
