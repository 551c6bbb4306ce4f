//! End-to-end threshold key generation and decryption.

use num_bigint::BigUint;
use rand::thread_rng;

use ballot_crypto::{
    group::{Group, Schnorr512, Secp256k1},
    sharing::{
        combine_multi_shares, combine_shares, CombineError, DecryptionShare, KeyShareRecord,
        MultiDecryptionShare, PrivateKeyShare, PublicKeySet, Teller, ThresholdConfig,
    },
    PublicKey,
};

/// Runs a full DKG and returns the finalized shares plus the public key
/// set built from the tellers' broadcasts.
fn run_dkg<G: Group>(config: ThresholdConfig) -> (Vec<PrivateKeyShare<G>>, PublicKeySet<G>) {
    let mut rng = thread_rng();
    let tellers: Vec<_> = (1..=config.tellers())
        .map(|nr| Teller::<G>::new(config, nr, &mut rng))
        .collect();

    let key_set = PublicKeySet::new(
        config,
        tellers
            .iter()
            .map(|teller| teller.blinded_coefficients().to_vec())
            .collect(),
    )
    .expect("honest contributions are accepted");

    let records: Vec<Vec<KeyShareRecord<G>>> = (1..=config.tellers())
        .map(|receiver| {
            tellers
                .iter()
                .filter(|teller| teller.index() != receiver)
                .map(|teller| teller.share_with(receiver))
                .collect()
        })
        .collect();

    let shares = tellers
        .into_iter()
        .zip(records)
        .map(|(teller, records)| teller.finalize(&records).expect("honest DKG succeeds"))
        .collect();
    (shares, key_set)
}

fn threshold_decryption_end_to_end<G: Group>() {
    let mut rng = thread_rng();
    let config = ThresholdConfig::new(2, 3);
    let (shares, key_set) = run_dkg::<G>(config);
    let election_key: PublicKey<G> = key_set.shared_key();

    // Public key shares recomputed from the broadcasts match the private
    // commitments.
    for share in &shares {
        assert_eq!(
            key_set.participant_key(share.index()).as_element(),
            share.commitment()
        );
    }

    let message = BigUint::from(271_828_u32);
    let ciphertext = election_key.encrypt(&message, &mut rng).unwrap();

    // Any two verified shares decrypt; use tellers 1 and 3.
    let decryption_shares: Vec<_> = [&shares[0], &shares[2]]
        .iter()
        .map(|share| {
            let decryption_share = DecryptionShare::new(&ciphertext, share, &mut rng);
            decryption_share
                .verify(
                    &ciphertext,
                    key_set.participant_key(share.index()).as_element(),
                )
                .expect("honest share verifies");
            decryption_share
        })
        .collect();

    let plaintext = combine_shares(&config, &ciphertext, &decryption_shares).unwrap();
    assert_eq!(plaintext, message);
}

#[test]
fn threshold_decryption_on_secp256k1() {
    threshold_decryption_end_to_end::<Secp256k1>();
}

#[test]
fn threshold_decryption_on_schnorr() {
    threshold_decryption_end_to_end::<Schnorr512>();
}

#[test]
fn chunked_message_survives_threshold_decryption() {
    let mut rng = thread_rng();
    type G = Secp256k1;
    let config = ThresholdConfig::new(3, 4);
    let (shares, key_set) = run_dkg::<G>(config);
    let election_key = key_set.shared_key();

    let ballot = b"threshold-decrypted ballot payload that spans several chunks \
                   of the Koblitz encoding";
    let encrypted = election_key.encrypt_message(ballot, &mut rng).unwrap();

    let multi_shares: Vec<_> = shares[..3]
        .iter()
        .map(|share| {
            let multi_share = MultiDecryptionShare::new(&encrypted, share, &mut rng);
            multi_share
                .verify(
                    &encrypted,
                    key_set.participant_key(share.index()).as_element(),
                )
                .expect("honest multi-share verifies");
            multi_share
        })
        .collect();

    let decrypted = combine_multi_shares(&config, &encrypted, &multi_shares).unwrap();
    assert_eq!(decrypted.as_slice(), ballot);
}

#[test]
fn too_few_or_duplicate_shares_are_rejected() {
    let mut rng = thread_rng();
    type G = Secp256k1;
    let config = ThresholdConfig::new(2, 3);
    let (shares, key_set) = run_dkg::<G>(config);

    let ciphertext = key_set
        .shared_key()
        .encrypt(&BigUint::from(9_u32), &mut rng)
        .unwrap();
    let share = DecryptionShare::new(&ciphertext, &shares[0], &mut rng);

    assert_eq!(
        combine_shares(&config, &ciphertext, &[share.clone()]).unwrap_err(),
        CombineError::NotEnoughShares {
            required: 2,
            actual: 1
        }
    );
    assert_eq!(
        combine_shares(&config, &ciphertext, &[share.clone(), share]).unwrap_err(),
        CombineError::DuplicateIndex(1)
    );
}

#[test]
fn tampered_decryption_share_does_not_verify() {
    let mut rng = thread_rng();
    type G = Secp256k1;
    let config = ThresholdConfig::new(2, 2);
    let (shares, key_set) = run_dkg::<G>(config);

    let ciphertext = key_set
        .shared_key()
        .encrypt(&BigUint::from(64_u32), &mut rng)
        .unwrap();
    let share = DecryptionShare::new(&ciphertext, &shares[0], &mut rng);

    // Verifying against the wrong teller's key share fails.
    assert!(!share
        .verify(&ciphertext, key_set.participant_key(2).as_element())
        .is_correct());

    // A substituted factor fails against the right key share.
    let forged = DecryptionShare::from_parts(
        share.index(),
        G::mul_generator(&BigUint::from(17_u32)),
        share.proof().clone(),
    );
    assert!(!forged
        .verify(&ciphertext, key_set.participant_key(1).as_element())
        .is_correct());
}

#[test]
fn any_threshold_subset_recovers_the_plaintext() {
    let mut rng = thread_rng();
    type G = Secp256k1;
    let config = ThresholdConfig::new(2, 4);
    let (shares, key_set) = run_dkg::<G>(config);

    let message = BigUint::from(1_000_003_u32);
    let ciphertext = key_set.shared_key().encrypt(&message, &mut rng).unwrap();

    let all_shares: Vec<_> = shares
        .iter()
        .map(|share| DecryptionShare::new(&ciphertext, share, &mut rng))
        .collect();

    for (first, second) in [(0, 1), (0, 3), (1, 2), (2, 3)] {
        let subset = [all_shares[first].clone(), all_shares[second].clone()];
        assert_eq!(
            combine_shares(&config, &ciphertext, &subset).unwrap(),
            message
        );
    }
    // Oversized subsets work too.
    assert_eq!(
        combine_shares(&config, &ciphertext, &all_shares).unwrap(),
        message
    );
}
