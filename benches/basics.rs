use criterion::{criterion_group, criterion_main, BatchSize, Bencher, Criterion};
use num_bigint::BigUint;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use ballot_crypto::{
    group::{Group, Schnorr2048, Secp256k1},
    Ciphertext, DlogProof, Keypair,
};

fn bench_encrypt<G: Group>(b: &mut Bencher<'_>) {
    let mut rng = ChaChaRng::from_seed([5; 32]);
    let keypair: Keypair<G> = Keypair::generate(&mut rng);
    let message = BigUint::from(123_456_u32);
    b.iter(|| keypair.public().encrypt(&message, &mut rng).unwrap());
}

fn bench_decrypt<G: Group>(b: &mut Bencher<'_>) {
    let mut rng = ChaChaRng::from_seed([5; 32]);
    let keypair: Keypair<G> = Keypair::generate(&mut rng);
    let message = BigUint::from(123_456_u32);
    b.iter_batched(
        || keypair.public().encrypt(&message, &mut rng).unwrap(),
        |encrypted: Ciphertext<G>| keypair.secret().decrypt(&encrypted),
        BatchSize::SmallInput,
    );
}

fn bench_dlog_prove<G: Group>(b: &mut Bencher<'_>) {
    let mut rng = ChaChaRng::from_seed([5; 32]);
    let keypair: Keypair<G> = Keypair::generate(&mut rng);
    b.iter(|| DlogProof::new(&keypair, &mut rng));
}

fn bench_dlog_verify<G: Group>(b: &mut Bencher<'_>) {
    let mut rng = ChaChaRng::from_seed([5; 32]);
    let keypair: Keypair<G> = Keypair::generate(&mut rng);
    let proof = DlogProof::new(&keypair, &mut rng);
    b.iter(|| proof.verify(keypair.public().as_element()));
}

fn bench_basics(criterion: &mut Criterion) {
    criterion
        .benchmark_group("secp256k1")
        .bench_function("encrypt", bench_encrypt::<Secp256k1>)
        .bench_function("decrypt", bench_decrypt::<Secp256k1>)
        .bench_function("dlog_prove", bench_dlog_prove::<Secp256k1>)
        .bench_function("dlog_verify", bench_dlog_verify::<Secp256k1>);
    criterion
        .benchmark_group("schnorr2048")
        .bench_function("encrypt", bench_encrypt::<Schnorr2048>)
        .bench_function("decrypt", bench_decrypt::<Schnorr2048>)
        .bench_function("dlog_prove", bench_dlog_prove::<Schnorr2048>)
        .bench_function("dlog_verify", bench_dlog_verify::<Schnorr2048>);
}

criterion_group!(benches, bench_basics);
criterion_main!(benches);
