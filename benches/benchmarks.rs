//! Performance benchmarks comparing the scheme variants

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use exphe::{GroupOrder, KeyParameters, ModulusBase, Scheme, SchemeConfig};

fn benchmark_key_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_generation");
    group.sample_size(10);

    for bits in [256u64, 512].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(bits), bits, |b, &bits| {
            b.iter(|| KeyParameters::generate(bits).expect("Failed to generate parameters"));
        });
    }

    group.finish();
}

fn schemes(params: &KeyParameters) -> Vec<(&'static str, Scheme)> {
    // φ(n) exponent over p·z, no probe validation
    let baseline = SchemeConfig::relaxed()
        .with_group_order(GroupOrder::Euler)
        .with_modulus_base(ModulusBase::Prime);

    vec![
        ("validated", SchemeConfig::validated()),
        ("relaxed", SchemeConfig::relaxed()),
        ("relaxed_euler_prime", baseline),
    ]
    .into_iter()
    .map(|(name, config)| {
        let scheme = Scheme::new(params.clone(), config).expect("Invalid configuration");
        (name, scheme)
    })
    .collect()
}

fn benchmark_encryption(c: &mut Criterion) {
    let mut group = c.benchmark_group("encryption");
    group.sample_size(20);

    let params = KeyParameters::generate(512).expect("Failed to generate parameters");

    for (name, scheme) in schemes(&params) {
        let message = scheme.random_message().expect("Failed to sample message");
        group.bench_function(name, |b| {
            b.iter(|| scheme.encrypt(black_box(&message)).expect("Encryption failed"));
        });
    }

    group.finish();
}

fn benchmark_decryption(c: &mut Criterion) {
    let mut group = c.benchmark_group("decryption");

    let params = KeyParameters::generate(512).expect("Failed to generate parameters");

    for (name, scheme) in schemes(&params) {
        let message = scheme.random_message().expect("Failed to sample message");
        let ciphertext = scheme.encrypt(&message).expect("Encryption failed");
        group.bench_function(name, |b| {
            b.iter(|| scheme.decrypt(black_box(&ciphertext)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_key_generation,
    benchmark_encryption,
    benchmark_decryption
);
criterion_main!(benches);
