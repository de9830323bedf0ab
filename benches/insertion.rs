use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use starktrie::{Felt, MemoryStorage, Pedersen, Trie};

fn random_felt(rng: &mut StdRng) -> Felt {
    // keep the top byte clear so the value stays below the field modulus
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes[1..]);
    Felt::from_bytes_be(&bytes)
}

fn bench_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("trie insertion");

    group.bench_function("100 random keys", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(0);
            let mut trie = Trie::<MemoryStorage, Pedersen>::in_memory(251);
            for _ in 0..100 {
                let key = random_felt(&mut rng);
                let value = random_felt(&mut rng);
                trie.put(&key, &value).unwrap();
            }
        })
    });

    group.bench_function("insert then delete 100 random keys", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(0);
            let mut trie = Trie::<MemoryStorage, Pedersen>::in_memory(251);
            let keys: Vec<Felt> = (0..100).map(|_| random_felt(&mut rng)).collect();
            for key in &keys {
                let value = random_felt(&mut rng);
                trie.put(key, &value).unwrap();
            }
            for key in &keys {
                trie.put(key, &Felt::ZERO).unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_insertion);
criterion_main!(benches);
