#[macro_use]
extern crate criterion;

use std::time::Duration;

use kvgate::memory::MemoryKvsEngine;
use kvgate::sled::SledKvsEngine;
use kvgate::{Gateway, Key, KvsEngine};
use rand::seq::SliceRandom;
use tempfile::TempDir;

use criterion::{BatchSize, Criterion};

fn keys() -> Vec<Key> {
    (0..1000)
        .map(|i| Key::new(format!("key-{}", i)).unwrap())
        .collect()
}

fn store_and_retrieve<E: KvsEngine>(gateway: &Gateway<E>, keys: &[Key]) {
    for (i, key) in keys.iter().enumerate() {
        gateway.store(key, &format!("value-{}", i));
    }

    let mut shuffled: Vec<&Key> = keys.iter().collect();
    shuffled.shuffle(&mut rand::thread_rng());
    for key in shuffled {
        gateway.retrieve(key);
    }
}

fn gateway_benchmark(c: &mut Criterion) {
    let keys = keys();

    c.bench_function("MemoryKvsEngine", |b| {
        b.iter_batched_ref(
            || Gateway::new(MemoryKvsEngine::new()),
            |gateway| store_and_retrieve(gateway, &keys),
            BatchSize::SmallInput,
        )
    });

    let mut group = c.benchmark_group("sled");
    group.sample_size(10);
    group.bench_function("SledKvsEngine", |b| {
        b.iter_batched_ref(
            || {
                let temp_dir =
                    TempDir::new().expect("unable to create temporary working directory");
                let engine =
                    SledKvsEngine::open(&temp_dir.path().join("db"), "kv", Duration::from_secs(1))
                        .unwrap();
                (temp_dir, Gateway::new(engine))
            },
            |(_temp_dir, gateway)| store_and_retrieve(gateway, &keys),
            BatchSize::PerIteration,
        )
    });
    group.finish();
}

criterion_group!(benches, gateway_benchmark);
criterion_main!(benches);
