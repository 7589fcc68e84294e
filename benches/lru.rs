use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use memlru::cache::LruCache;
use memlru::config::Thresholds;
use memlru::monitor::EvictionMonitor;

fn filled(n: u64) -> LruCache<u64, u64> {
    let cache = LruCache::with_capacity(n as usize);
    for i in 0..n {
        cache.insert(i, i, 64);
    }
    cache
}

fn bench_lru_put_get(c: &mut Criterion) {
    c.bench_function("lru_put_get", |b| {
        b.iter_batched(
            || filled(1024),
            |cache| {
                for i in 0..1024u64 {
                    cache.insert(std::hint::black_box(i + 10_000), i, 64);
                    let _ = std::hint::black_box(cache.get(&std::hint::black_box(i)));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lru_replace(c: &mut Criterion) {
    c.bench_function("lru_replace", |b| {
        b.iter_batched(
            || filled(1024),
            |cache| {
                for i in 0..1024u64 {
                    let _ = std::hint::black_box(cache.insert(i, i, 128));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_monitor_eviction_pass(c: &mut Criterion) {
    c.bench_function("monitor_eviction_pass", |b| {
        b.iter_batched(
            || {
                let cache = filled(4096);
                let thresholds = Thresholds::new(4096 * 64, 1024 * 64).unwrap();
                EvictionMonitor::with_thresholds(cache, thresholds, Duration::from_secs(10))
            },
            |monitor| {
                let _ = std::hint::black_box(monitor.inspect());
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_lru_put_get,
    bench_lru_replace,
    bench_monitor_eviction_pass
);
criterion_main!(benches);
