//! Test CPU benchmarks
//!
//! - Single-genome gestation test across accounting methods
//! - Cached vs uncached lookups
//! - Lineage depth scaling

use std::sync::Arc;

use avida_common::{Environment, Genome, ResourceDef};
use avida_resources::{AccountingMethod, ResourceHistory};
use avida_testcpu::{TestCpu, TestCpuConfig, TestResultCache, TestSettings};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const REPLICATOR: &str = "\
collect 0 30
io a
nand b a a
io b
h-copy
if-n-copied
jump -2
divide
";

fn tester() -> TestCpu {
    let env = Environment::logic_nine()
        .with_resource(ResourceDef::new("glucose", 1000.0).with_flow(5.0, 0.01));
    let mut history = ResourceHistory::new();
    for update in 0..100 {
        history
            .record(update, vec![1000.0 - update as f64].into())
            .unwrap();
    }
    TestCpu::new(TestCpuConfig::default(), env)
        .unwrap()
        .with_history(Arc::new(history))
}

// ============ GESTATION BENCHMARKS ============

fn bench_test_genome(c: &mut Criterion) {
    let mut group = c.benchmark_group("test_genome");
    let cpu = tester();
    let genome: Genome = REPLICATOR.parse().unwrap();

    for method in [
        AccountingMethod::Fresh,
        AccountingMethod::Historical,
        AccountingMethod::Exact,
    ] {
        let settings = TestSettings::default().at_update(method, 50, 0);
        group.bench_with_input(
            BenchmarkId::new("method", method),
            &settings,
            |b, settings| b.iter(|| cpu.test_genome(black_box(&genome), settings).unwrap()),
        );
    }

    group.finish();
}

fn bench_depth_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("depth");
    let cpu = tester();
    let genome: Genome = REPLICATOR.parse().unwrap();

    for depth in [1usize, 3, 8] {
        let settings = TestSettings::default().with_generations(depth);
        group.bench_with_input(BenchmarkId::new("generations", depth), &settings, |b, s| {
            b.iter(|| cpu.test_genome(black_box(&genome), s).unwrap())
        });
    }

    group.finish();
}

// ============ CACHE BENCHMARKS ============

fn bench_cache(c: &mut Criterion) {
    let cpu = tester();
    let cache = TestResultCache::new();
    let genome: Genome = REPLICATOR.parse().unwrap();
    let settings = TestSettings::default();
    cache.get_or_test(&cpu, &genome, &settings).unwrap();

    c.bench_function("cache_hit", |b| {
        b.iter(|| cache.get_or_test(&cpu, black_box(&genome), &settings).unwrap())
    });
}

criterion_group!(benches, bench_test_genome, bench_depth_scaling, bench_cache);
criterion_main!(benches);
