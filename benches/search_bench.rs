//! End-to-end query benchmarks: embed, k-NN search, decode metadata

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ffp_vectors::{
    AnnMethod, FinancialRecord, HashingEmbeddingProvider, IndexSchema, MemoryBackend, Metric,
    SpaceType, StoreContext, StoreSettings, VectorStore,
};

const CLUBS: &[&str] = &[
    "man-city",
    "man-united",
    "arsenal",
    "chelsea",
    "liverpool",
    "tottenham",
    "brighton",
];

fn create_records(n: usize) -> Vec<FinancialRecord> {
    (0..n)
        .map(|i| {
            let club = format!("{}-{}", CLUBS[i % CLUBS.len()], i / CLUBS.len());
            FinancialRecord::new(club, 2000 + (i % 24) as i32, rand::random::<bool>())
                .with_metric(Metric::Revenue, rand::random::<u32>() as i64)
                .with_metric(Metric::Wages, rand::random::<u32>() as i64)
                .with_metric(Metric::Debt, rand::random::<u32>() as i64)
        })
        .collect()
}

fn benchmark_query(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("query");

    for size in [100, 1000, 5000].iter() {
        let dim = 256;
        let context = StoreContext::new(
            Arc::new(HashingEmbeddingProvider::new(dim).unwrap()),
            Arc::new(MemoryBackend::new()),
        );
        let settings = StoreSettings {
            schema: IndexSchema::ffp(dim, SpaceType::CosineSimil, AnnMethod::default()),
            ..StoreSettings::default()
        };
        let store = VectorStore::new(context, settings).unwrap();
        let report = runtime.block_on(store.ingest(&create_records(*size))).unwrap();
        assert!(report.is_complete());

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                runtime
                    .block_on(store.query(black_box("clubs with high debt and wages"), 10))
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_query);
criterion_main!(benches);
