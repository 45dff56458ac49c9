//! HNSW vs brute-force benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ffp_vectors::{AnnIndex, EmbeddingVector, FlatIndex, HnswIndex, HnswParams, SpaceType};

fn create_random_vectors(n: usize, dim: usize) -> Vec<EmbeddingVector> {
    (0..n)
        .map(|_| {
            let data: Vec<f32> = (0..dim).map(|_| rand::random::<f32>() - 0.5).collect();
            EmbeddingVector::new(data)
        })
        .collect()
}

fn benchmark_hnsw_vs_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_vs_flat");
    group.sample_size(20);

    for &size in &[1_000, 10_000] {
        let dim = 128;
        let vectors = create_random_vectors(size, dim);
        let query = create_random_vectors(1, dim).remove(0);

        let mut flat = FlatIndex::new(SpaceType::CosineSimil);
        for (i, v) in vectors.iter().enumerate() {
            flat.add(i, v.clone()).unwrap();
        }

        let params = HnswParams::default();
        let mut hnsw = HnswIndex::with_params(SpaceType::CosineSimil, params);
        for (i, v) in vectors.iter().enumerate() {
            hnsw.add(i, v.clone()).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("flat", size), &size, |b, _| {
            b.iter(|| flat.search(black_box(&query), black_box(10)).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("hnsw", size), &size, |b, _| {
            b.iter(|| hnsw.search(black_box(&query), black_box(10)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_hnsw_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_insert");
    group.sample_size(10);

    // Titan v1 output length
    let dim = 1536;
    let vectors = create_random_vectors(500, dim);

    group.bench_function("insert_500_1536d", |b| {
        b.iter(|| {
            let params = HnswParams::default();
            let mut hnsw = HnswIndex::with_params(SpaceType::CosineSimil, params);
            for (i, v) in vectors.iter().enumerate() {
                hnsw.add(i, v.clone()).unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_hnsw_vs_flat, benchmark_hnsw_insert);
criterion_main!(benches);
