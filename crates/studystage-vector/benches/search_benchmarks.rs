//! Benchmarks for document embedding and similarity search.
//!
//! Uses `MockEmbedding`, so timings cover chunking, averaging and ranking
//! only, not network latency. Set `BENCH_FULL_SCALE=1` to index 10,000
//! documents instead of 1,000:
//!
//! ```bash
//! BENCH_FULL_SCALE=1 cargo bench -p studystage-vector
//! ```

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use studystage_core::types::filename_metadata;
use studystage_vector::{chunk_text, ChunkEmbedder, MockEmbedding, SimilarityIndex};

const CI_DOC_COUNT: usize = 1_000;
const FULL_SCALE_DOC_COUNT: usize = 10_000;

/// Lecture-note style paragraph, made unique by its index.
fn generate_document(index: usize) -> String {
    format!(
        "Support vector machines find the hyperplane that maximises the margin \
         between two classes. Kernels map inputs into higher-dimensional spaces \
         where a linear separator may exist. Regularisation trades margin width \
         against training error through the C parameter. Logistic regression, \
         by contrast, models class probabilities directly and is fitted by \
         maximising the likelihood. Week {} review notes.",
        index
    )
}

fn doc_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_DOC_COUNT
    } else {
        CI_DOC_COUNT
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
}

fn build_populated_index(rt: &tokio::runtime::Runtime, count: usize) -> SimilarityIndex {
    let index = SimilarityIndex::new(ChunkEmbedder::new(MockEmbedding::new()));
    for i in 0..count {
        let text = generate_document(i);
        rt.block_on(index.insert(&text, filename_metadata(&format!("week{}.pdf", i))))
            .expect("insert failed");
    }
    assert_eq!(index.len(), count, "Index should contain all documents");
    index
}

fn bench_chunking(c: &mut Criterion) {
    let text = generate_document(0).repeat(100);
    c.bench_function("chunk_text_1000", |b| {
        b.iter(|| chunk_text(&text, 1000).len());
    });
}

fn bench_embed_long_document(c: &mut Criterion) {
    let rt = runtime();
    let text = generate_document(0).repeat(50);
    let sequential = ChunkEmbedder::new(MockEmbedding::new());
    let concurrent = ChunkEmbedder::new(MockEmbedding::new()).with_concurrency(8);

    let mut group = c.benchmark_group("embed_document");
    group.bench_function("sequential", |b| {
        b.iter(|| rt.block_on(sequential.embed(&text)).expect("embed failed"));
    });
    group.bench_function("concurrency_8", |b| {
        b.iter(|| rt.block_on(concurrent.embed(&text)).expect("embed failed"));
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let rt = runtime();
    let count = doc_count();
    let index = build_populated_index(&rt, count);

    let mut group = c.benchmark_group("similarity_search");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function(format!("top5_{}docs", count), |b| {
        b.iter(|| {
            let hits = rt
                .block_on(index.search("kernel trick and margin maximisation", 5))
                .expect("search failed");
            assert_eq!(hits.len(), 5);
            hits
        });
    });

    group.finish();
}

criterion_group!(benches, bench_chunking, bench_embed_long_document, bench_search);
criterion_main!(benches);
