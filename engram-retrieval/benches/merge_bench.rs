//! Merge throughput across source counts and hit volumes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use engram_core::models::*;
use engram_retrieval::merge::merge_hits;

fn hit(id: usize, score: f64) -> RecallHit {
    let id = format!("mem_{id:05}");
    RecallHit {
        layer: HitLayer::Memory,
        id: id.clone(),
        score,
        sources: vec![RecallSourceKind::Vector],
        importance: (id.len() % 100) as u8,
        created_at: id.len() as i64,
        payload: RecallPayload::Memory(Box::new(MemoryRecord {
            memory_id: id,
            memory_space_id: "bench".into(),
            content: "bench content".into(),
            content_type: ContentType::Raw,
            embedding: None,
            user_id: None,
            source: MemorySource::default(),
            conversation_ref: None,
            tags: vec![],
            importance: 50,
            created_at: 0,
            version: 1,
            archived_at: None,
        })),
    }
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_hits");
    for &per_source in &[100usize, 1_000, 5_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(per_source),
            &per_source,
            |b, &n| {
                let sources: Vec<Vec<RecallHit>> = (0..4)
                    .map(|s| (0..n).map(|i| hit((i + s * 7) % n, (i % 97) as f64 / 97.0)).collect())
                    .collect();
                b.iter(|| merge_hits(black_box(sources.clone()), 50));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_merge);
criterion_main!(benches);
