use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use evicta::cache::{extract_intent, normalize_prompt, CacheEngine};

const PROMPT_EXACT: &str = "what is ai";
const PROMPT_INTENT: &str = "define ai";
const PROMPT_MISS: &str = "who invented pizza";

fn primed() -> CacheEngine {
    let engine = CacheEngine::new(10);
    engine.record_response(PROMPT_EXACT, "Artificial intelligence.", 3600);
    engine
}

fn bench_decisions(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");

    let engine = primed();
    group.bench_function("exact_hit", |b| {
        b.iter(|| engine.decide(black_box(PROMPT_EXACT)))
    });

    // An intent hit binds the rephrasing, so every iteration gets a fresh engine.
    group.bench_function("intent_hit", |b| {
        b.iter_batched(
            primed,
            |fresh| fresh.decide(black_box(PROMPT_INTENT)),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("miss", |b| {
        b.iter(|| engine.decide(black_box(PROMPT_MISS)))
    });

    group.finish();
}

fn bench_write(c: &mut Criterion) {
    c.bench_function("record_response_at_capacity", |b| {
        let engine = CacheEngine::new(64);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            engine.record_response(black_box(&format!("explain topic {}", i % 1000)), "answer", 3600)
        })
    });
}

fn bench_extraction(c: &mut Criterion) {
    c.bench_function("normalize_and_extract", |b| {
        b.iter(|| {
            let prompt = normalize_prompt(black_box("  What is the Difference between TCP and UDP?  "));
            extract_intent(&prompt)
        })
    });
}

criterion_group!(benches, bench_decisions, bench_write, bench_extraction);
criterion_main!(benches);
