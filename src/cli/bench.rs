//! `evicta bench`: quick in-process timings. `cargo bench` has the
//! statistically sound version.

use std::time::{Duration, Instant};

use anyhow::Result;

use evicta::cache::CacheEngine;
use evicta::config::Config;

const PROMPT_EXACT: &str = "what is ai";
const PROMPT_INTENT: &str = "define ai";
const PROMPT_MISS: &str = "who invented pizza";

pub(crate) fn cmd_bench(config: &Config, runs: u32) -> Result<()> {
    let runs = runs.max(1);
    let primed = || {
        let engine = CacheEngine::builder()
            .config(&config.cache, &config.intent)
            .build();
        engine.record_response(PROMPT_EXACT, "Artificial intelligence.", 3600);
        engine
    };

    println!("\n--- Evicta Benchmarks ({runs} runs) ---");

    let engine = primed();
    report("Exact cache hit", runs, time_each(runs, || {}, |_| {
        engine.decide(PROMPT_EXACT);
    }));

    // An intent hit binds the rephrasing, so each run needs a fresh engine.
    report("Intent cache hit", runs, time_each(runs, primed, |fresh| {
        fresh.decide(PROMPT_INTENT);
    }));

    report("Cache miss", runs, time_each(runs, || {}, |_| {
        engine.decide(PROMPT_MISS);
    }));
    Ok(())
}

/// Run `setup` untimed before each timed `op`.
fn time_each<S, T, F>(runs: u32, mut setup: S, mut op: F) -> Duration
where
    S: FnMut() -> T,
    F: FnMut(T),
{
    let mut total = Duration::ZERO;
    for _ in 0..runs {
        let input = setup();
        let start = Instant::now();
        op(input);
        total += start.elapsed();
    }
    total
}

fn report(name: &str, runs: u32, total: Duration) {
    let avg_us = total.as_secs_f64() / f64::from(runs) * 1e6;
    println!("{name:<25}: {avg_us:.2} µs");
}
