//! `evicta probe`: behavioral probes against an isolated engine.
//!
//! Each probe starts from an empty cache with a manual clock, so TTL
//! scenarios run instantly and results do not depend on configuration.

use std::sync::Arc;

use anyhow::{bail, Result};

use evicta::cache::{CacheEngine, Decision, HitKind, ManualClock};

struct Probe {
    name: &'static str,
    expectation: &'static str,
    lines: Vec<String>,
    passed: bool,
}

fn engine(max_entries: usize) -> (CacheEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let engine = CacheEngine::builder()
        .max_entries(max_entries)
        .clock(clock.clone())
        .build();
    (engine, clock)
}

fn describe(prompt: &str, decision: &Decision) -> String {
    format!("decide({:?}) -> {}", prompt, decision.kind().as_str())
}

fn probe_equivalence() -> Probe {
    let (engine, _) = engine(10);
    engine.record_response("Hello", "response-hello", 10);
    let mut lines = Vec::new();
    let mut passed = true;
    for variant in ["hello", " HELLO ", "HeLLo", "hello   "] {
        let d = engine.decide(variant);
        passed &= d.kind() == HitKind::Exact;
        lines.push(describe(variant, &d));
    }
    lines.push(format!("entries = {}", engine.len()));
    passed &= engine.len() == 1;
    Probe {
        name: "Case and whitespace variants",
        expectation: "all HIT, one entry",
        lines,
        passed,
    }
}

fn probe_distinction() -> Probe {
    let (engine, _) = engine(10);
    engine.record_response("hello", "response-plain", 10);
    let d = engine.decide("hello?");
    Probe {
        name: "Punctuation is significant",
        expectation: "MISS, one entry",
        passed: d.kind() == HitKind::Miss && engine.len() == 1,
        lines: vec![describe("hello?", &d), format!("entries = {}", engine.len())],
    }
}

fn probe_whitespace() -> Probe {
    let (engine, _) = engine(10);
    engine.record_response("What is AI", "ai-definition", 10);
    let mut lines = Vec::new();
    let mut passed = true;
    for variant in [
        "What  is   AI",
        "What is AI\n",
        "What is\tAI",
        "What is AI\u{00a0}",
        "What is AI\u{200b}",
    ] {
        let d = engine.decide(variant);
        passed &= d.kind() == HitKind::Exact;
        lines.push(describe(variant, &d));
    }
    Probe {
        name: "Unicode whitespace and format characters",
        expectation: "all HIT",
        lines,
        passed,
    }
}

fn probe_ttl() -> Probe {
    let (engine, clock) = engine(10);
    engine.record_response("temp key", "short-lived", 1);
    clock.advance_millis(1100);
    let d = engine.decide(" temp   key ");
    Probe {
        name: "TTL boundary",
        expectation: "MISS after 1.1s, cache empty",
        passed: d.kind() == HitKind::Miss && engine.is_empty(),
        lines: vec![describe(" temp   key ", &d), format!("entries = {}", engine.len())],
    }
}

fn probe_lru() -> Probe {
    let (engine, _) = engine(3);
    engine.record_response("a", "A", 10);
    engine.record_response("b", "B", 10);
    engine.record_response("c", "C", 10);
    engine.decide("A");
    engine.record_response("d", "D", 10);

    let order: Vec<String> = engine.dump_entries()["entries"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e["response"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let passed = order == ["C", "A", "D"];
    Probe {
        name: "LRU eviction at capacity 3",
        expectation: "'b' evicted, order C A D",
        lines: vec![format!("responses, LRU first: {}", order.join(" "))],
        passed,
    }
}

fn probe_intent() -> Probe {
    let (engine, _) = engine(10);
    engine.record_response("difference between tcp and udp", "transport protocols", 60);
    let mut lines = Vec::new();
    let mut passed = true;
    for variant in ["compare udp and tcp", "udp vs tcp"] {
        let d = engine.decide(variant);
        passed &= d.is_hit();
        lines.push(format!("{} (risk {})", describe(variant, &d), d.risk()));
    }
    Probe {
        name: "Intent reuse across phrasings",
        expectation: "first INTENT, then reused",
        lines,
        passed,
    }
}

fn run_probes() -> Vec<Probe> {
    vec![
        probe_equivalence(),
        probe_distinction(),
        probe_whitespace(),
        probe_ttl(),
        probe_lru(),
        probe_intent(),
    ]
}

pub(crate) fn cmd_probe() -> Result<()> {
    let probes = run_probes();
    let mut failed = 0;
    for (i, probe) in probes.iter().enumerate() {
        println!("PROBE {}: {} (expect {})", i + 1, probe.name, probe.expectation);
        for line in &probe.lines {
            println!("  {line}");
        }
        println!("  => {}\n", if probe.passed { "PASS" } else { "FAIL" });
        if !probe.passed {
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{failed} of {} probes failed", probes.len());
    }
    println!("All {} probes passed", probes.len());
    Ok(())
}
