//! Benchmarks for scan and normalization operations.

use std::sync::atomic::AtomicU64;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use maat::agent::AgentKind;
use maat::lattice::{self, RawRecord, Record};
use maat::scan::{self, ScanContext, ScanTuning};
use maat::territory::Territory;

const NOW: u64 = 1_700_000_000_000;
const DAY_MS: u64 = 86_400_000;

/// Synthetic lattice with realistic defect rates: ~10% lineage links, a few
/// of them broken, ~5% dangling cross-references.
fn snapshot(n: usize) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(0);
    let domains = ["physics", "politics", "biology", "economics", "logic"];
    let tags = ["network", "flow", "ethics", "hypothesis", "field"];

    (0..n)
        .map(|i| {
            let age_days = rng.gen_range(0..200u64);
            let mut r = Record::new(format!("dtu-{i:05}"), NOW - age_days * DAY_MS);
            r.domain = Some(domains[rng.gen_range(0..domains.len())].to_string());
            r.tags = vec![tags[rng.gen_range(0..tags.len())].to_string()];
            r.authority = Some(rng.gen_range(0.0..1.0));
            r.confidence = Some(rng.gen_range(0.0..1.0));
            if rng.gen_bool(0.1) {
                r.parent_id = Some(format!("dtu-{:05}", rng.gen_range(0..n)));
            }
            if rng.gen_bool(0.02) {
                r.parent_id = Some("ghost".to_string());
            }
            if rng.gen_bool(0.05) {
                r.cross_refs = vec![format!("ghost-{i:05}")];
            }
            r
        })
        .collect()
}

fn scan_bench(c: &mut Criterion, kind: AgentKind, name: &str) {
    let records = snapshot(1_000);
    let tuning = ScanTuning::default();

    c.bench_function(name, |bench| {
        bench.iter(|| {
            let seq = AtomicU64::new(1);
            let ctx = ScanContext::new("bench-0001", kind, NOW, &tuning, &seq);
            black_box(scan::run_scan(&records, &Territory::All, &ctx))
        })
    });
}

fn bench_patrol(c: &mut Criterion) {
    scan_bench(c, AgentKind::Patrol, "patrol_1k");
}

fn bench_integrity(c: &mut Criterion) {
    scan_bench(c, AgentKind::Integrity, "integrity_1k");
}

fn bench_debate(c: &mut Criterion) {
    scan_bench(c, AgentKind::DebateSimulator, "debate_1k");
}

fn bench_synthesis(c: &mut Criterion) {
    scan_bench(c, AgentKind::Synthesis, "synthesis_1k");
}

fn bench_normalize(c: &mut Criterion) {
    let raws: Vec<RawRecord> = (0..5_000)
        .map(|i| {
            serde_json::from_str(&format!(
                r#"{{"id": "dtu-{i:05}", "createdAt": {i}, "crossRefs": ["dtu-00000"]}}"#
            ))
            .unwrap()
        })
        .collect();

    c.bench_function("normalize_5k", |bench| {
        bench.iter(|| black_box(lattice::normalize_snapshot(raws.clone(), NOW)))
    });
}

criterion_group!(
    benches,
    bench_patrol,
    bench_integrity,
    bench_debate,
    bench_synthesis,
    bench_normalize
);
criterion_main!(benches);
