//! Integrity scan: deep structural checks.
//!
//! Walks lineage chains through the full-snapshot map, verifies every
//! cross-reference, and compares each record's declared authority against an
//! evidence-and-context model of what it ought to be.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::finding::{Finding, FindingKind};
use crate::lattice::{Record, RecordIndex};

use super::{ScanContext, clamp01};

/// Tuning for the integrity scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityTuning {
    /// Maximum lineage hops to walk per record; also bounds cycles (default: 10).
    pub max_lineage_hops: usize,
    /// Allowed gap between declared and expected authority (default: 0.3).
    pub drift_tolerance: f64,
    /// Expected-authority bonus per evidence item (default: 0.05).
    pub evidence_bonus_per_item: f64,
    /// Cap on the evidence bonus (default: 0.2).
    pub evidence_bonus_cap: f64,
    /// Expected-authority bonus per valid cross-reference (default: 0.03).
    pub ref_bonus_per_item: f64,
    /// Cap on the cross-reference bonus (default: 0.15).
    pub ref_bonus_cap: f64,
    /// Weight of declared coherence above/below the midpoint (default: 0.15).
    pub coherence_weight: f64,
    /// Age in days past which the first penalty applies (default: 60).
    pub age_penalty_days: f64,
    /// First age penalty (default: 0.05).
    pub age_penalty: f64,
    /// Age in days past which the second penalty also applies (default: 180).
    pub deep_age_penalty_days: f64,
    /// Second age penalty (default: 0.1).
    pub deep_age_penalty: f64,
}

impl Default for IntegrityTuning {
    fn default() -> Self {
        Self {
            max_lineage_hops: 10,
            drift_tolerance: 0.3,
            evidence_bonus_per_item: 0.05,
            evidence_bonus_cap: 0.2,
            ref_bonus_per_item: 0.03,
            ref_bonus_cap: 0.15,
            coherence_weight: 0.15,
            age_penalty_days: 60.0,
            age_penalty: 0.05,
            deep_age_penalty_days: 180.0,
            deep_age_penalty: 0.1,
        }
    }
}

pub fn scan(visible: &[&Record], index: &RecordIndex<'_>, ctx: &ScanContext<'_>) -> Vec<Finding> {
    let tuning = &ctx.tuning.integrity;
    let mut findings = Vec::new();
    for record in visible {
        check_lineage_chain(record, index, tuning, ctx, &mut findings);
        check_cross_refs(record, index, ctx, &mut findings);
        check_authority_drift(record, index, tuning, ctx, &mut findings);
    }
    findings
}

/// Follow the parent chain until it ends, breaks, or hits the hop cap.
/// Only the first break is reported per record.
fn check_lineage_chain(
    record: &Record,
    index: &RecordIndex<'_>,
    tuning: &IntegrityTuning,
    ctx: &ScanContext<'_>,
    findings: &mut Vec<Finding>,
) {
    let mut current = record;
    let mut depth = 0usize;
    while depth < tuning.max_lineage_hops {
        let Some(parent_id) = &current.parent_id else {
            return;
        };
        depth += 1;
        match index.get(parent_id) {
            Some(parent) => current = parent,
            None => {
                findings.push(ctx.finding(
                    &record.id,
                    FindingKind::LineageChainBroken,
                    format!("lineage chain breaks at {parent_id} (depth {depth})"),
                    json!({ "missing_id": parent_id, "depth": depth }),
                ));
                return;
            }
        }
    }
}

/// One finding per dangling cross-reference, carrying the missing id so the
/// repair engine knows exactly which entry to drop.
fn check_cross_refs(
    record: &Record,
    index: &RecordIndex<'_>,
    ctx: &ScanContext<'_>,
    findings: &mut Vec<Finding>,
) {
    for missing in record.cross_refs.iter().filter(|id| !index.contains(id)) {
        findings.push(ctx.finding(
            &record.id,
            FindingKind::BrokenCrossReference,
            format!("cross-reference {missing} is missing from the lattice"),
            json!({ "missing_ref": missing }),
        ));
    }
}

fn check_authority_drift(
    record: &Record,
    index: &RecordIndex<'_>,
    tuning: &IntegrityTuning,
    ctx: &ScanContext<'_>,
    findings: &mut Vec<Finding>,
) {
    let expected = expected_authority(record, index, tuning, ctx.now_ms);
    let declared = record.effective_authority();
    if (declared - expected).abs() > tuning.drift_tolerance {
        findings.push(ctx.finding(
            &record.id,
            FindingKind::AuthorityDrift,
            format!("declared authority {declared:.2} vs expected {expected:.2}"),
            json!({ "declared": declared, "expected": expected }),
        ));
    }
}

/// Evidence-and-context model of what a record's authority ought to be.
///
/// Starts at the 0.5 midpoint, earns capped bonuses for evidence and valid
/// cross-references, shifts with declared coherence, and pays age penalties
/// at 60 and 180 days. Clamped to `[0, 1]`.
pub fn expected_authority(
    record: &Record,
    index: &RecordIndex<'_>,
    tuning: &IntegrityTuning,
    now_ms: u64,
) -> f64 {
    let mut expected = 0.5;

    expected += (tuning.evidence_bonus_per_item * record.evidence_count() as f64)
        .min(tuning.evidence_bonus_cap);

    let valid_refs = record.cross_refs.iter().filter(|id| index.contains(id)).count();
    expected += (tuning.ref_bonus_per_item * valid_refs as f64).min(tuning.ref_bonus_cap);

    if let Some(coherence) = record.coherence {
        expected += tuning.coherence_weight * (coherence - 0.5);
    }

    let age = record.age_days(now_ms);
    if age > tuning.age_penalty_days {
        expected -= tuning.age_penalty;
    }
    if age > tuning.deep_age_penalty_days {
        expected -= tuning.deep_age_penalty;
    }

    clamp01(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::lattice::MS_PER_DAY;
    use crate::scan::ScanTuning;
    use std::sync::atomic::AtomicU64;

    const NOW: u64 = 1_700_000_000_000;

    fn days_ago(days: f64) -> u64 {
        NOW - (days * MS_PER_DAY) as u64
    }

    fn run(records: &[Record]) -> Vec<Finding> {
        let tuning = ScanTuning::default();
        let seq = AtomicU64::new(1);
        let ctx = ScanContext::new("integrity-0001", AgentKind::Integrity, NOW, &tuning, &seq);
        let refs: Vec<&Record> = records.iter().collect();
        let index = RecordIndex::build(records);
        scan(&refs, &index, &ctx)
    }

    fn chain(len: usize) -> Vec<Record> {
        // c0 -> c1 -> ... -> c{len-1}, each fresh and authority-neutral.
        (0..len)
            .map(|i| {
                let mut r = Record::new(format!("c{i}"), NOW);
                if i + 1 < len {
                    r.parent_id = Some(format!("c{}", i + 1));
                }
                r
            })
            .collect()
    }

    #[test]
    fn intact_chain_is_silent() {
        assert!(run(&chain(5)).is_empty());
    }

    #[test]
    fn first_break_is_reported_with_depth() {
        let mut records = chain(3);
        // c2 points into the void.
        records[2].parent_id = Some("void".into());
        let findings = run(&records);

        // Every record in the chain walks into the same break at its own depth.
        let breaks: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.kind == FindingKind::LineageChainBroken)
            .collect();
        assert_eq!(breaks.len(), 3);
        let c0 = breaks.iter().find(|f| f.record_id == "c0").unwrap();
        assert_eq!(c0.data["missing_id"], "void");
        assert_eq!(c0.data["depth"], 3);
        let c2 = breaks.iter().find(|f| f.record_id == "c2").unwrap();
        assert_eq!(c2.data["depth"], 1);
    }

    #[test]
    fn hop_cap_bounds_the_walk() {
        // c0 -> ... -> c11 -> void: the break sits 12 hops from c0, past the
        // default cap of 10, but within reach of records later in the chain.
        let mut records = chain(12);
        records[11].parent_id = Some("void".into());
        let findings = run(&records);

        let broken_for = |id: &str| {
            findings
                .iter()
                .any(|f| f.kind == FindingKind::LineageChainBroken && f.record_id == id)
        };
        assert!(!broken_for("c0"));
        assert!(!broken_for("c1"));
        assert!(broken_for("c2"));
        assert!(broken_for("c11"));
    }

    #[test]
    fn lineage_cycles_terminate() {
        let mut a = Record::new("a", NOW);
        a.parent_id = Some("b".into());
        let mut b = Record::new("b", NOW);
        b.parent_id = Some("a".into());
        // The walk spins around the cycle until the hop cap and reports nothing.
        assert!(run(&[a, b]).is_empty());
    }

    #[test]
    fn each_dangling_cross_ref_is_its_own_finding() {
        let present = Record::new("present", NOW);
        let mut record = Record::new("a", NOW);
        record.cross_refs = vec!["present".into(), "gone-1".into(), "gone-2".into()];

        let findings = run(&[present, record]);
        let broken: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.kind == FindingKind::BrokenCrossReference)
            .collect();
        assert_eq!(broken.len(), 2);
        assert!(broken.iter().all(|f| f.record_id == "a" && f.auto_repair));
        assert_eq!(broken[0].data["missing_ref"], "gone-1");
        assert_eq!(broken[1].data["missing_ref"], "gone-2");
    }

    #[test]
    fn expected_authority_composes_bonuses_and_penalties() {
        let tuning = IntegrityTuning::default();
        let anchor_a = Record::new("x", NOW);
        let anchor_b = Record::new("y", NOW);

        let mut record = Record::new("a", NOW);
        record.evidence = vec![serde_json::json!(1), serde_json::json!(2)];
        record.cross_refs = vec!["x".into(), "y".into(), "gone".into()];
        record.coherence = Some(0.7);
        let records = vec![anchor_a, anchor_b, record];
        let index = RecordIndex::build(&records);

        // 0.5 + 0.1 (evidence) + 0.06 (2 valid refs) + 0.15 * 0.2 (coherence)
        let expected = expected_authority(&records[2], &index, &tuning, NOW);
        assert!((expected - 0.69).abs() < 1e-9);
    }

    #[test]
    fn expected_authority_caps_and_clamps() {
        let tuning = IntegrityTuning::default();
        let mut record = Record::new("a", NOW);
        record.evidence = (0..50).map(|i| serde_json::json!(i)).collect();
        record.coherence = Some(1.0);
        let records = vec![record];
        let index = RecordIndex::build(&records);

        // Evidence bonus saturates at 0.2 despite 50 items.
        let expected = expected_authority(&records[0], &index, &tuning, NOW);
        assert!((expected - (0.5 + 0.2 + 0.075)).abs() < 1e-9);

        let mut old = Record::new("b", days_ago(200.0));
        old.coherence = Some(0.0);
        let records = vec![old];
        let index = RecordIndex::build(&records);
        // 0.5 - 0.075 - 0.05 - 0.1, still within [0, 1].
        let expected = expected_authority(&records[0], &index, &tuning, NOW);
        assert!((expected - 0.275).abs() < 1e-9);
    }

    #[test]
    fn authority_drift_past_tolerance_is_flagged() {
        let mut record = Record::new("a", days_ago(200.0));
        record.authority = Some(0.95);
        let findings = run(std::slice::from_ref(&record));

        let drift = findings
            .iter()
            .find(|f| f.kind == FindingKind::AuthorityDrift)
            .unwrap();
        // Expected: 0.5 - 0.05 - 0.1 = 0.35; declared 0.95 drifts by 0.6.
        assert_eq!(drift.data["declared"], 0.95);
        assert!((drift.data["expected"].as_f64().unwrap() - 0.35).abs() < 1e-9);
    }

    #[test]
    fn drift_within_tolerance_is_silent() {
        let mut record = Record::new("a", NOW);
        record.authority = Some(0.7);
        // Expected 0.5, |0.7 - 0.5| = 0.2 <= 0.3.
        assert!(run(&[record]).is_empty());
    }
}
