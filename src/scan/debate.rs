//! Debate simulator: stages pairwise contests between same-tag records.
//!
//! Tension measures how much a pair disagrees while both still claim to know
//! something; the per-record score folds confidence, evidence, and authority.
//! A close contest (small margin) under real tension marks the pair as a
//! synthesis candidate. Pairs are deduplicated across tags, so two records
//! sharing three tags still debate exactly once per run.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::finding::{Finding, FindingKind};
use crate::lattice::Record;

use super::{ScanContext, clamp01};

/// Tuning for the debate simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateTuning {
    /// Records considered per tag (default: 20).
    pub max_per_tag: usize,
    /// Tension above which the pair is reported (default: 0.5).
    pub tension_gate: f64,
    /// Lower tension bound for synthesis proposals, exclusive (default: 0.3).
    pub proposal_low: f64,
    /// Upper tension bound for synthesis proposals, exclusive (default: 0.8).
    pub proposal_high: f64,
    /// Score margin below which a contest counts as close (default: 0.2).
    pub margin_gate: f64,
    /// Tension weight on confidence disagreement (default: 0.4).
    pub spread_weight: f64,
    /// Tension weight on combined confidence mass (default: 0.3).
    pub mass_weight: f64,
    /// Score weight on confidence (default: 0.3).
    pub confidence_weight: f64,
    /// Score weight on evidence strength (default: 0.4).
    pub evidence_weight: f64,
    /// Evidence strength per item, saturating at 1 (default: 0.2).
    pub evidence_per_item: f64,
    /// Score weight on authority (default: 0.3).
    pub authority_weight: f64,
}

impl Default for DebateTuning {
    fn default() -> Self {
        Self {
            max_per_tag: 20,
            tension_gate: 0.5,
            proposal_low: 0.3,
            proposal_high: 0.8,
            margin_gate: 0.2,
            spread_weight: 0.4,
            mass_weight: 0.3,
            confidence_weight: 0.3,
            evidence_weight: 0.4,
            evidence_per_item: 0.2,
            authority_weight: 0.3,
        }
    }
}

pub fn scan(visible: &[&Record], ctx: &ScanContext<'_>) -> Vec<Finding> {
    let tuning = &ctx.tuning.debate;

    // Tag index in sorted tag order so runs are deterministic.
    let mut by_tag: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for record in visible {
        for tag in &record.tags {
            by_tag.entry(tag.as_str()).or_default().push(record);
        }
    }

    let mut seen_pairs: HashSet<(&str, &str)> = HashSet::new();
    let mut findings = Vec::new();
    for members in by_tag.values() {
        if members.len() < 2 {
            continue;
        }
        let members = &members[..members.len().min(tuning.max_per_tag)];
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let (a, b) = (members[i], members[j]);
                // A record carrying the same tag twice must not debate itself.
                if a.id == b.id {
                    continue;
                }
                let key = if a.id <= b.id {
                    (a.id.as_str(), b.id.as_str())
                } else {
                    (b.id.as_str(), a.id.as_str())
                };
                if !seen_pairs.insert(key) {
                    continue;
                }
                debate_pair(a, b, tuning, ctx, &mut findings);
            }
        }
    }
    findings
}

fn debate_pair(
    a: &Record,
    b: &Record,
    tuning: &DebateTuning,
    ctx: &ScanContext<'_>,
    findings: &mut Vec<Finding>,
) {
    // Findings attach to the lower-sorted id; the payload names both sides.
    let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };

    let conf_a = first.effective_confidence();
    let conf_b = second.effective_confidence();
    let tension = clamp01(
        tuning.spread_weight * (conf_a - conf_b).abs() + tuning.mass_weight * (conf_a + conf_b),
    );
    let score_a = debate_score(first, tuning);
    let score_b = debate_score(second, tuning);
    let margin = (score_a - score_b).abs();
    let synthesis_candidate = margin < tuning.margin_gate && tension > tuning.proposal_low;

    if tension > tuning.tension_gate {
        findings.push(ctx.finding(
            &first.id,
            FindingKind::DebateTension,
            format!(
                "tension {tension:.2} between {} and {} (margin {margin:.2})",
                first.id, second.id
            ),
            json!({
                "record_a": first.id,
                "record_b": second.id,
                "tension": tension,
                "score_a": score_a,
                "score_b": score_b,
                "margin": margin,
            }),
        ));
    }

    if tension > tuning.proposal_low && tension < tuning.proposal_high && synthesis_candidate {
        findings.push(ctx.finding(
            &first.id,
            FindingKind::SynthesisProposal,
            format!(
                "close contest between {} and {}: candidates for synthesis",
                first.id, second.id
            ),
            json!({
                "record_a": first.id,
                "record_b": second.id,
                "tension": tension,
                "margin": margin,
            }),
        ));
    }
}

/// Contest score: weighted confidence, evidence strength, and authority.
fn debate_score(record: &Record, tuning: &DebateTuning) -> f64 {
    let evidence_strength =
        (tuning.evidence_per_item * record.evidence_count() as f64).min(1.0);
    tuning.confidence_weight * record.effective_confidence()
        + tuning.evidence_weight * evidence_strength
        + tuning.authority_weight * record.effective_authority()
}
