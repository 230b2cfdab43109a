//! Hypothesis tester: calibrates hypothesis confidence against evidence.
//!
//! Only records marked as hypotheses (by kind or tag) are considered. The
//! recommended confidence grows with evidence strength from a floor of 0.3;
//! declared confidence far from the recommendation yields a promote or demote
//! suggestion rather than a mutation.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::finding::{Finding, FindingKind};
use crate::lattice::Record;

use super::{ScanContext, clamp01};

/// Tuning for the hypothesis tester.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesisTuning {
    /// Confidence above which an evidence-free hypothesis is unsupported (default: 0.7).
    pub high_confidence: f64,
    /// Age in days past which an evidence-free hypothesis can go stale (default: 14).
    pub stale_age_days: f64,
    /// Confidence below which a stale hypothesis is flagged (default: 0.5).
    pub low_confidence: f64,
    /// Evidence strength earned per evidence item, saturating at 1 (default: 0.2).
    pub evidence_strength_per_item: f64,
    /// Recommended confidence with zero evidence (default: 0.3).
    pub recommended_floor: f64,
    /// Recommended confidence span from zero to full evidence (default: 0.5).
    pub recommended_span: f64,
    /// Gap between declared and recommended confidence that triggers a
    /// promote/demote suggestion (default: 0.25).
    pub adjustment_gap: f64,
}

impl Default for HypothesisTuning {
    fn default() -> Self {
        Self {
            high_confidence: 0.7,
            stale_age_days: 14.0,
            low_confidence: 0.5,
            evidence_strength_per_item: 0.2,
            recommended_floor: 0.3,
            recommended_span: 0.5,
            adjustment_gap: 0.25,
        }
    }
}

pub fn scan(visible: &[&Record], ctx: &ScanContext<'_>) -> Vec<Finding> {
    let tuning = &ctx.tuning.hypothesis;
    let mut findings = Vec::new();
    for record in visible.iter().filter(|r| is_hypothesis(r)) {
        test_hypothesis(record, tuning, ctx, &mut findings);
    }
    findings
}

fn is_hypothesis(record: &Record) -> bool {
    record.kind.as_deref() == Some("hypothesis") || record.has_tag("hypothesis")
}

fn test_hypothesis(
    record: &Record,
    tuning: &HypothesisTuning,
    ctx: &ScanContext<'_>,
    findings: &mut Vec<Finding>,
) {
    let confidence = record.effective_confidence();
    let evidence_count = record.evidence_count();
    let age_days = record.age_days(ctx.now_ms);

    if confidence > tuning.high_confidence && evidence_count == 0 {
        findings.push(ctx.finding(
            &record.id,
            FindingKind::UnsupportedHypothesis,
            format!("confidence {confidence:.2} with no supporting evidence"),
            json!({ "confidence": confidence, "evidence_count": 0 }),
        ));
    }

    if age_days > tuning.stale_age_days
        && evidence_count == 0
        && confidence < tuning.low_confidence
    {
        findings.push(ctx.finding(
            &record.id,
            FindingKind::StaleHypothesis,
            format!("{age_days:.1} days old, no evidence, confidence {confidence:.2}"),
            json!({ "age_days": age_days, "confidence": confidence }),
        ));
    }

    let evidence_strength =
        (tuning.evidence_strength_per_item * evidence_count as f64).min(1.0);
    let recommended = clamp01(tuning.recommended_floor + tuning.recommended_span * evidence_strength);
    if (confidence - recommended).abs() > tuning.adjustment_gap {
        let kind = if recommended > confidence {
            FindingKind::HypothesisPromote
        } else {
            FindingKind::HypothesisDemote
        };
        findings.push(ctx.finding(
            &record.id,
            kind,
            format!("confidence {confidence:.2} vs recommended {recommended:.2}"),
            json!({ "confidence": confidence, "recommended": recommended }),
        ));
    }
}
