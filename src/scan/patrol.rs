//! Patrol scan: the routine sweep.
//!
//! Three checks per record: stale low-authority content, a parent reference
//! pointing at nothing, and contradiction targets that no longer exist.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::finding::{Finding, FindingKind};
use crate::lattice::{Record, RecordIndex};

use super::ScanContext;

/// Tuning for the patrol scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolTuning {
    /// Age in days beyond which a record may be flagged stale (default: 30).
    pub stale_age_days: f64,
    /// Authority below which a stale record is flagged (default: 0.5).
    pub low_authority: f64,
}

impl Default for PatrolTuning {
    fn default() -> Self {
        Self {
            stale_age_days: 30.0,
            low_authority: 0.5,
        }
    }
}

pub fn scan(visible: &[&Record], index: &RecordIndex<'_>, ctx: &ScanContext<'_>) -> Vec<Finding> {
    let tuning = &ctx.tuning.patrol;
    let mut findings = Vec::new();
    for record in visible {
        scan_record(record, index, tuning, ctx, &mut findings);
    }
    findings
}

fn scan_record(
    record: &Record,
    index: &RecordIndex<'_>,
    tuning: &PatrolTuning,
    ctx: &ScanContext<'_>,
    findings: &mut Vec<Finding>,
) {
    let age_days = record.age_days(ctx.now_ms);
    let authority = record.effective_authority();

    if age_days > tuning.stale_age_days && authority < tuning.low_authority {
        findings.push(ctx.finding(
            &record.id,
            FindingKind::StaleLowAuthority,
            format!("record is {age_days:.1} days old with authority {authority:.2}"),
            json!({ "age_days": age_days, "authority": authority }),
        ));
    }

    if let Some(parent_id) = &record.parent_id {
        if !index.contains(parent_id) {
            findings.push(ctx.finding(
                &record.id,
                FindingKind::BrokenLineage,
                format!("parent {parent_id} is missing from the lattice"),
                json!({ "parent_id": parent_id }),
            ));
        }
    }

    let missing: Vec<&str> = record
        .contradicts
        .iter()
        .filter(|id| !index.contains(id))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        findings.push(ctx.finding(
            &record.id,
            FindingKind::OrphanedContradiction,
            format!("{} contradiction target(s) missing from the lattice", missing.len()),
            json!({ "missing_ids": missing }),
        ));
    }
}
