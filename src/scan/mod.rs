//! Scan engine: the six custodian algorithms over a lattice snapshot.
//!
//! Each scan is a pure function of the territory-visible records, the
//! full-snapshot index, and a [`ScanContext`]: deterministic given the
//! snapshot and `now_ms`, no I/O, no randomness. Every record (or pair) is
//! evaluated by its own total function, so one odd item can never abort a
//! sweep. Severity is derived from the finding kind; all thresholds and
//! weights live in serde-loadable tuning structs whose defaults reproduce the
//! documented heuristics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::finding::{Finding, FindingKind};
use crate::lattice::{Record, RecordIndex};
use crate::territory::Territory;

pub mod debate;
pub mod freshness;
pub mod hypothesis;
pub mod integrity;
pub mod patrol;
pub mod synthesis;

pub use debate::DebateTuning;
pub use freshness::FreshnessTuning;
pub use hypothesis::HypothesisTuning;
pub use integrity::IntegrityTuning;
pub use patrol::PatrolTuning;
pub use synthesis::SynthesisTuning;

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

/// All scan tuning blocks in one serde-loadable bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanTuning {
    pub patrol: PatrolTuning,
    pub integrity: IntegrityTuning,
    pub hypothesis: HypothesisTuning,
    pub debate: DebateTuning,
    pub freshness: FreshnessTuning,
    pub synthesis: SynthesisTuning,
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything a scan needs besides the records themselves.
pub struct ScanContext<'a> {
    pub agent_id: &'a str,
    pub agent_kind: AgentKind,
    pub now_ms: u64,
    pub tuning: &'a ScanTuning,
    finding_seq: &'a AtomicU64,
}

impl<'a> ScanContext<'a> {
    pub fn new(
        agent_id: &'a str,
        agent_kind: AgentKind,
        now_ms: u64,
        tuning: &'a ScanTuning,
        finding_seq: &'a AtomicU64,
    ) -> Self {
        ScanContext {
            agent_id,
            agent_kind,
            now_ms,
            tuning,
            finding_seq,
        }
    }

    /// Mint a finding with the next sequential id, stamped at `now_ms`.
    pub fn finding(
        &self,
        record_id: &str,
        kind: FindingKind,
        message: String,
        data: serde_json::Value,
    ) -> Finding {
        let n = self.finding_seq.fetch_add(1, Ordering::Relaxed);
        Finding::new(
            format!("f-{n}"),
            self.agent_id,
            self.agent_kind,
            record_id,
            kind,
            message,
            data,
            self.now_ms,
        )
    }
}

// ---------------------------------------------------------------------------
// Reports and dispatch
// ---------------------------------------------------------------------------

/// Result of one scan pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    /// Records inside the agent's territory.
    pub records_seen: usize,
    /// Records outside the territory, left untouched.
    pub records_skipped: usize,
}

/// Filter by territory, build the full-snapshot index, and dispatch to the
/// algorithm for `ctx.agent_kind`.
pub fn run_scan(records: &[Record], territory: &Territory, ctx: &ScanContext<'_>) -> ScanReport {
    let visible: Vec<&Record> = records.iter().filter(|r| territory.matches(r)).collect();
    let index = RecordIndex::build(records);

    let findings = match ctx.agent_kind {
        AgentKind::Patrol => patrol::scan(&visible, &index, ctx),
        AgentKind::Integrity => integrity::scan(&visible, &index, ctx),
        AgentKind::HypothesisTester => hypothesis::scan(&visible, ctx),
        AgentKind::DebateSimulator => debate::scan(&visible, ctx),
        AgentKind::Freshness => freshness::scan(&visible, ctx),
        AgentKind::Synthesis => synthesis::scan(&visible, ctx),
    };

    ScanReport {
        records_seen: visible.len(),
        records_skipped: records.len() - visible.len(),
        findings,
    }
}

/// Clamp a score into `[0, 1]`.
pub(crate) fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp01_bounds() {
        assert_eq!(clamp01(-0.2), 0.0);
        assert_eq!(clamp01(0.0), 0.0);
        assert_eq!(clamp01(0.54), 0.54);
        assert_eq!(clamp01(1.0), 1.0);
        assert_eq!(clamp01(3.7), 1.0);
    }

    #[test]
    fn context_mints_sequential_finding_ids() {
        let tuning = ScanTuning::default();
        let seq = AtomicU64::new(1);
        let ctx = ScanContext::new("patrol-0001", AgentKind::Patrol, 1_000, &tuning, &seq);

        let a = ctx.finding(
            "dtu-1",
            FindingKind::BrokenLineage,
            "m".into(),
            serde_json::Value::Null,
        );
        let b = ctx.finding(
            "dtu-2",
            FindingKind::BrokenLineage,
            "m".into(),
            serde_json::Value::Null,
        );
        assert_eq!(a.finding_id, "f-1");
        assert_eq!(b.finding_id, "f-2");
        assert_eq!(a.timestamp, 1_000);
        assert_eq!(a.agent_id, "patrol-0001");
    }

    #[test]
    fn run_scan_filters_by_territory_but_indexes_everything() {
        // One in-territory record pointing at an out-of-territory parent:
        // the parent must count as present, not broken.
        let mut child = Record::new("child", 0);
        child.tags = vec!["core".into()];
        child.parent_id = Some("outside".into());
        let outside = Record::new("outside", 0);
        let records = vec![child, outside];

        let tuning = ScanTuning::default();
        let seq = AtomicU64::new(1);
        let ctx = ScanContext::new("patrol-0001", AgentKind::Patrol, 0, &tuning, &seq);
        let report = run_scan(&records, &Territory::scoped("core"), &ctx);

        assert_eq!(report.records_seen, 1);
        assert_eq!(report.records_skipped, 1);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn tuning_deserializes_from_partial_toml() {
        let tuning: ScanTuning = toml::from_str(
            r#"
            [patrol]
            stale_age_days = 45.0
            "#,
        )
        .unwrap();
        assert_eq!(tuning.patrol.stale_age_days, 45.0);
        // Everything unspecified keeps its default.
        assert_eq!(tuning.patrol.low_authority, 0.5);
        assert_eq!(tuning.integrity.max_lineage_hops, 10);
    }
}
