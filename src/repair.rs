//! Auto-repair engine: mechanically fixes dangling references.
//!
//! Only two defects are ever repaired without review, and both amount to
//! deleting a pointer that leads nowhere. Everything else a scan reports is
//! left for a human or a higher-level policy. Repairs that cannot proceed are
//! skipped quietly so one stale finding never derails a sweep.

use tracing::debug;

use crate::finding::{Finding, FindingKind, RepairAction, Severity};
use crate::lattice::Record;

/// Counts from one repair pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepairOutcome {
    /// Eligible findings the engine tried to fix.
    pub attempted: usize,
    /// Fixes that landed; their findings are marked `repaired` in place.
    pub applied: usize,
}

/// Fix every Low-severity auto-repairable finding against `records`, in place.
///
/// A repair that cannot proceed or would change nothing (record gone, payload
/// incomplete, field already clear) leaves its finding unrepaired for a later
/// pass and is logged at debug level only.
pub fn repair_findings(findings: &mut [Finding], records: &mut [Record]) -> RepairOutcome {
    let mut outcome = RepairOutcome::default();
    for finding in findings.iter_mut() {
        if finding.severity != Severity::Low || !finding.auto_repair || finding.repaired {
            continue;
        }
        outcome.attempted += 1;
        match attempt(finding, records) {
            Some(action) => {
                finding.repaired = true;
                finding.repair_action = Some(action);
                outcome.applied += 1;
            }
            None => {
                debug!(
                    finding_id = %finding.finding_id,
                    record_id = %finding.record_id,
                    kind = %finding.kind,
                    "repair: skipped, nothing applicable to change"
                );
            }
        }
    }
    outcome
}

/// `Some` only when the record actually changed. A target that is already
/// gone (parent cleared, reference no longer present) is a failure, not a
/// success; a duplicate finding never double-counts a fix.
fn attempt(finding: &Finding, records: &mut [Record]) -> Option<RepairAction> {
    let record = records.iter_mut().find(|r| r.id == finding.record_id)?;
    match finding.kind {
        FindingKind::BrokenLineage => record
            .parent_id
            .take()
            .map(|_| RepairAction::ClearedBrokenParentReference),
        FindingKind::BrokenCrossReference => {
            let missing = finding.data.get("missing_ref")?.as_str()?;
            let before = record.cross_refs.len();
            record.cross_refs.retain(|r| r != missing);
            if record.cross_refs.len() < before {
                Some(RepairAction::RemovedBrokenCrossReference)
            } else {
                None
            }
        }
        _ => None,
    }
}
