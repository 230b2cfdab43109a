//! Findings: what scans report about the lattice.
//!
//! The taxonomy is fixed per scan algorithm; severity and auto-repair
//! eligibility are pure functions of the finding kind, so two scans can never
//! disagree about how serious the same defect is.

use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::lattice::RecordId;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Finding kinds
// ---------------------------------------------------------------------------

/// Everything the six scans know how to report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    // patrol
    StaleLowAuthority,
    BrokenLineage,
    OrphanedContradiction,
    // integrity
    LineageChainBroken,
    BrokenCrossReference,
    AuthorityDrift,
    // hypothesis_tester
    UnsupportedHypothesis,
    StaleHypothesis,
    HypothesisPromote,
    HypothesisDemote,
    // debate_simulator
    DebateTension,
    SynthesisProposal,
    // freshness
    TemporalDecay,
    // synthesis
    CrossDomainAnalogy,
    BridgeDtuProposal,
}

impl FindingKind {
    pub const ALL: [FindingKind; 15] = [
        FindingKind::StaleLowAuthority,
        FindingKind::BrokenLineage,
        FindingKind::OrphanedContradiction,
        FindingKind::LineageChainBroken,
        FindingKind::BrokenCrossReference,
        FindingKind::AuthorityDrift,
        FindingKind::UnsupportedHypothesis,
        FindingKind::StaleHypothesis,
        FindingKind::HypothesisPromote,
        FindingKind::HypothesisDemote,
        FindingKind::DebateTension,
        FindingKind::SynthesisProposal,
        FindingKind::TemporalDecay,
        FindingKind::CrossDomainAnalogy,
        FindingKind::BridgeDtuProposal,
    ];

    /// Wire-stable label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::StaleLowAuthority => "stale_low_authority",
            Self::BrokenLineage => "broken_lineage",
            Self::OrphanedContradiction => "orphaned_contradiction",
            Self::LineageChainBroken => "lineage_chain_broken",
            Self::BrokenCrossReference => "broken_cross_reference",
            Self::AuthorityDrift => "authority_drift",
            Self::UnsupportedHypothesis => "unsupported_hypothesis",
            Self::StaleHypothesis => "stale_hypothesis",
            Self::HypothesisPromote => "hypothesis_promote",
            Self::HypothesisDemote => "hypothesis_demote",
            Self::DebateTension => "debate_tension",
            Self::SynthesisProposal => "synthesis_proposal",
            Self::TemporalDecay => "temporal_decay",
            Self::CrossDomainAnalogy => "cross_domain_analogy",
            Self::BridgeDtuProposal => "bridge_dtu_proposal",
        }
    }

    /// Severity is fixed per kind.
    ///
    /// Medium marks defects needing review; Low marks routine wear and
    /// opportunities. High is reserved for future escalation rules.
    pub fn severity(&self) -> Severity {
        match self {
            Self::StaleLowAuthority
            | Self::OrphanedContradiction
            | Self::LineageChainBroken
            | Self::AuthorityDrift
            | Self::UnsupportedHypothesis
            | Self::TemporalDecay => Severity::Medium,

            Self::BrokenLineage
            | Self::BrokenCrossReference
            | Self::StaleHypothesis
            | Self::HypothesisPromote
            | Self::HypothesisDemote
            | Self::DebateTension
            | Self::SynthesisProposal
            | Self::CrossDomainAnalogy
            | Self::BridgeDtuProposal => Severity::Low,
        }
    }

    /// The two dangling-reference defects are mechanical to fix; nothing
    /// else may be mutated without review.
    pub fn auto_repairable(&self) -> bool {
        matches!(self, Self::BrokenLineage | Self::BrokenCrossReference)
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Repair actions
// ---------------------------------------------------------------------------

/// What the auto-repair engine did to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAction {
    ClearedBrokenParentReference,
    RemovedBrokenCrossReference,
}

impl RepairAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ClearedBrokenParentReference => "cleared_broken_parent_reference",
            Self::RemovedBrokenCrossReference => "removed_broken_cross_reference",
        }
    }
}

impl std::fmt::Display for RepairAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Finding record
// ---------------------------------------------------------------------------

/// One defect or opportunity reported by a scan.
///
/// `record_id` is a weak reference: the record may be evicted or destroyed by
/// the host at any time without invalidating the finding. `repaired` and
/// `repair_action` are written only by the auto-repair engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub finding_id: String,
    pub agent_id: String,
    pub agent_kind: AgentKind,
    pub record_id: RecordId,
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    /// Algorithm-specific payload (scores, missing ids, pair members).
    pub data: serde_json::Value,
    pub auto_repair: bool,
    pub repaired: bool,
    pub repair_action: Option<RepairAction>,
    pub timestamp: u64,
}

impl Finding {
    /// Severity and auto-repair eligibility are derived from the kind here,
    /// never passed in.
    pub fn new(
        finding_id: String,
        agent_id: &str,
        agent_kind: AgentKind,
        record_id: &str,
        kind: FindingKind,
        message: String,
        data: serde_json::Value,
        timestamp: u64,
    ) -> Self {
        Finding {
            finding_id,
            agent_id: agent_id.to_string(),
            agent_kind,
            record_id: record_id.to_string(),
            kind,
            severity: kind.severity(),
            message,
            data,
            auto_repair: kind.auto_repairable(),
            repaired: false,
            repair_action: None,
            timestamp,
        }
    }
}
