//! Custodian agents: the six kinds, their lifecycle state, and spawn options.
//!
//! An agent is a small bookkeeping record: kind, territory, cadence, status,
//! and monotonic counters. The scan logic itself lives in [`crate::scan`];
//! the roster lives in [`crate::registry`].

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::territory::Territory;

// ---------------------------------------------------------------------------
// Agent kinds
// ---------------------------------------------------------------------------

/// The six custodian agent kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Routine sweep: staleness, broken lineage, orphaned contradictions.
    Patrol,
    /// Deep checks: lineage chains, cross-references, authority drift.
    Integrity,
    /// Hypothesis calibration against accumulated evidence.
    HypothesisTester,
    /// Pairwise tension and synthesis opportunities between same-tag records.
    DebateSimulator,
    /// Shelf-life checks for records in fast-moving domains.
    Freshness,
    /// Cross-domain analogy mining and bridge proposals.
    Synthesis,
}

impl AgentKind {
    /// All six kinds in canonical order.
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Patrol,
        AgentKind::Integrity,
        AgentKind::HypothesisTester,
        AgentKind::DebateSimulator,
        AgentKind::Freshness,
        AgentKind::Synthesis,
    ];

    /// Wire-stable label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Patrol => "patrol",
            Self::Integrity => "integrity",
            Self::HypothesisTester => "hypothesis_tester",
            Self::DebateSimulator => "debate_simulator",
            Self::Freshness => "freshness",
            Self::Synthesis => "synthesis",
        }
    }

    /// One-line description of what this kind looks for.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Patrol => "stale low-authority records, broken lineage, orphaned contradictions",
            Self::Integrity => "lineage chains, cross-reference validity, authority drift",
            Self::HypothesisTester => "unsupported, stale, or miscalibrated hypotheses",
            Self::DebateSimulator => "tension and synthesis candidates between same-tag records",
            Self::Freshness => "temporal-domain records decaying past their shelf life",
            Self::Synthesis => "cross-domain analogies and bridge proposals",
        }
    }

    /// Default scan cadence for this kind, in milliseconds.
    ///
    /// Cheap sweeps run often; combinatorial scans run on the hour.
    pub fn default_interval_ms(&self) -> u64 {
        match self {
            Self::Patrol => 5 * 60 * 1_000,
            Self::Integrity => 10 * 60 * 1_000,
            Self::HypothesisTester => 15 * 60 * 1_000,
            Self::DebateSimulator => 30 * 60 * 1_000,
            Self::Freshness => 60 * 60 * 1_000,
            Self::Synthesis => 60 * 60 * 1_000,
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept hyphens from shell-minded callers.
        match s.trim().replace('-', "_").as_str() {
            "patrol" => Ok(Self::Patrol),
            "integrity" => Ok(Self::Integrity),
            "hypothesis_tester" => Ok(Self::HypothesisTester),
            "debate_simulator" => Ok(Self::DebateSimulator),
            "freshness" => Ok(Self::Freshness),
            "synthesis" => Ok(Self::Synthesis),
            _ => Err(RegistryError::InvalidAgentKind { kind: s.to_string() }),
        }
    }
}

// ---------------------------------------------------------------------------
// Agent status
// ---------------------------------------------------------------------------

/// Lifecycle state of an agent. Destruction is removal, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Paused,
}

impl AgentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Agent record
// ---------------------------------------------------------------------------

/// A registered custodian agent.
///
/// Counters only ever increase; `last_run_at == None` means the agent has
/// never run and is therefore always due.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub kind: AgentKind,
    pub territory: Territory,
    pub interval_ms: u64,
    pub status: AgentStatus,
    pub created_at: u64,
    pub last_run_at: Option<u64>,
    pub run_count: u64,
    pub findings_count: u64,
    pub repairs_count: u64,
    pub metadata: serde_json::Value,
}

impl Agent {
    pub(crate) fn spawn(
        agent_id: String,
        kind: AgentKind,
        spawn: SpawnConfig,
        now_ms: u64,
    ) -> Result<Agent, RegistryError> {
        let interval_ms = match spawn.interval_ms {
            Some(0) => return Err(RegistryError::InvalidInterval { interval_ms: 0 }),
            Some(ms) => ms,
            None => kind.default_interval_ms(),
        };
        Ok(Agent {
            agent_id,
            kind,
            territory: spawn.territory.unwrap_or_default(),
            interval_ms,
            status: AgentStatus::Active,
            created_at: now_ms,
            last_run_at: None,
            run_count: 0,
            findings_count: 0,
            repairs_count: 0,
            metadata: spawn.metadata.unwrap_or(serde_json::Value::Null),
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    /// Whether the agent's interval has elapsed at `now_ms`.
    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_run_at {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Spawn options
// ---------------------------------------------------------------------------

/// Optional overrides applied when creating an agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Scan cadence override; must be > 0 if given.
    pub interval_ms: Option<u64>,
    /// Territory restriction; default is the whole lattice.
    pub territory: Option<Territory>,
    /// Free-form host metadata carried on the agent.
    pub metadata: Option<serde_json::Value>,
}

impl SpawnConfig {
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = Some(interval_ms);
        self
    }

    pub fn with_territory(mut self, scope: impl Into<String>) -> Self {
        self.territory = Some(Territory::scoped(scope));
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
