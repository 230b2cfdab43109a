//! On-demand metric rollups over the agent roster.
//!
//! Nothing here is cached: per-agent counters are maintained incrementally at
//! mutation time, and a rollup just sums whatever the roster holds right now.
//! The capped findings history is lossy, so counters are the record of truth
//! for lifetime totals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentKind};

/// Lifetime counter sums. Monotonic, like the per-agent counters they add up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterTotals {
    pub runs: u64,
    pub findings: u64,
    pub repairs: u64,
}

impl CounterTotals {
    fn absorb(&mut self, agent: &Agent) {
        self.runs += agent.run_count;
        self.findings += agent.findings_count;
        self.repairs += agent.repairs_count;
    }
}

/// Rollup for one agent kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindMetrics {
    pub agents: usize,
    pub totals: CounterTotals,
}

/// Point-in-time rollup across the whole engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenMetrics {
    pub agents: usize,
    pub frozen: bool,
    pub totals: CounterTotals,
    /// Only kinds with at least one registered agent appear.
    pub by_kind: BTreeMap<AgentKind, KindMetrics>,
    pub global_history_len: usize,
}

impl WardenMetrics {
    pub fn compute(agents: &[Agent], frozen: bool, global_history_len: usize) -> Self {
        let mut totals = CounterTotals::default();
        let mut by_kind: BTreeMap<AgentKind, KindMetrics> = BTreeMap::new();
        for agent in agents {
            totals.absorb(agent);
            let entry = by_kind.entry(agent.kind).or_default();
            entry.agents += 1;
            entry.totals.absorb(agent);
        }
        WardenMetrics {
            agents: agents.len(),
            frozen,
            totals,
            by_kind,
            global_history_len,
        }
    }
}

impl std::fmt::Display for WardenMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "maat custodian metrics")?;
        writeln!(f, "  agents:          {}", self.agents)?;
        writeln!(f, "  frozen:          {}", self.frozen)?;
        writeln!(f, "  runs:            {}", self.totals.runs)?;
        writeln!(f, "  findings:        {}", self.totals.findings)?;
        writeln!(f, "  repairs:         {}", self.totals.repairs)?;
        writeln!(f, "  global history:  {}", self.global_history_len)?;
        writeln!(f, "  by kind:")?;
        if self.by_kind.is_empty() {
            writeln!(f, "    (none)")?;
        }
        for (kind, m) in &self.by_kind {
            writeln!(
                f,
                "    {:<18} {} agent(s), {} run(s), {} finding(s), {} repair(s)",
                format!("{kind}:"),
                m.agents,
                m.totals.runs,
                m.totals.findings,
                m.totals.repairs,
            )?;
        }
        Ok(())
    }
}
