//! Findings store: capped per-agent and global histories.
//!
//! Findings are never deleted individually, only evicted by capacity. The two
//! stores trim differently on purpose: per-agent history drops the single
//! oldest entry as each new one lands, while the global history is allowed to
//! fill to its cap and is then cut back to a lower watermark in one batch so a
//! busy sweep does not pay an eviction per finding.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;

use crate::agent::AgentKind;
use crate::finding::Finding;

/// Entries returned by an agent query when no limit is given.
pub const DEFAULT_AGENT_QUERY_LIMIT: usize = 50;
/// Most entries an agent query may return regardless of the requested limit.
pub const MAX_AGENT_QUERY_LIMIT: usize = 100;
/// Entries returned by a global query when no limit is given.
pub const DEFAULT_GLOBAL_QUERY_LIMIT: usize = 50;
/// Most entries a global query may return regardless of the requested limit.
pub const MAX_GLOBAL_QUERY_LIMIT: usize = 500;

/// Capped finding histories, shared across agents.
pub struct FindingsLog {
    per_agent: DashMap<String, VecDeque<Finding>>,
    global: Mutex<VecDeque<Finding>>,
    per_agent_cap: usize,
    global_cap: usize,
    global_trim_to: usize,
}

impl FindingsLog {
    /// Caps are taken as given; the owning engine validates them.
    /// `global_trim_to` must not exceed `global_cap`, or the overflow trim
    /// would underflow.
    pub fn new(per_agent_cap: usize, global_cap: usize, global_trim_to: usize) -> Self {
        debug_assert!(
            global_trim_to <= global_cap,
            "global_trim_to must not exceed global_cap"
        );
        FindingsLog {
            per_agent: DashMap::new(),
            global: Mutex::new(VecDeque::new()),
            per_agent_cap,
            global_cap,
            global_trim_to,
        }
    }

    /// Append a batch of findings to both histories, evicting as needed.
    pub fn record(&self, agent_id: &str, findings: &[Finding]) {
        if findings.is_empty() {
            return;
        }

        let mut history = self.per_agent.entry(agent_id.to_string()).or_default();
        for finding in findings {
            history.push_back(finding.clone());
            if history.len() > self.per_agent_cap {
                history.pop_front();
            }
        }
        drop(history);

        let mut global = self.global.lock().unwrap();
        for finding in findings {
            global.push_back(finding.clone());
            if global.len() > self.global_cap {
                let excess = global.len() - self.global_trim_to;
                global.drain(..excess);
            }
        }
    }

    /// Most recent findings for one agent, newest first.
    ///
    /// `limit` defaults to [`DEFAULT_AGENT_QUERY_LIMIT`] and is clamped to
    /// [`MAX_AGENT_QUERY_LIMIT`]. Unknown agents yield an empty list.
    pub fn for_agent(&self, agent_id: &str, limit: Option<usize>) -> Vec<Finding> {
        let limit = limit
            .unwrap_or(DEFAULT_AGENT_QUERY_LIMIT)
            .min(MAX_AGENT_QUERY_LIMIT);
        match self.per_agent.get(agent_id) {
            Some(history) => history.iter().rev().take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Most recent global findings, newest first, optionally restricted to
    /// one agent kind before the limit is applied.
    ///
    /// `limit` defaults to [`DEFAULT_GLOBAL_QUERY_LIMIT`] and is clamped to
    /// [`MAX_GLOBAL_QUERY_LIMIT`].
    pub fn all(&self, kind: Option<AgentKind>, limit: Option<usize>) -> Vec<Finding> {
        let limit = limit
            .unwrap_or(DEFAULT_GLOBAL_QUERY_LIMIT)
            .min(MAX_GLOBAL_QUERY_LIMIT);
        let global = self.global.lock().unwrap();
        global
            .iter()
            .rev()
            .filter(|f| kind.map_or(true, |k| f.agent_kind == k))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drop an agent's private history. Its entries stay in the global log.
    pub fn remove_agent(&self, agent_id: &str) {
        self.per_agent.remove(agent_id);
    }

    /// Current length of the global history.
    pub fn global_len(&self) -> usize {
        self.global.lock().unwrap().len()
    }
}

impl std::fmt::Debug for FindingsLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FindingsLog")
            .field("agents", &self.per_agent.len())
            .field("global_len", &self.global.lock().map(|q| q.len()).unwrap_or(0))
            .field("per_agent_cap", &self.per_agent_cap)
            .field("global_cap", &self.global_cap)
            .finish()
    }
}
