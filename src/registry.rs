//! Agent registry: the roster of custodian agents.
//!
//! The registry owns agent state and nothing else. Scheduling walks agents in
//! registration order, so the roster keeps an explicit order list next to the
//! concurrent map; ids come from one process-wide sequence and are never
//! reused, even across kinds.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::agent::{Agent, AgentKind, AgentStatus, SpawnConfig};
use crate::error::RegistryError;

pub struct AgentRegistry {
    agents: DashMap<String, Agent>,
    /// Registration order; the scheduler iterates this, never the map.
    order: RwLock<Vec<String>>,
    seq: AtomicU64,
}

impl AgentRegistry {
    pub fn new() -> Self {
        AgentRegistry {
            agents: DashMap::new(),
            order: RwLock::new(Vec::new()),
            seq: AtomicU64::new(1),
        }
    }

    /// Register a new agent and return its initial state.
    pub fn create(
        &self,
        kind: AgentKind,
        spawn: SpawnConfig,
        now_ms: u64,
    ) -> Result<Agent, RegistryError> {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let agent_id = format!("{}-{n:04}", kind.label());
        let agent = Agent::spawn(agent_id.clone(), kind, spawn, now_ms)?;
        self.agents.insert(agent_id.clone(), agent.clone());
        self.order.write().unwrap().push(agent_id);
        Ok(agent)
    }

    /// Snapshot of one agent's current state.
    pub fn get(&self, agent_id: &str) -> Result<Agent, RegistryError> {
        self.agents
            .get(agent_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RegistryError::AgentNotFound {
                agent_id: agent_id.to_string(),
            })
    }

    /// Pause an agent; idempotent for already-paused agents.
    pub fn pause(&self, agent_id: &str) -> Result<Agent, RegistryError> {
        self.set_status(agent_id, AgentStatus::Paused)
    }

    /// Resume a paused agent; idempotent for active agents.
    pub fn resume(&self, agent_id: &str) -> Result<Agent, RegistryError> {
        self.set_status(agent_id, AgentStatus::Active)
    }

    fn set_status(&self, agent_id: &str, status: AgentStatus) -> Result<Agent, RegistryError> {
        let mut agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::AgentNotFound {
                agent_id: agent_id.to_string(),
            })?;
        agent.status = status;
        Ok(agent.value().clone())
    }

    /// Remove an agent permanently, returning its final state.
    pub fn destroy(&self, agent_id: &str) -> Result<Agent, RegistryError> {
        let (_, agent) = self
            .agents
            .remove(agent_id)
            .ok_or_else(|| RegistryError::AgentNotFound {
                agent_id: agent_id.to_string(),
            })?;
        self.order.write().unwrap().retain(|id| id != agent_id);
        Ok(agent)
    }

    /// All agents in registration order.
    pub fn list(&self) -> Vec<Agent> {
        let order = self.order.read().unwrap();
        order
            .iter()
            .filter_map(|id| self.agents.get(id).map(|r| r.value().clone()))
            .collect()
    }

    /// Agent ids in registration order.
    pub fn ids_in_order(&self) -> Vec<String> {
        self.order.read().unwrap().clone()
    }

    /// Stamp a completed run on an agent. Counters only ever increase.
    pub fn record_run(
        &self,
        agent_id: &str,
        now_ms: u64,
        findings: u64,
        repairs: u64,
    ) -> Result<Agent, RegistryError> {
        let mut agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::AgentNotFound {
                agent_id: agent_id.to_string(),
            })?;
        agent.last_run_at = Some(now_ms);
        agent.run_count += 1;
        agent.findings_count += findings;
        agent.repairs_count += repairs;
        Ok(agent.value().clone())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agents.len())
            .finish()
    }
}
