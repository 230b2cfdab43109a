//! Warden facade: top-level API for the maat custodian engine.
//!
//! The `Warden` owns all subsystems: the agent roster, the findings
//! histories, the freeze flag, and the finding-id allocator. It holds no
//! records of its own; every run takes a `&mut [Record]` snapshot from the
//! host, scans it, and applies auto-repairs in place. All time-sensitive
//! operations have an `_at(now_ms, …)` variant so hosts and tests can drive
//! a deterministic clock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentKind, SpawnConfig};
use crate::error::{ConfigError, MaatResult, RegistryError};
use crate::finding::Finding;
use crate::history::FindingsLog;
use crate::lattice::Record;
use crate::metrics::WardenMetrics;
use crate::registry::AgentRegistry;
use crate::repair;
use crate::scan::{self, ScanContext};

/// Configuration for the warden.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Scan thresholds and weights.
    pub tuning: scan::ScanTuning,
    /// Findings kept per agent (default: 100).
    pub per_agent_history_cap: usize,
    /// Findings the global history may hold before trimming (default: 1000).
    pub global_history_cap: usize,
    /// Watermark the global history is cut back to on overflow (default: 500).
    pub global_history_trim_to: usize,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            tuning: scan::ScanTuning::default(),
            per_agent_history_cap: 100,
            global_history_cap: 1_000,
            global_history_trim_to: 500,
        }
    }
}

/// Result of one manual agent run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub findings: Vec<Finding>,
    /// Auto-repairs applied during this run.
    pub repaired: usize,
    /// Records inside the agent's territory.
    pub records_seen: usize,
    /// Records outside the territory, untouched by the scan.
    pub records_skipped: usize,
}

/// Result of one scheduler tick: which agents ran, which did not.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub ran: Vec<String>,
    pub skipped: Vec<String>,
}

/// The maat custodian engine.
pub struct Warden {
    config: WardenConfig,
    registry: AgentRegistry,
    log: FindingsLog,
    frozen: AtomicBool,
    finding_seq: AtomicU64,
}

impl Warden {
    /// Create a new warden with the given configuration.
    pub fn new(config: WardenConfig) -> MaatResult<Self> {
        if config.per_agent_history_cap == 0 {
            return Err(ConfigError::ZeroCap { which: "per_agent_history_cap" }.into());
        }
        if config.global_history_cap == 0 {
            return Err(ConfigError::ZeroCap { which: "global_history_cap" }.into());
        }
        if config.global_history_trim_to == 0 {
            return Err(ConfigError::ZeroCap { which: "global_history_trim_to" }.into());
        }
        if config.global_history_trim_to > config.global_history_cap {
            return Err(ConfigError::TrimExceedsCap {
                trim_to: config.global_history_trim_to,
                global_cap: config.global_history_cap,
            }
            .into());
        }

        tracing::info!(
            per_agent_cap = config.per_agent_history_cap,
            global_cap = config.global_history_cap,
            trim_to = config.global_history_trim_to,
            "initializing maat warden"
        );

        let log = FindingsLog::new(
            config.per_agent_history_cap,
            config.global_history_cap,
            config.global_history_trim_to,
        );
        Ok(Warden {
            registry: AgentRegistry::new(),
            log,
            frozen: AtomicBool::new(false),
            finding_seq: AtomicU64::new(1),
            config,
        })
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Agent lifecycle
    // -----------------------------------------------------------------------

    /// Register a new agent, stamping the system clock.
    pub fn create_agent(&self, kind: AgentKind, spawn: SpawnConfig) -> MaatResult<Agent> {
        self.create_agent_at(now_ms(), kind, spawn)
    }

    pub fn create_agent_at(
        &self,
        now_ms: u64,
        kind: AgentKind,
        spawn: SpawnConfig,
    ) -> MaatResult<Agent> {
        Ok(self.registry.create(kind, spawn, now_ms)?)
    }

    pub fn get_agent(&self, agent_id: &str) -> MaatResult<Agent> {
        Ok(self.registry.get(agent_id)?)
    }

    pub fn pause_agent(&self, agent_id: &str) -> MaatResult<Agent> {
        Ok(self.registry.pause(agent_id)?)
    }

    pub fn resume_agent(&self, agent_id: &str) -> MaatResult<Agent> {
        Ok(self.registry.resume(agent_id)?)
    }

    /// Remove an agent and its private findings history. Its entries in the
    /// global history survive until evicted by capacity.
    pub fn destroy_agent(&self, agent_id: &str) -> MaatResult<()> {
        self.registry.destroy(agent_id)?;
        self.log.remove_agent(agent_id);
        Ok(())
    }

    /// All agents, in registration order.
    pub fn list_agents(&self) -> Vec<Agent> {
        self.registry.list()
    }

    // -----------------------------------------------------------------------
    // Running
    // -----------------------------------------------------------------------

    /// Run one agent now, regardless of due-ness, stamping the system clock.
    pub fn run_agent(&self, agent_id: &str, records: &mut [Record]) -> MaatResult<RunReport> {
        self.run_agent_at(now_ms(), agent_id, records)
    }

    /// Run one agent at an explicit clock reading.
    ///
    /// Scans the snapshot under the agent's territory, applies auto-repairs
    /// in place, records findings in both histories, and stamps the agent's
    /// counters. Fails if the roster is frozen, the agent is unknown, or the
    /// agent is paused.
    pub fn run_agent_at(
        &self,
        now_ms: u64,
        agent_id: &str,
        records: &mut [Record],
    ) -> MaatResult<RunReport> {
        if self.is_frozen() {
            return Err(RegistryError::AgentsFrozen.into());
        }
        let agent = self.registry.get(agent_id)?;
        if !agent.is_active() {
            return Err(RegistryError::AgentNotActive {
                agent_id: agent_id.to_string(),
            }
            .into());
        }

        let ctx = ScanContext::new(
            &agent.agent_id,
            agent.kind,
            now_ms,
            &self.config.tuning,
            &self.finding_seq,
        );
        let report = scan::run_scan(records, &agent.territory, &ctx);
        let mut findings = report.findings;

        let outcome = repair::repair_findings(&mut findings, records);
        self.log.record(agent_id, &findings);
        self.registry
            .record_run(agent_id, now_ms, findings.len() as u64, outcome.applied as u64)?;

        tracing::debug!(
            agent = %agent_id,
            findings = findings.len(),
            repaired = outcome.applied,
            seen = report.records_seen,
            "warden: agent run complete"
        );

        Ok(RunReport {
            findings,
            repaired: outcome.applied,
            records_seen: report.records_seen,
            records_skipped: report.records_skipped,
        })
    }

    /// One scheduler heartbeat, stamping the system clock.
    pub fn tick(&self, records: &mut [Record]) -> TickReport {
        self.tick_at(now_ms(), records)
    }

    /// One scheduler heartbeat at an explicit clock reading.
    ///
    /// Walks agents in registration order and runs each one that is active
    /// and due. A failing agent lands in `skipped` and never prevents later
    /// agents from being evaluated.
    pub fn tick_at(&self, now_ms: u64, records: &mut [Record]) -> TickReport {
        let ids = self.registry.ids_in_order();
        let mut report = TickReport::default();

        if self.is_frozen() {
            report.skipped = ids;
            return report;
        }

        for agent_id in ids {
            // An in-flight tick honors a freeze as soon as it lands.
            if self.is_frozen() {
                report.skipped.push(agent_id);
                continue;
            }
            let agent = match self.registry.get(&agent_id) {
                Ok(agent) => agent,
                // Destroyed between the order snapshot and now.
                Err(_) => {
                    report.skipped.push(agent_id);
                    continue;
                }
            };
            if !agent.is_active() || !agent.is_due(now_ms) {
                report.skipped.push(agent_id);
                continue;
            }
            match self.run_agent_at(now_ms, &agent_id, records) {
                Ok(_) => report.ran.push(agent_id),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        agent = %agent_id,
                        "warden: agent run failed during tick"
                    );
                    report.skipped.push(agent_id);
                }
            }
        }

        tracing::info!(
            ran = report.ran.len(),
            skipped = report.skipped.len(),
            "warden: tick complete"
        );
        report
    }

    // -----------------------------------------------------------------------
    // Freeze
    // -----------------------------------------------------------------------

    /// Stop all agents from running until [`Warden::thaw_all`]. Does not
    /// pause or destroy anything.
    pub fn freeze_all(&self) {
        self.frozen.store(true, Ordering::SeqCst);
        tracing::info!("warden: agents frozen");
    }

    pub fn thaw_all(&self) {
        self.frozen.store(false, Ordering::SeqCst);
        tracing::info!("warden: agents thawed");
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Findings and metrics
    // -----------------------------------------------------------------------

    /// Most recent findings for one agent, newest first.
    pub fn agent_findings(&self, agent_id: &str, limit: Option<usize>) -> Vec<Finding> {
        self.log.for_agent(agent_id, limit)
    }

    /// Most recent global findings, newest first, optionally filtered by
    /// agent kind before the limit applies.
    pub fn all_findings(&self, kind: Option<AgentKind>, limit: Option<usize>) -> Vec<Finding> {
        self.log.all(kind, limit)
    }

    /// Point-in-time rollup across the roster and histories.
    pub fn metrics(&self) -> WardenMetrics {
        WardenMetrics::compute(&self.registry.list(), self.is_frozen(), self.log.global_len())
    }
}

impl std::fmt::Debug for Warden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warden")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("log", &self.log)
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
