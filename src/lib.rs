// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # maat
//!
//! A lattice custodian engine: periodic agents that scan a shared knowledge
//! lattice for decay, contradiction, and drift, repair what is mechanical to
//! fix, and report everything else.
//!
//! ## Architecture
//!
//! - **Lattice snapshot** (`lattice`): raw-record normalization into canonical records
//! - **Agent roster** (`registry`): six custodian kinds, lifecycle, monotonic counters
//! - **Scan engine** (`scan`): six deterministic algorithms with tunable thresholds
//! - **Auto-repair** (`repair`): mechanical fixes for dangling references only
//! - **Findings store** (`history`): capped per-agent and global histories
//! - **Warden facade** (`warden`): tick scheduler, global freeze, on-demand metrics
//!
//! ## Library usage
//!
//! ```no_run
//! use maat::agent::{AgentKind, SpawnConfig};
//! use maat::lattice::Record;
//! use maat::warden::{Warden, WardenConfig};
//!
//! let warden = Warden::new(WardenConfig::default()).unwrap();
//! let patrol = warden
//!     .create_agent(AgentKind::Patrol, SpawnConfig::default())
//!     .unwrap();
//! let mut records = vec![Record::new("dtu-1", 0)];
//! let report = warden.run_agent(&patrol.agent_id, &mut records).unwrap();
//! println!("{} finding(s), {} repaired", report.findings.len(), report.repaired);
//! ```

pub mod agent;
pub mod error;
pub mod finding;
pub mod history;
pub mod lattice;
pub mod metrics;
pub mod registry;
pub mod repair;
pub mod scan;
pub mod territory;
pub mod warden;
