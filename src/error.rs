//! Rich diagnostic error types for the maat custodian engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so hosts know exactly what went wrong and
//! how to fix it. Expected bad data (a raw record without an id) is a distinct
//! variant from operational failures (an unknown agent), never a blanket catch.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the maat engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the host.
#[derive(Debug, Error, Diagnostic)]
pub enum MaatError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lattice(#[from] LatticeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("invalid agent kind: {kind}")]
    #[diagnostic(
        code(maat::registry::invalid_agent_kind),
        help(
            "Valid agent kinds are: patrol, integrity, hypothesis_tester, \
             debate_simulator, freshness, synthesis."
        )
    )]
    InvalidAgentKind { kind: String },

    #[error("agent not found: {agent_id}")]
    #[diagnostic(
        code(maat::registry::agent_not_found),
        help(
            "No agent with this id is registered. It may have been destroyed, \
             or the id may be misspelled. List live agents with `list_agents()`."
        )
    )]
    AgentNotFound { agent_id: String },

    #[error("agent not active: {agent_id}")]
    #[diagnostic(
        code(maat::registry::agent_not_active),
        help("The agent is paused. Resume it with `resume_agent()` before running it.")
    )]
    AgentNotActive { agent_id: String },

    #[error("agents are frozen: no agent may run until thawed")]
    #[diagnostic(
        code(maat::registry::agents_frozen),
        help(
            "The global freeze flag is set. Call `thaw_all()` to allow agents \
             to run again. Freezing does not pause or destroy any agent."
        )
    )]
    AgentsFrozen,

    #[error("invalid interval: {interval_ms} ms")]
    #[diagnostic(
        code(maat::registry::invalid_interval),
        help(
            "Agent intervals must be strictly positive milliseconds. \
             Omit the override to use the per-kind default instead."
        )
    )]
    InvalidInterval { interval_ms: u64 },
}

// ---------------------------------------------------------------------------
// Lattice errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LatticeError {
    #[error("raw record at index {index} has no id")]
    #[diagnostic(
        code(maat::lattice::missing_record_id),
        help(
            "Every record must carry a non-empty `id` before it can enter the \
             lattice. The record was skipped; fix it at the source and re-ingest."
        )
    )]
    MissingRecordId { index: usize },

    #[error("raw record at index {index} has an empty id")]
    #[diagnostic(
        code(maat::lattice::empty_record_id),
        help(
            "Record ids must be non-empty strings. The record was skipped; \
             fix it at the source and re-ingest."
        )
    )]
    EmptyRecordId { index: usize },

    #[error("snapshot parse error: {message}")]
    #[diagnostic(
        code(maat::lattice::snapshot_parse),
        help(
            "The snapshot could not be parsed as a JSON array of records. \
             Check the file for truncation or a non-array top-level value."
        )
    )]
    SnapshotParse { message: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("history cap must be positive: {which} is 0")]
    #[diagnostic(
        code(maat::config::zero_cap),
        help("Set every history cap to at least 1, or omit it to use the default.")
    )]
    ZeroCap { which: &'static str },

    #[error("global history trim target {trim_to} exceeds cap {global_cap}")]
    #[diagnostic(
        code(maat::config::trim_exceeds_cap),
        help(
            "The batch-trim target must be at most the global cap, \
             otherwise trimming could never terminate below the cap."
        )
    )]
    TrimExceedsCap { trim_to: usize, global_cap: usize },

    #[error("config file error: {message}")]
    #[diagnostic(
        code(maat::config::file),
        help("Check that the config file exists and is valid TOML for WardenConfig.")
    )]
    File { message: String },
}

/// Convenience alias for functions returning maat results.
pub type MaatResult<T> = std::result::Result<T, MaatError>;
