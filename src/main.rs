//! maat CLI: lattice custodian engine.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use maat::agent::{AgentKind, SpawnConfig};
use maat::error::{ConfigError, LatticeError};
use maat::finding::Finding;
use maat::lattice::{self, RawRecord, Record};
use maat::warden::{Warden, WardenConfig};

#[derive(Parser)]
#[command(name = "maat", version, about = "Lattice custodian engine")]
struct Cli {
    /// TOML config file with scan tuning and history caps.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the six agent kinds with their default cadences.
    Kinds,

    /// Run one agent kind once over a snapshot.
    Scan {
        /// Path to a JSON snapshot (array of records).
        #[arg(long)]
        snapshot: PathBuf,

        /// Agent kind to run (e.g. "patrol", "debate-simulator").
        #[arg(long)]
        kind: String,

        /// Restrict the agent to one tag, domain, or scope.
        #[arg(long)]
        territory: Option<String>,

        /// Clock override in epoch milliseconds (defaults to the system clock).
        #[arg(long)]
        at_ms: Option<u64>,

        /// Write the (possibly repaired) snapshot back to the file.
        #[arg(long)]
        write_back: bool,

        /// Print findings as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Run every agent kind once over a snapshot: a full audit.
    Sweep {
        /// Path to a JSON snapshot (array of records).
        #[arg(long)]
        snapshot: PathBuf,

        /// Restrict all agents to one tag, domain, or scope.
        #[arg(long)]
        territory: Option<String>,

        /// Clock override in epoch milliseconds (defaults to the system clock).
        #[arg(long)]
        at_ms: Option<u64>,

        /// Write the (possibly repaired) snapshot back to the file.
        #[arg(long)]
        write_back: bool,

        /// Print findings as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Keep custodian agents running on a heartbeat until Ctrl-C.
    Watch {
        /// Path to a JSON snapshot (array of records).
        #[arg(long)]
        snapshot: PathBuf,

        /// Heartbeat period in milliseconds.
        #[arg(long, default_value = "60000")]
        every_ms: u64,

        /// Agent kinds to spawn, comma-separated (default: all six).
        #[arg(long)]
        kinds: Option<String>,

        /// Restrict all agents to one tag, domain, or scope.
        #[arg(long)]
        territory: Option<String>,

        /// Write the repaired snapshot back to the file on shutdown.
        #[arg(long)]
        write_back: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Kinds => {
            println!("Agent kinds:");
            for kind in AgentKind::ALL {
                println!(
                    "  {:<18} every {:>3} min  {}",
                    kind.label(),
                    kind.default_interval_ms() / 60_000,
                    kind.describe()
                );
            }
        }

        Commands::Scan {
            snapshot,
            kind,
            territory,
            at_ms,
            write_back,
            json,
        } => {
            let warden = Warden::new(config)?;
            let now = clock(at_ms);
            let mut records = load_snapshot(&snapshot, now)?;

            let kind: AgentKind = kind.parse()?;
            let agent = warden.create_agent_at(now, kind, spawn_config(territory.as_deref()))?;
            let report = warden.run_agent_at(now, &agent.agent_id, &mut records)?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report.findings).into_diagnostic()?
                );
            } else {
                println!(
                    "{}: {} record(s) seen, {} outside territory, {} finding(s), {} repaired",
                    agent.agent_id,
                    report.records_seen,
                    report.records_skipped,
                    report.findings.len(),
                    report.repaired
                );
                print_findings(&report.findings);
            }

            if write_back {
                write_snapshot(&snapshot, &records)?;
                println!("Wrote snapshot back to {}", snapshot.display());
            }
        }

        Commands::Sweep {
            snapshot,
            territory,
            at_ms,
            write_back,
            json,
        } => {
            let warden = Warden::new(config)?;
            let now = clock(at_ms);
            let mut records = load_snapshot(&snapshot, now)?;

            let mut all = Vec::new();
            for kind in AgentKind::ALL {
                let agent =
                    warden.create_agent_at(now, kind, spawn_config(territory.as_deref()))?;
                let report = warden.run_agent_at(now, &agent.agent_id, &mut records)?;
                if !json {
                    println!(
                        "{}: {} finding(s), {} repaired",
                        agent.agent_id,
                        report.findings.len(),
                        report.repaired
                    );
                }
                all.extend(report.findings);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&all).into_diagnostic()?);
            } else {
                print_findings(&all);
                println!();
                println!("{}", warden.metrics());
            }

            if write_back {
                write_snapshot(&snapshot, &records)?;
                println!("Wrote snapshot back to {}", snapshot.display());
            }
        }

        Commands::Watch {
            snapshot,
            every_ms,
            kinds,
            territory,
            write_back,
        } => {
            use tokio::time::{Duration, interval};

            let warden = Warden::new(config)?;
            let mut records = load_snapshot(&snapshot, clock(None))?;

            let selected: Vec<AgentKind> = match kinds {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim().parse())
                    .collect::<std::result::Result<_, _>>()?,
                None => AgentKind::ALL.to_vec(),
            };
            for kind in &selected {
                warden.create_agent(*kind, spawn_config(territory.as_deref()))?;
            }
            println!(
                "Watching {} record(s) with {} agent(s), heartbeat {every_ms} ms. Ctrl-C to stop.",
                records.len(),
                selected.len()
            );

            let mut heartbeat = interval(Duration::from_millis(every_ms.max(1)));
            loop {
                tokio::select! {
                    _ = heartbeat.tick() => {
                        warden.tick(&mut records);
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("watch: shutdown signal received");
                        break;
                    }
                }
            }

            if write_back {
                write_snapshot(&snapshot, &records)?;
                println!("Wrote snapshot back to {}", snapshot.display());
            }
            println!("{}", warden.metrics());
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<WardenConfig> {
    let Some(path) = path else {
        return Ok(WardenConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
        message: format!("{}: {e}", path.display()),
    })?;
    let config = toml::from_str(&content).map_err(|e| ConfigError::File {
        message: format!("{}: {e}", path.display()),
    })?;
    Ok(config)
}

/// Load a JSON snapshot and normalize it, skipping malformed records.
fn load_snapshot(path: &PathBuf, now_ms: u64) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;
    let raws: Vec<RawRecord> =
        serde_json::from_str(&content).map_err(|e| LatticeError::SnapshotParse {
            message: format!("{}: {e}", path.display()),
        })?;
    let report = lattice::normalize_snapshot_parallel(raws, now_ms);
    if !report.skipped.is_empty() {
        tracing::warn!(
            skipped = report.skipped.len(),
            "snapshot: malformed records were skipped"
        );
    }
    Ok(report.records)
}

fn write_snapshot(path: &PathBuf, records: &[Record]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).into_diagnostic()?;
    std::fs::write(path, json).into_diagnostic()?;
    Ok(())
}

fn spawn_config(territory: Option<&str>) -> SpawnConfig {
    match territory {
        Some(t) => SpawnConfig::default().with_territory(t),
        None => SpawnConfig::default(),
    }
}

fn clock(at_ms: Option<u64>) -> u64 {
    at_ms.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    })
}

fn print_findings(findings: &[Finding]) {
    for f in findings {
        let repair = match f.repair_action {
            Some(action) => format!(" [repaired: {action}]"),
            None => String::new(),
        };
        println!(
            "  {} [{}] {} on \"{}\": {}{}",
            f.finding_id, f.severity, f.kind, f.record_id, f.message, repair
        );
    }
}
