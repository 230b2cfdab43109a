//! Freshness scan: shelf-life checks for fast-moving domains.
//!
//! Records are classified against two configurable domain sets. Timeless
//! domains never decay and win on a tie; records in neither set are left
//! alone. Only the temporal class has a shelf life.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::finding::{Finding, FindingKind};
use crate::lattice::Record;

use super::ScanContext;

/// Tuning for the freshness scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessTuning {
    /// Age in days past which a temporal record decays (default: 90).
    pub decay_age_days: f64,
    /// Domains whose content does not age out.
    pub timeless_domains: Vec<String>,
    /// Domains whose content goes stale.
    pub temporal_domains: Vec<String>,
}

impl Default for FreshnessTuning {
    fn default() -> Self {
        Self {
            decay_age_days: 90.0,
            timeless_domains: ["math", "physics", "mathematics", "logic", "geometry"]
                .map(String::from)
                .to_vec(),
            temporal_domains: ["politics", "economics", "technology", "current_events"]
                .map(String::from)
                .to_vec(),
        }
    }
}

pub fn scan(visible: &[&Record], ctx: &ScanContext<'_>) -> Vec<Finding> {
    let tuning = &ctx.tuning.freshness;
    let mut findings = Vec::new();
    for record in visible {
        // Timeless precedence: a record matching both sets never decays.
        if matched_label(record, &tuning.timeless_domains).is_some() {
            continue;
        }
        let Some(label) = matched_label(record, &tuning.temporal_domains) else {
            continue;
        };
        let age_days = record.age_days(ctx.now_ms);
        if age_days > tuning.decay_age_days {
            findings.push(ctx.finding(
                &record.id,
                FindingKind::TemporalDecay,
                format!("{label} content is {age_days:.1} days old"),
                json!({ "age_days": age_days, "matched": label }),
            ));
        }
    }
    findings
}

/// The record's domain if it is in `set`, else its first tag that is.
fn matched_label<'r>(record: &'r Record, set: &[String]) -> Option<&'r str> {
    if let Some(domain) = record.domain.as_deref() {
        if set.iter().any(|s| s == domain) {
            return Some(domain);
        }
    }
    record
        .tags
        .iter()
        .find(|tag| set.iter().any(|s| s == *tag))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::lattice::MS_PER_DAY;
    use crate::scan::ScanTuning;
    use std::sync::atomic::AtomicU64;

    const NOW: u64 = 1_700_000_000_000;

    fn days_ago(days: f64) -> u64 {
        NOW - (days * MS_PER_DAY) as u64
    }

    fn record(id: &str, domain: Option<&str>, tags: &[&str], created_at: u64) -> Record {
        Record {
            id: id.into(),
            domain: domain.map(String::from),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at,
            ..Record::default()
        }
    }

    fn run_with(records: &[Record], tuning: ScanTuning) -> Vec<Finding> {
        let seq = AtomicU64::new(1);
        let ctx = ScanContext::new("freshness-0001", AgentKind::Freshness, NOW, &tuning, &seq);
        let refs: Vec<&Record> = records.iter().collect();
        scan(&refs, &ctx)
    }

    fn run(records: &[Record]) -> Vec<Finding> {
        run_with(records, ScanTuning::default())
    }

    #[test]
    fn old_temporal_records_decay() {
        let findings = run(&[record("a", Some("politics"), &[], days_ago(120.0))]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::TemporalDecay);
        assert_eq!(findings[0].data["matched"], "politics");
        assert_eq!(findings[0].severity, crate::finding::Severity::Medium);
    }

    #[test]
    fn tag_classification_counts_too() {
        let findings = run(&[record("a", None, &["notes", "technology"], days_ago(120.0))]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].data["matched"], "technology");
    }

    #[test]
    fn young_temporal_records_hold() {
        assert!(run(&[record("a", Some("economics"), &[], days_ago(89.0))]).is_empty());
        // The age gate is strict.
        assert!(run(&[record("b", Some("economics"), &[], days_ago(90.0))]).is_empty());
    }

    #[test]
    fn timeless_wins_on_a_tie() {
        // Tagged both math and politics: never decays.
        let findings = run(&[record("a", None, &["math", "politics"], days_ago(400.0))]);
        assert!(findings.is_empty());

        // Timeless domain with a temporal tag: same story.
        let findings = run(&[record("b", Some("physics"), &["politics"], days_ago(400.0))]);
        assert!(findings.is_empty());
    }

    #[test]
    fn unclassified_records_are_left_alone() {
        let findings = run(&[record("a", Some("cooking"), &["recipes"], days_ago(400.0))]);
        assert!(findings.is_empty());
    }

    #[test]
    fn domain_sets_are_tunable() {
        let mut tuning = ScanTuning::default();
        tuning.freshness.temporal_domains.push("cooking".into());
        tuning.freshness.decay_age_days = 10.0;

        let findings = run_with(
            &[record("a", Some("cooking"), &[], days_ago(11.0))],
            tuning,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].data["matched"], "cooking");
    }
}
