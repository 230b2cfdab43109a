//! Synthesis scan: mines cross-domain analogies and proposes bridge records.
//!
//! Records cluster by domain (falling back to first tag, then "general") in
//! first-seen order. Cluster pairs are compared record-by-record on shared
//! tags; the strongest analogies per pair become findings, and well-populated
//! pairs with at least one analogy earn a bridge proposal. All caps keep the
//! pass bounded regardless of snapshot size.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::finding::{Finding, FindingKind};
use crate::lattice::Record;

use super::ScanContext;

/// Tuning for the synthesis scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisTuning {
    /// Clusters considered per run, in first-seen order (default: 10).
    pub max_clusters: usize,
    /// Records compared per cluster within a pair (default: 15).
    pub max_per_cluster: usize,
    /// Jaccard-style similarity a record pair must exceed (default: 0.15).
    pub min_similarity: f64,
    /// Analogies kept per cluster pair (default: 5).
    pub max_analogies: usize,
    /// Both clusters must be strictly larger than this for a bridge (default: 3).
    pub bridge_min_cluster_size: usize,
}

impl Default for SynthesisTuning {
    fn default() -> Self {
        Self {
            max_clusters: 10,
            max_per_cluster: 15,
            min_similarity: 0.15,
            max_analogies: 5,
            bridge_min_cluster_size: 3,
        }
    }
}

pub fn scan(visible: &[&Record], ctx: &ScanContext<'_>) -> Vec<Finding> {
    let tuning = &ctx.tuning.synthesis;

    // Cluster in first-seen order; HashMap only for membership lookup.
    let mut order: Vec<&str> = Vec::new();
    let mut clusters: HashMap<&str, Vec<&Record>> = HashMap::new();
    for record in visible.iter().copied() {
        let key = cluster_key(record);
        if !clusters.contains_key(key) {
            order.push(key);
        }
        clusters.entry(key).or_default().push(record);
    }

    let keys = &order[..order.len().min(tuning.max_clusters)];
    let mut findings = Vec::new();
    for i in 0..keys.len() {
        for j in (i + 1)..keys.len() {
            compare_clusters(keys[i], keys[j], &clusters, tuning, ctx, &mut findings);
        }
    }
    findings
}

fn cluster_key<'r>(record: &'r Record) -> &'r str {
    record
        .domain
        .as_deref()
        .or_else(|| record.tags.first().map(String::as_str))
        .unwrap_or("general")
}

struct Analogy<'r> {
    record_a: &'r str,
    record_b: &'r str,
    shared: Vec<&'r str>,
    similarity: f64,
}

fn compare_clusters(
    key_a: &str,
    key_b: &str,
    clusters: &HashMap<&str, Vec<&Record>>,
    tuning: &SynthesisTuning,
    ctx: &ScanContext<'_>,
    findings: &mut Vec<Finding>,
) {
    let cluster_a = &clusters[key_a];
    let cluster_b = &clusters[key_b];
    let slice_a = &cluster_a[..cluster_a.len().min(tuning.max_per_cluster)];
    let slice_b = &cluster_b[..cluster_b.len().min(tuning.max_per_cluster)];

    let mut analogies: Vec<Analogy<'_>> = Vec::new();
    for a in slice_a.iter().copied() {
        for b in slice_b.iter().copied() {
            if let Some(analogy) = tag_analogy(a, b, key_a, key_b, tuning) {
                analogies.push(analogy);
            }
        }
    }

    // Strongest first; ties break on record ids so runs are reproducible.
    analogies.sort_by(|x, y| {
        y.similarity
            .partial_cmp(&x.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| (x.record_a, x.record_b).cmp(&(y.record_a, y.record_b)))
    });
    analogies.truncate(tuning.max_analogies);

    for analogy in &analogies {
        findings.push(ctx.finding(
            analogy.record_a,
            FindingKind::CrossDomainAnalogy,
            format!(
                "{} and {} share {} tag(s) across {key_a}/{key_b}",
                analogy.record_a,
                analogy.record_b,
                analogy.shared.len()
            ),
            json!({
                "record_a": analogy.record_a,
                "record_b": analogy.record_b,
                "domain_a": key_a,
                "domain_b": key_b,
                "shared_tags": analogy.shared,
                "similarity": analogy.similarity,
            }),
        ));
    }

    let both_populated = cluster_a.len() > tuning.bridge_min_cluster_size
        && cluster_b.len() > tuning.bridge_min_cluster_size;
    if both_populated && !analogies.is_empty() {
        findings.push(ctx.finding(
            analogies[0].record_a,
            FindingKind::BridgeDtuProposal,
            format!(
                "domains {key_a} and {key_b} show {} analogies; a bridge record could link them",
                analogies.len()
            ),
            json!({
                "domain_a": key_a,
                "domain_b": key_b,
                "analogy_count": analogies.len(),
                "top_similarity": analogies[0].similarity,
            }),
        ));
    }
}

/// Shared-tag similarity between two records, excluding the cluster keys
/// themselves from the shared set (but not from the union).
fn tag_analogy<'r>(
    a: &'r Record,
    b: &'r Record,
    key_a: &str,
    key_b: &str,
    tuning: &SynthesisTuning,
) -> Option<Analogy<'r>> {
    let tags_a: HashSet<&str> = a.tags.iter().map(String::as_str).collect();
    let tags_b: HashSet<&str> = b.tags.iter().map(String::as_str).collect();

    let mut shared: Vec<&str> = tags_a
        .intersection(&tags_b)
        .copied()
        .filter(|tag| *tag != key_a && *tag != key_b)
        .collect();
    if shared.is_empty() {
        return None;
    }
    shared.sort_unstable();

    let union = tags_a.union(&tags_b).count();
    let similarity = shared.len() as f64 / union as f64;
    if similarity > tuning.min_similarity {
        Some(Analogy {
            record_a: &a.id,
            record_b: &b.id,
            shared,
            similarity,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::scan::ScanTuning;
    use std::sync::atomic::AtomicU64;

    const NOW: u64 = 1_700_000_000_000;

    fn record(id: &str, domain: &str, tags: &[&str]) -> Record {
        Record {
            id: id.into(),
            domain: Some(domain.into()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: NOW,
            ..Record::default()
        }
    }

    fn run(records: &[Record]) -> Vec<Finding> {
        let tuning = ScanTuning::default();
        let seq = AtomicU64::new(1);
        let ctx = ScanContext::new("synthesis-0001", AgentKind::Synthesis, NOW, &tuning, &seq);
        let refs: Vec<&Record> = records.iter().collect();
        scan(&refs, &ctx)
    }

    #[test]
    fn shared_tags_across_domains_form_an_analogy() {
        let records = vec![
            record("m1", "math", &["waves", "harmonics"]),
            record("p1", "physics", &["waves", "energy"]),
        ];
        let findings = run(&records);

        assert_eq!(findings.len(), 1);
        let analogy = &findings[0];
        assert_eq!(analogy.kind, FindingKind::CrossDomainAnalogy);
        assert_eq!(analogy.record_id, "m1");
        assert_eq!(analogy.data["shared_tags"], serde_json::json!(["waves"]));
        // |{waves}| / |{waves, harmonics, energy}| = 1/3.
        let similarity = analogy.data["similarity"].as_f64().unwrap();
        assert!((similarity - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn cluster_keys_are_excluded_from_shared_tags() {
        // "math" as a shared tag is noise when math is one of the clusters.
        let records = vec![
            record("m1", "math", &["math", "symmetry"]),
            record("p1", "physics", &["math", "symmetry"]),
        ];
        let findings = run(&records);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].data["shared_tags"], serde_json::json!(["symmetry"]));
    }

    #[test]
    fn weak_overlap_is_ignored() {
        // 1 shared / 8 in union = 0.125 <= 0.15.
        let records = vec![
            record("m1", "math", &["a", "b", "c", "d", "shared"]),
            record("p1", "physics", &["e", "f", "g", "shared"]),
        ];
        assert!(run(&records).is_empty());
    }

    #[test]
    fn analogies_are_capped_and_sorted_strongest_first() {
        // Six record pairs all share one tag; similarity varies with tag count.
        let mut records = Vec::new();
        for i in 0..6 {
            let mut tags = vec!["link".to_string()];
            // Extra tags dilute the union for later records.
            for j in 0..i {
                tags.push(format!("extra-{i}-{j}"));
            }
            records.push(Record {
                id: format!("m{i}"),
                domain: Some("math".into()),
                tags: tags.clone(),
                created_at: NOW,
                ..Record::default()
            });
        }
        records.push(record("p0", "physics", &["link"]));

        let findings = run(&records);
        let analogies: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.kind == FindingKind::CrossDomainAnalogy)
            .collect();
        // Six candidates, capped at five.
        assert_eq!(analogies.len(), 5);
        let similarities: Vec<f64> = analogies
            .iter()
            .map(|f| f.data["similarity"].as_f64().unwrap())
            .collect();
        for window in similarities.windows(2) {
            assert!(window[0] >= window[1]);
        }
        // The weakest candidate (m5, union of 6 tags) fell off the list.
        assert!(
            !analogies
                .iter()
                .any(|f| f.data["record_a"] == "m5")
        );
    }

    #[test]
    fn bridge_needs_both_clusters_populated() {
        // 4 records per cluster, sharing a tag: analogy + bridge.
        let mut records = Vec::new();
        for i in 0..4 {
            records.push(record(&format!("m{i}"), "math", &["link"]));
            records.push(record(&format!("p{i}"), "physics", &["link"]));
        }
        let findings = run(&records);
        let bridges: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.kind == FindingKind::BridgeDtuProposal)
            .collect();
        assert_eq!(bridges.len(), 1);
        assert_eq!(bridges[0].data["domain_a"], "math");
        assert_eq!(bridges[0].data["domain_b"], "physics");
        assert!(bridges[0].data["analogy_count"].as_u64().unwrap() >= 1);

        // Three per cluster is not strictly greater than three: no bridge.
        let records: Vec<Record> = (0..3)
            .flat_map(|i| {
                [
                    record(&format!("m{i}"), "math", &["link"]),
                    record(&format!("p{i}"), "physics", &["link"]),
                ]
            })
            .collect();
        let findings = run(&records);
        assert!(
            !findings
                .iter()
                .any(|f| f.kind == FindingKind::BridgeDtuProposal)
        );
        assert!(
            findings
                .iter()
                .any(|f| f.kind == FindingKind::CrossDomainAnalogy)
        );
    }

    #[test]
    fn only_the_first_ten_clusters_compete() {
        let records: Vec<Record> = (0..12)
            .map(|i| record(&format!("r-{i:02}"), &format!("d-{i:02}"), &["link"]))
            .collect();
        let findings = run(&records);

        assert!(!findings.is_empty());
        for finding in &findings {
            assert_ne!(finding.data["record_a"], "r-10");
            assert_ne!(finding.data["record_b"], "r-10");
            assert_ne!(finding.data["record_a"], "r-11");
            assert_ne!(finding.data["record_b"], "r-11");
        }
    }

    #[test]
    fn fallback_cluster_keys_apply() {
        // No domain: first tag clusters; no tags at all: "general".
        let mut tagged = Record::new("t1", NOW);
        tagged.tags = vec!["biology".into(), "cells".into()];
        let mut bare = Record::new("g1", NOW);
        bare.tags.clear();
        let mut physics = record("p1", "physics", &["cells"]);
        physics.tags.push("membranes".into());

        let findings = run(&[tagged, bare, physics]);
        // biology cluster vs physics cluster share "cells".
        assert!(
            findings
                .iter()
                .any(|f| f.kind == FindingKind::CrossDomainAnalogy
                    && f.data["domain_a"] == "biology"
                    && f.data["domain_b"] == "physics")
        );
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        let tuning = SynthesisTuning::default();
        let a = record("a", "math", &["x", "y", "z"]);
        let b = record("b", "physics", &["y", "z", "w"]);

        let forward = tag_analogy(&a, &b, "math", "physics", &tuning).unwrap();
        let backward = tag_analogy(&b, &a, "physics", "math", &tuning).unwrap();
        assert_eq!(forward.similarity, backward.similarity);
        assert!(forward.similarity > 0.0 && forward.similarity <= 1.0);
        assert_eq!(forward.shared, backward.shared);
    }
}
