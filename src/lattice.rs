//! Canonical lattice records and the duck-typed ingestion boundary.
//!
//! Records arrive from hosts in whatever shape their stores produce: `parentId`
//! at the top level, nested under `lineage`, or spelled `derivedFrom`; domains
//! at the top level or under `machine`; cross-references split across
//! `references` and `crossRefs`. All of that is resolved exactly once, here,
//! into [`Record`]. Every algorithm downstream consumes the canonical form
//! and never sniffs aliases again.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::LatticeError;

/// Stable identifier of a record in the lattice.
pub type RecordId = String;

/// Milliseconds per day, used for all age computations.
pub const MS_PER_DAY: f64 = 86_400_000.0;

// ---------------------------------------------------------------------------
// Raw (ingestion) form
// ---------------------------------------------------------------------------

/// Nested lineage block some producers emit instead of a top-level parent id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLineage {
    #[serde(alias = "parentId")]
    pub parent_id: Option<String>,
}

/// Machine-assigned metadata block; only the domain is meaningful here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMachine {
    pub domain: Option<String>,
}

/// A record as produced by a host store, aliases and all.
///
/// Every field is optional or defaulted so that arbitrary snapshots parse;
/// validation happens in [`Record::from_raw`], not in serde.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub id: Option<String>,
    #[serde(alias = "type")]
    pub kind: Option<String>,
    pub tags: Vec<String>,
    pub domain: Option<String>,
    pub scope: Option<String>,
    pub machine: Option<RawMachine>,
    #[serde(alias = "createdAt")]
    pub created_at: Option<u64>,
    pub authority: Option<f64>,
    pub confidence: Option<f64>,
    pub coherence: Option<f64>,
    pub evidence: Vec<serde_json::Value>,
    #[serde(alias = "parentId")]
    pub parent_id: Option<String>,
    pub lineage: Option<RawLineage>,
    #[serde(alias = "derivedFrom")]
    pub derived_from: Option<String>,
    pub references: Vec<String>,
    #[serde(alias = "crossRefs")]
    pub cross_refs: Vec<String>,
    pub contradicts: Vec<String>,
}

// ---------------------------------------------------------------------------
// Canonical form
// ---------------------------------------------------------------------------

/// A normalized lattice record.
///
/// All timestamps are milliseconds since the UNIX epoch. Scores are finite and
/// clamped to `[0, 1]` or absent. The custodian engine writes only `parent_id`
/// and `cross_refs` (during auto-repair); everything else is read-only here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub id: RecordId,
    pub kind: Option<String>,
    pub tags: Vec<String>,
    pub domain: Option<String>,
    pub scope: Option<String>,
    pub created_at: u64,
    pub authority: Option<f64>,
    pub confidence: Option<f64>,
    pub coherence: Option<f64>,
    pub evidence: Vec<serde_json::Value>,
    pub parent_id: Option<RecordId>,
    pub cross_refs: Vec<RecordId>,
    pub contradicts: Vec<RecordId>,
}

impl Record {
    /// Minimal record with an id and creation time; everything else defaulted.
    pub fn new(id: impl Into<RecordId>, created_at: u64) -> Self {
        Record {
            id: id.into(),
            created_at,
            ..Record::default()
        }
    }

    /// Normalize one raw record.
    ///
    /// Alias precedence: `parent_id` > `lineage.parent_id` > `derived_from`;
    /// `domain` > `machine.domain`; cross-refs are the order-preserving union
    /// of `references` and `crossRefs`. A missing `createdAt` is stamped with
    /// `now_ms` so a freshly seen record is never spuriously stale. Records
    /// without a usable id are rejected with a typed, per-item error.
    pub fn from_raw(raw: RawRecord, index: usize, now_ms: u64) -> Result<Record, LatticeError> {
        let id = match raw.id {
            None => return Err(LatticeError::MissingRecordId { index }),
            Some(id) if id.trim().is_empty() => {
                return Err(LatticeError::EmptyRecordId { index });
            }
            Some(id) => id,
        };

        let domain = raw.domain.or_else(|| raw.machine.and_then(|m| m.domain));
        let parent_id = raw
            .parent_id
            .or_else(|| raw.lineage.and_then(|l| l.parent_id))
            .or(raw.derived_from)
            .filter(|p| !p.is_empty());

        let mut cross_refs: Vec<String> = Vec::new();
        for r in raw.references.into_iter().chain(raw.cross_refs) {
            if !cross_refs.contains(&r) {
                cross_refs.push(r);
            }
        }

        Ok(Record {
            id,
            kind: raw.kind,
            tags: raw.tags,
            domain,
            scope: raw.scope,
            created_at: raw.created_at.unwrap_or(now_ms),
            authority: finite_unit(raw.authority),
            confidence: finite_unit(raw.confidence),
            coherence: finite_unit(raw.coherence),
            evidence: raw.evidence,
            parent_id,
            cross_refs,
            contradicts: raw.contradicts,
        })
    }

    /// Age of this record in fractional days at `now_ms`.
    ///
    /// A record stamped in the future has age 0, not a negative age.
    pub fn age_days(&self, now_ms: u64) -> f64 {
        now_ms.saturating_sub(self.created_at) as f64 / MS_PER_DAY
    }

    /// Declared authority with the documented fallback chain:
    /// `authority ?? coherence ?? 0.5`.
    pub fn effective_authority(&self) -> f64 {
        self.authority.or(self.coherence).unwrap_or(0.5)
    }

    /// Declared confidence with the documented fallback chain:
    /// `confidence ?? coherence ?? 0.5`.
    pub fn effective_confidence(&self) -> f64 {
        self.confidence.or(self.coherence).unwrap_or(0.5)
    }

    pub fn evidence_count(&self) -> usize {
        self.evidence.len()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Squash non-finite score values to absent and clamp the rest to `[0, 1]`.
fn finite_unit(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite()).map(|x| x.clamp(0.0, 1.0))
}

// ---------------------------------------------------------------------------
// Snapshot normalization
// ---------------------------------------------------------------------------

/// Outcome of normalizing a snapshot: the canonical records (input order
/// preserved) plus one typed reason per skipped raw item.
#[derive(Debug, Default)]
pub struct NormalizeReport {
    pub records: Vec<Record>,
    pub skipped: Vec<LatticeError>,
}

/// Normalize a whole snapshot sequentially.
pub fn normalize_snapshot(raws: Vec<RawRecord>, now_ms: u64) -> NormalizeReport {
    let results = raws
        .into_iter()
        .enumerate()
        .map(|(index, raw)| Record::from_raw(raw, index, now_ms))
        .collect();
    collect_report(results)
}

/// Normalize a whole snapshot in parallel, preserving input order.
///
/// Normalization is a pure per-record map, so this is safe to fan out; use it
/// for large snapshots at the host edge.
pub fn normalize_snapshot_parallel(raws: Vec<RawRecord>, now_ms: u64) -> NormalizeReport {
    use rayon::prelude::*;

    let results: Vec<Result<Record, LatticeError>> = raws
        .into_par_iter()
        .enumerate()
        .map(|(index, raw)| Record::from_raw(raw, index, now_ms))
        .collect();
    collect_report(results)
}

fn collect_report(results: Vec<Result<Record, LatticeError>>) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    for result in results {
        match result {
            Ok(record) => report.records.push(record),
            Err(e) => {
                tracing::debug!(error = %e, "lattice: skipped raw record");
                report.skipped.push(e);
            }
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Snapshot index
// ---------------------------------------------------------------------------

/// Borrowed id->record map over a full snapshot.
///
/// Existence checks (broken references, lineage walks) always consult this
/// full-snapshot index, never a territory-filtered subset, so a scoped agent
/// cannot mistake an out-of-territory record for a missing one. On duplicate
/// ids the first record wins.
pub struct RecordIndex<'a> {
    by_id: HashMap<&'a str, &'a Record>,
}

impl<'a> RecordIndex<'a> {
    pub fn build(records: &'a [Record]) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for record in records {
            by_id.entry(record.id.as_str()).or_insert(record);
        }
        RecordIndex { by_id }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&'a Record> {
        self.by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl std::fmt::Debug for RecordIndex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordIndex")
            .field("len", &self.by_id.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    fn raw_from_json(json: &str) -> RawRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn camel_case_aliases_parse() {
        let raw = raw_from_json(
            r#"{
                "id": "dtu-1",
                "type": "claim",
                "createdAt": 123,
                "crossRefs": ["dtu-2"],
                "derivedFrom": "dtu-0"
            }"#,
        );
        let record = Record::from_raw(raw, 0, NOW).unwrap();
        assert_eq!(record.kind.as_deref(), Some("claim"));
        assert_eq!(record.created_at, 123);
        assert_eq!(record.cross_refs, vec!["dtu-2".to_string()]);
        assert_eq!(record.parent_id.as_deref(), Some("dtu-0"));
    }

    #[test]
    fn parent_alias_precedence() {
        // Top-level parentId beats the nested lineage block.
        let raw = raw_from_json(
            r#"{"id": "a", "parentId": "top", "lineage": {"parentId": "nested"}}"#,
        );
        let record = Record::from_raw(raw, 0, NOW).unwrap();
        assert_eq!(record.parent_id.as_deref(), Some("top"));

        // Lineage beats derivedFrom.
        let raw = raw_from_json(
            r#"{"id": "b", "lineage": {"parentId": "nested"}, "derivedFrom": "derived"}"#,
        );
        let record = Record::from_raw(raw, 0, NOW).unwrap();
        assert_eq!(record.parent_id.as_deref(), Some("nested"));
    }

    #[test]
    fn domain_falls_back_to_machine_block() {
        let raw = raw_from_json(r#"{"id": "a", "machine": {"domain": "physics"}}"#);
        let record = Record::from_raw(raw, 0, NOW).unwrap();
        assert_eq!(record.domain.as_deref(), Some("physics"));

        let raw = raw_from_json(
            r#"{"id": "b", "domain": "math", "machine": {"domain": "physics"}}"#,
        );
        let record = Record::from_raw(raw, 0, NOW).unwrap();
        assert_eq!(record.domain.as_deref(), Some("math"));
    }

    #[test]
    fn cross_refs_union_preserves_order_and_dedupes() {
        // Duplicates are dropped whether they repeat across the two alias
        // fields or inside a single one.
        let raw = raw_from_json(
            r#"{"id": "a", "references": ["r1", "r2", "r1"], "crossRefs": ["r2", "r3"]}"#,
        );
        let record = Record::from_raw(raw, 0, NOW).unwrap();
        assert_eq!(record.cross_refs, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn missing_and_empty_ids_are_typed_rejections() {
        let raw = raw_from_json(r#"{"tags": ["x"]}"#);
        assert!(matches!(
            Record::from_raw(raw, 7, NOW),
            Err(LatticeError::MissingRecordId { index: 7 })
        ));

        let raw = raw_from_json(r#"{"id": "  "}"#);
        assert!(matches!(
            Record::from_raw(raw, 2, NOW),
            Err(LatticeError::EmptyRecordId { index: 2 })
        ));
    }

    #[test]
    fn missing_created_at_stamps_now() {
        let raw = raw_from_json(r#"{"id": "a"}"#);
        let record = Record::from_raw(raw, 0, NOW).unwrap();
        assert_eq!(record.created_at, NOW);
        assert_eq!(record.age_days(NOW), 0.0);
    }

    #[test]
    fn non_finite_scores_normalize_to_absent() {
        let mut raw = raw_from_json(r#"{"id": "a", "authority": 0.9}"#);
        raw.confidence = Some(f64::NAN);
        raw.coherence = Some(f64::INFINITY);
        let record = Record::from_raw(raw, 0, NOW).unwrap();
        assert_eq!(record.authority, Some(0.9));
        assert_eq!(record.confidence, None);
        assert_eq!(record.coherence, None);
    }

    #[test]
    fn out_of_range_scores_clamp() {
        let raw = raw_from_json(r#"{"id": "a", "authority": 1.7, "confidence": -0.2}"#);
        let record = Record::from_raw(raw, 0, NOW).unwrap();
        assert_eq!(record.authority, Some(1.0));
        assert_eq!(record.confidence, Some(0.0));
    }

    #[test]
    fn fallback_chains_use_coherence_then_default() {
        let record = Record {
            id: "a".into(),
            coherence: Some(0.8),
            ..Record::default()
        };
        assert!((record.effective_authority() - 0.8).abs() < f64::EPSILON);
        assert!((record.effective_confidence() - 0.8).abs() < f64::EPSILON);

        let bare = Record::new("b", NOW);
        assert!((bare.effective_authority() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn future_timestamps_have_zero_age() {
        let record = Record::new("a", NOW + 1_000_000);
        assert_eq!(record.age_days(NOW), 0.0);
    }

    #[test]
    fn normalize_snapshot_skips_bad_items_and_keeps_order() {
        let raws: Vec<RawRecord> = serde_json::from_str(
            r#"[
                {"id": "a"},
                {"tags": ["no-id"]},
                {"id": "b"},
                {"id": ""}
            ]"#,
        )
        .unwrap();
        let report = normalize_snapshot(raws, NOW);
        let ids: Vec<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(
            report.skipped[0],
            LatticeError::MissingRecordId { index: 1 }
        ));
        assert!(matches!(
            report.skipped[1],
            LatticeError::EmptyRecordId { index: 3 }
        ));
    }

    #[test]
    fn parallel_normalize_matches_sequential() {
        let raws: Vec<RawRecord> = (0..64)
            .map(|i| raw_from_json(&format!(r#"{{"id": "dtu-{i}", "createdAt": {i}}}"#)))
            .collect();
        let sequential = normalize_snapshot(raws.clone(), NOW);
        let parallel = normalize_snapshot_parallel(raws, NOW);
        assert_eq!(sequential.records, parallel.records);
    }

    #[test]
    fn index_first_record_wins_on_duplicates() {
        let records = vec![
            Record {
                id: "dup".into(),
                domain: Some("first".into()),
                ..Record::default()
            },
            Record {
                id: "dup".into(),
                domain: Some("second".into()),
                ..Record::default()
            },
        ];
        let index = RecordIndex::build(&records);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("dup").unwrap().domain.as_deref(), Some("first"));
        assert!(!index.contains("other"));
    }
}
