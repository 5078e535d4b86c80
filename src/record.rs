//! Quality records and the injected report data
//!
//! The report generator serializes two globals into every report:
//!
//! - `summary_data`: one [`QualityRecord`] per genome, sample and taxonomic level
//! - `samples`: the [`GroupIndex`], mapping each sample to the genomes it contains
//!
//! Older exports wrote the GUNC verdict either as a JSON boolean or as one of
//! several string spellings. That mess is resolved here, at the ingestion
//! boundary: [`QualityRecord::passed`] is always a strict `bool`.
//!
//! ```text
//! Value        | Passing?
//! -------------|---------
//! true         | yes
//! "True"       | yes
//! "true"       | yes
//! "Pass"       | yes
//! "pass"       | yes
//! anything else| no  (false, "fail", "FALSE", 1, null, missing)
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// String spellings of a passing verdict. Matching is case-sensitive.
pub const PASSING_SPELLINGS: [&str; 4] = ["True", "true", "Pass", "pass"];

/// GUNC taxonomic levels, broadest first
pub const TAXONOMIC_RANKS: [&str; 7] = [
    "kingdom", "phylum", "class", "order", "family", "genus", "species",
];

/// Normalize a serialized pass/fail verdict.
pub fn is_passing(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => is_passing_str(s),
        _ => false,
    }
}

pub fn is_passing_str(s: &str) -> bool {
    PASSING_SPELLINGS.contains(&s)
}

/// Interpret a metric cell. Numbers and numeric strings are accepted;
/// anything else (including NaN and infinities) is treated as missing.
pub fn parse_metric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|x| x.is_finite())
}

fn lenient_metric<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Ok(parse_metric(&Value::deserialize(d)?))
}

fn normalized_pass<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    Ok(is_passing(&Value::deserialize(d)?))
}

/// One row of the GUNC summary: a genome scored at one taxonomic level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRecord {
    /// Empty for reports built from a single, sample-less result set
    #[serde(default)]
    pub sample_id: String,
    #[serde(rename = "mag_id", alias = "entity_id")]
    pub entity_id: String,
    pub taxonomic_level: String,
    #[serde(rename = "reference_representation_score", default, deserialize_with = "lenient_metric")]
    pub reference_score: Option<f64>,
    #[serde(rename = "contamination_portion", default, deserialize_with = "lenient_metric")]
    pub contamination: Option<f64>,
    #[serde(rename = "pass_gunc", default, deserialize_with = "normalized_pass")]
    pub passed: bool,
    #[serde(default, deserialize_with = "lenient_metric")]
    pub n_contigs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metric")]
    pub n_genes_mapped: Option<f64>,
    /// Drives point size on the summary plot
    #[serde(default, deserialize_with = "lenient_metric")]
    pub clade_separation_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metric")]
    pub genes_retained_index: Option<f64>,
    /// Descriptive columns carried through for tooltips
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl QualityRecord {
    pub fn new(sample_id: &str, entity_id: &str, taxonomic_level: &str) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            entity_id: entity_id.to_string(),
            taxonomic_level: taxonomic_level.to_string(),
            reference_score: None,
            contamination: None,
            passed: false,
            n_contigs: None,
            n_genes_mapped: None,
            clade_separation_score: None,
            genes_retained_index: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_scores(mut self, reference_score: f64, contamination: f64) -> Self {
        self.reference_score = Some(reference_score);
        self.contamination = Some(contamination);
        self
    }

    pub fn with_passed(mut self, passed: bool) -> Self {
        self.passed = passed;
        self
    }
}

/// Sample id to the genomes scored in that sample.
///
/// Only used to populate the drill-down selectors, never to filter the plot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupIndex(BTreeMap<String, Vec<String>>);

impl GroupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[QualityRecord]) -> Self {
        let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for r in records {
            groups
                .entry(r.sample_id.clone())
                .or_default()
                .insert(r.entity_id.clone());
        }
        Self(
            groups
                .into_iter()
                .map(|(sample, entities)| (sample, entities.into_iter().collect()))
                .collect(),
        )
    }

    pub fn insert(&mut self, sample: impl Into<String>, entities: Vec<String>) {
        self.0.insert(sample.into(), entities);
    }

    /// True when the data has no sample dimension: a single `""` key.
    pub fn is_entity_only(&self) -> bool {
        self.0.len() == 1 && self.0.contains_key("")
    }

    pub fn contains(&self, sample: &str) -> bool {
        self.0.contains_key(sample)
    }

    /// Entities of a sample, sorted and deduplicated
    pub fn entities(&self, sample: &str) -> Option<Vec<String>> {
        self.0.get(sample).map(|list| {
            let mut sorted = list.clone();
            sorted.sort();
            sorted.dedup();
            sorted
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything the viewer knows about a report. Loaded once, never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default, rename = "samples")]
    pub groups: GroupIndex,
    #[serde(default, rename = "summary_data")]
    pub records: Vec<QualityRecord>,
}

impl ReportData {
    pub fn new(records: Vec<QualityRecord>, groups: GroupIndex) -> Self {
        Self { groups, records }
    }

    /// Build the data with a group index derived from the records themselves
    pub fn from_records(records: Vec<QualityRecord>) -> Self {
        let groups = GroupIndex::from_records(&records);
        Self { groups, records }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let data = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            records = data.records.len(),
            samples = data.groups.len(),
            "loaded report data"
        );
        Ok(data)
    }

    /// Distinct taxonomic levels, GUNC ranks first, unknown levels after
    pub fn taxonomic_levels(&self) -> Vec<String> {
        let present: BTreeSet<&str> = self
            .records
            .iter()
            .map(|r| r.taxonomic_level.as_str())
            .collect();

        let mut levels: Vec<String> = TAXONOMIC_RANKS
            .iter()
            .filter(|rank| present.contains(*rank))
            .map(|rank| rank.to_string())
            .collect();
        levels.extend(
            present
                .iter()
                .filter(|l| !TAXONOMIC_RANKS.contains(l))
                .map(|l| l.to_string()),
        );
        levels
    }

    pub fn default_level(&self) -> Option<String> {
        self.taxonomic_levels().into_iter().next()
    }

    /// Every sample id in the records, sorted. Used as the color domain so a
    /// sample keeps its color whatever the filters.
    pub fn sample_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.sample_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
