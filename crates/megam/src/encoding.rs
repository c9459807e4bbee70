//! Feature encodings.
//!
//! A [`FeatureEncoding`] turns a (feature-set, label) pair into the sparse
//! vector megam trains on. General-purpose encoders live with the classifier
//! that owns them; this module defines the seam plus [`TableEncoding`], an
//! encoding over instances that already carry their per-label vectors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MegamError, Result};

/// A sparse feature vector: `(feature id, value)` pairs in encoding order.
pub type FeatureVector = Vec<(usize, f64)>;

/// Maps labeled feature-sets to sparse feature vectors.
pub trait FeatureEncoding {
    /// The raw per-instance input.
    type FeatureSet;
    /// The class label type.
    type Label: PartialEq + std::fmt::Debug;

    /// All labels, in the fixed order used for label indices and explicit blocks.
    fn labels(&self) -> &[Self::Label];

    /// Encode `featureset` as if it were labeled `label`.
    fn encode(&self, featureset: &Self::FeatureSet, label: &Self::Label) -> FeatureVector;

    /// Total number of distinct feature ids this encoding can produce.
    fn length(&self) -> usize;

    /// Cost of predicting `candidate` when the true label is `gold`.
    ///
    /// Encodings without a cost model return `None`.
    fn cost(
        &self,
        _featureset: &Self::FeatureSet,
        _gold: &Self::Label,
        _candidate: &Self::Label,
    ) -> Option<f64> {
        None
    }
}

/// An instance whose encoded vectors were computed ahead of time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableInstance {
    /// Encoded vector for each candidate label.
    pub features: BTreeMap<String, FeatureVector>,

    /// Optional cost of predicting each label for this instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs: Option<BTreeMap<String, f64>>,
}

/// One line of a JSON-lines training file.
///
/// ```json
/// {"label": "pos", "features": {"pos": [[0, 1], [2, 1]], "neg": [[1, 1], [3, 1]]}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub label: String,
    #[serde(flatten)]
    pub instance: TableInstance,
}

/// Encoding backed by precomputed per-label vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEncoding {
    labels: Vec<String>,
    length: usize,
}

impl TableEncoding {
    /// Create an encoding with an explicit label order and feature count.
    pub fn new(labels: Vec<String>, length: usize) -> Result<Self> {
        if labels.is_empty() {
            return Err(MegamError::InvalidConfig(
                "an encoding needs at least one label".to_string(),
            ));
        }
        if let Some(dup) = labels
            .iter()
            .enumerate()
            .find(|(i, l)| labels[..*i].contains(l))
            .map(|(_, l)| l)
        {
            return Err(MegamError::InvalidConfig(format!("duplicate label '{dup}'")));
        }
        Ok(Self { labels, length })
    }

    /// Derive an encoding from training records.
    ///
    /// Labels are taken in order of first appearance (gold labels and the
    /// keys of each instance's feature table) unless `labels` is given. The
    /// feature count is one past the largest id seen unless `length` is given.
    pub fn from_records(
        records: &[TrainingRecord],
        labels: Option<Vec<String>>,
        length: Option<usize>,
    ) -> Result<Self> {
        let labels = match labels {
            Some(labels) => labels,
            None => {
                let mut seen: Vec<String> = Vec::new();
                for record in records {
                    let names =
                        std::iter::once(&record.label).chain(record.instance.features.keys());
                    for name in names {
                        if !seen.contains(name) {
                            seen.push(name.clone());
                        }
                    }
                }
                seen
            }
        };

        let max_id = records
            .iter()
            .flat_map(|r| r.instance.features.values())
            .flat_map(|v| v.iter().map(|(id, _)| *id))
            .max();
        let observed = max_id.map_or(0, |id| id + 1);

        let length = match length {
            Some(n) if n < observed => {
                return Err(MegamError::InvalidConfig(format!(
                    "feature count {n} is smaller than the largest feature id {}",
                    observed - 1
                )));
            }
            Some(n) => n,
            None => observed,
        };

        Self::new(labels, length)
    }
}

impl FeatureEncoding for TableEncoding {
    type FeatureSet = TableInstance;
    type Label = String;

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn encode(&self, featureset: &TableInstance, label: &String) -> FeatureVector {
        featureset.features.get(label).cloned().unwrap_or_default()
    }

    fn length(&self) -> usize {
        self.length
    }

    fn cost(&self, featureset: &TableInstance, _gold: &String, candidate: &String) -> Option<f64> {
        featureset.costs.as_ref()?.get(candidate).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> TrainingRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_record_from_json() {
        let r = record(r#"{"label": "pos", "features": {"pos": [[0, 1]], "neg": [[1, 1.5]]}}"#);
        assert_eq!(r.label, "pos");
        assert_eq!(r.instance.features["neg"], vec![(1, 1.5)]);
        assert!(r.instance.costs.is_none());
    }

    #[test]
    fn test_labels_in_first_appearance_order() {
        let records = vec![
            record(r#"{"label": "b", "features": {"b": [[0, 1]]}}"#),
            record(r#"{"label": "a", "features": {"a": [[1, 1]], "c": [[4, 1]]}}"#),
        ];
        let enc = TableEncoding::from_records(&records, None, None).unwrap();
        assert_eq!(enc.labels(), ["b", "a", "c"]);
        assert_eq!(enc.length(), 5);
    }

    #[test]
    fn test_explicit_length_too_small() {
        let records = vec![record(r#"{"label": "a", "features": {"a": [[9, 1]]}}"#)];
        let result = TableEncoding::from_records(&records, None, Some(3));
        assert!(matches!(result, Err(MegamError::InvalidConfig(_))));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let result = TableEncoding::new(vec!["x".into(), "x".into()], 1);
        assert!(result.unwrap_err().to_string().contains("duplicate label 'x'"));
    }

    #[test]
    fn test_encode_missing_label_is_empty() {
        let enc = TableEncoding::new(vec!["a".into(), "b".into()], 2).unwrap();
        let inst = record(r#"{"label": "a", "features": {"a": [[0, 1]]}}"#).instance;
        assert!(enc.encode(&inst, &"b".to_string()).is_empty());
    }

    #[test]
    fn test_cost_lookup() {
        let enc = TableEncoding::new(vec!["a".into(), "b".into()], 2).unwrap();
        let inst = record(
            r#"{"label": "a", "features": {"a": [[0, 1]]}, "costs": {"a": 0, "b": 2.5}}"#,
        )
        .instance;
        assert_eq!(enc.cost(&inst, &"a".into(), &"b".into()), Some(2.5));

        let without = TableInstance::default();
        assert_eq!(enc.cost(&without, &"a".into(), &"b".into()), None);
    }
}
