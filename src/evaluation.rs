//! Comparison of predicted classes against ground truth
//!
//! Class names are matched case-insensitively. Pairs whose expected or
//! predicted class is not in the class list still count towards the overall
//! accuracy and mismatches, but not towards the per-class tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One prediction that disagrees with the expected class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Position of the pair in the input
    pub index: usize,
    pub expected: String,
    pub predicted: String,
}

/// Totals for one expected class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub total: usize,
    pub hits: usize,
    pub accuracy: f64,
}

/// Accuracy report over a labelled set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub classes: Vec<String>,
    pub total: usize,
    pub hits: usize,
    /// `hits / total`, 0 for an empty set
    pub accuracy: f64,
    pub per_class: BTreeMap<String, ClassStats>,
    /// `confusion[truth][prediction]`, indexed like `classes`
    pub confusion: Vec<Vec<usize>>,
    pub mismatches: Vec<Mismatch>,
}

fn ratio(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

impl EvaluationReport {
    /// Build a report from `(expected, predicted)` class pairs
    pub fn from_pairs<E, P>(classes: &[&str], pairs: impl IntoIterator<Item = (E, P)>) -> Self
    where
        E: AsRef<str>,
        P: AsRef<str>,
    {
        let index_of = |name: &str| classes.iter().position(|c| c.eq_ignore_ascii_case(name));

        let mut total = 0;
        let mut hits = 0;
        let mut per_class: BTreeMap<String, ClassStats> = classes
            .iter()
            .map(|c| (c.to_string(), ClassStats::default()))
            .collect();
        let mut confusion = vec![vec![0usize; classes.len()]; classes.len()];
        let mut mismatches = Vec::new();

        for (index, (expected, predicted)) in pairs.into_iter().enumerate() {
            let (expected, predicted) = (expected.as_ref(), predicted.as_ref());
            let hit = expected.eq_ignore_ascii_case(predicted);
            total += 1;
            if hit {
                hits += 1;
            } else {
                mismatches.push(Mismatch {
                    index,
                    expected: expected.to_string(),
                    predicted: predicted.to_string(),
                });
            }

            let Some(truth) = index_of(expected) else {
                continue;
            };
            if let Some(stats) = per_class.get_mut(classes[truth]) {
                stats.total += 1;
                stats.hits += usize::from(hit);
            }
            if let Some(prediction) = index_of(predicted) {
                confusion[truth][prediction] += 1;
            }
        }

        for stats in per_class.values_mut() {
            stats.accuracy = ratio(stats.hits, stats.total);
        }

        Self {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            total,
            hits,
            accuracy: ratio(hits, total),
            per_class,
            confusion,
            mismatches,
        }
    }
}
