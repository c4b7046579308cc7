//! Rule conditions over a closed operator set
//!
//! A condition reads as JSON like
//! `{ "metric": "geometry_window_count", "op": ">=", "value": 6, "weight": 2 }`.
//! `between` takes optional `min`/`max` bounds (inclusive, open-ended when
//! absent) and `in` takes a `values` list. Any other operator string is a
//! deserialization error.

use serde::{Deserialize, Serialize};

use super::Metric;
use crate::{AnalysisError, Result};

/// Comparison operand; booleans compare as 1/0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Flag(bool),
    Number(f64),
}

impl Operand {
    pub fn value(self) -> f64 {
        match self {
            Operand::Flag(flag) => f64::from(u8::from(flag)),
            Operand::Number(number) => number,
        }
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Number(value)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Flag(value)
    }
}

/// Operator with its typed operands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Comparison {
    #[serde(rename = ">=")]
    AtLeast { value: Operand },
    #[serde(rename = "<=")]
    AtMost { value: Operand },
    #[serde(rename = ">")]
    GreaterThan { value: Operand },
    #[serde(rename = "<")]
    LessThan { value: Operand },
    #[serde(rename = "==")]
    Equal { value: Operand },
    #[serde(rename = "!=")]
    NotEqual { value: Operand },
    #[serde(rename = "between")]
    Between {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    #[serde(rename = "in")]
    OneOf { values: Vec<Operand> },
}

impl Comparison {
    pub fn matches(&self, value: f64) -> bool {
        match self {
            Comparison::AtLeast { value: target } => value >= target.value(),
            Comparison::AtMost { value: target } => value <= target.value(),
            Comparison::GreaterThan { value: target } => value > target.value(),
            Comparison::LessThan { value: target } => value < target.value(),
            Comparison::Equal { value: target } => value == target.value(),
            Comparison::NotEqual { value: target } => value != target.value(),
            Comparison::Between { min, max } => {
                min.map_or(true, |lo| value >= lo) && max.map_or(true, |hi| value <= hi)
            }
            Comparison::OneOf { values } => values.iter().any(|v| v.value() == value),
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Comparison::Between { min: Some(lo), max: Some(hi) } if lo > hi => {
                Err(format!("between with min {} > max {}", lo, hi))
            }
            Comparison::OneOf { values } if values.is_empty() => {
                Err("'in' needs at least one value".to_string())
            }
            _ => Ok(()),
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

/// One weighted test against a metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: Metric,
    #[serde(flatten)]
    pub comparison: Comparison,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Reason template rendered when the condition matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Condition {
    pub fn new(metric: Metric, comparison: Comparison) -> Self {
        Self {
            metric,
            comparison,
            weight: default_weight(),
            reason: None,
        }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub(crate) fn validate(&self, label: &str) -> Result<()> {
        if !self.weight.is_finite() {
            return Err(AnalysisError::invalid_rule(
                label,
                format!("weight on {} is not finite", self.metric),
            ));
        }
        self.comparison
            .validate()
            .map_err(|reason| AnalysisError::invalid_rule(label, format!("{}: {}", self.metric, reason)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threshold_condition() {
        let condition: Condition = serde_json::from_str(
            r#"{ "metric": "geometry_window_count", "op": ">=", "value": 6, "weight": 2.5 }"#,
        )
        .unwrap();
        assert_eq!(condition.metric, Metric::GeometryWindowCount);
        assert_eq!(condition.comparison, Comparison::AtLeast { value: Operand::Number(6.0) });
        assert_eq!(condition.weight, 2.5);
        assert!(condition.reason.is_none());
    }

    #[test]
    fn test_parse_boolean_operand_and_default_weight() {
        let condition: Condition = serde_json::from_str(
            r#"{ "metric": "color_detection_flag", "op": "==", "value": true, "reason": "spots" }"#,
        )
        .unwrap();
        assert_eq!(condition.weight, 1.0);
        assert!(condition.comparison.matches(1.0));
        assert!(!condition.comparison.matches(0.0));
        assert_eq!(condition.reason.as_deref(), Some("spots"));
    }

    #[test]
    fn test_open_ended_between() {
        let condition: Condition =
            serde_json::from_str(r#"{ "metric": "geometry_hull_ratio", "op": "between", "min": 1.1 }"#)
                .unwrap();
        assert!(condition.comparison.matches(1.1));
        assert!(condition.comparison.matches(1e9));
        assert!(!condition.comparison.matches(1.0));
    }

    #[test]
    fn test_membership() {
        let comparison = Comparison::OneOf {
            values: vec![Operand::Number(5.0), Operand::Number(6.0)],
        };
        assert!(comparison.matches(6.0));
        assert!(!comparison.matches(7.0));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let parsed = serde_json::from_str::<Condition>(
            r#"{ "metric": "geometry_window_count", "op": "~=", "value": 6 }"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let parsed = serde_json::from_str::<Condition>(
            r#"{ "metric": "geometry_wobble", "op": ">", "value": 1 }"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validation() {
        let inverted = Condition::new(
            Metric::GeometryArea,
            Comparison::Between { min: Some(10.0), max: Some(1.0) },
        );
        assert!(matches!(
            inverted.validate("breakage"),
            Err(AnalysisError::InvalidRule { .. })
        ));

        let empty = Condition::new(Metric::GeometryWindowCount, Comparison::OneOf { values: vec![] });
        assert!(empty.validate("normal").is_err());

        let heavy = Condition::new(Metric::GeometryArea, Comparison::AtLeast { value: 1.0.into() })
            .weight(f64::NAN);
        assert!(heavy.validate("normal").is_err());
    }
}
