//! Declarative classification rules
//!
//! Rules are data: a [`RuleSet`] deserialized from JSON (or the built-in
//! [`default_rule_set`]) is validated once and then evaluated by a
//! [`RuleEngine`] against each [`crate::FeatureVector`].

pub mod condition;
pub mod engine;
pub mod metric;
pub mod template;

pub use condition::{Comparison, Condition, Operand};
pub use engine::{
    default_rule_set, title_case, Decision, FallbackLabels, Rule, RuleEngine, RuleSet, SelectionMode,
};
pub use metric::{Metric, MetricKind};
