//! Weighted rule evaluation
//!
//! Each rule starts at its `base_score` and gains the weight of every
//! matching condition; it fires once the score reaches `min_score`. Among
//! firing rules the winner has the highest score, then the lowest class
//! priority rank, then the lexically smallest label. Without a firing rule
//! the engine falls back to a fixed label, so evaluation always yields a
//! [`Decision`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use super::template::render;
use super::{Comparison, Condition, Metric, Operand};
use crate::constants::classification::{DEFAULT_PRIORITY, FALLBACK_REASON, RULE_SATISFIED_REASON};
use crate::{AnalysisError, FeatureVector, Result};

fn default_min_score() -> f64 {
    1.0
}

/// A labelled set of weighted conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub label: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl Rule {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            conditions: Vec::new(),
            base_score: 0.0,
            min_score: default_min_score(),
            fallback_reason: None,
        }
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn fallback_reason(mut self, reason: impl Into<String>) -> Self {
        self.fallback_reason = Some(reason.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(AnalysisError::invalid_rule(&self.label, "empty label"));
        }
        if !self.base_score.is_finite() || !self.min_score.is_finite() {
            return Err(AnalysisError::invalid_rule(
                &self.label,
                "base_score and min_score must be finite",
            ));
        }
        self.conditions
            .iter()
            .try_for_each(|condition| condition.validate(&self.label))
    }
}

/// Labels used when no rule fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackLabels {
    /// Image not flagged as a potential defect on input
    pub normal: String,
    /// Image flagged as a potential defect on input
    pub candidate: String,
    /// Segmentation found no object
    pub no_object: String,
}

impl Default for FallbackLabels {
    fn default() -> Self {
        Self {
            normal: "normal".to_string(),
            candidate: "rest".to_string(),
            no_object: "rest".to_string(),
        }
    }
}

/// How the winning rule is chosen among firing rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Highest score, then class rank, then label
    #[default]
    BestMatch,
    /// First firing rule in declaration order
    FirstMatch,
}

/// Ordered rules plus the label and class tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    #[serde(rename = "label_rules")]
    pub rules: Vec<Rule>,
    /// Label to class name; unmapped labels use their title-cased form
    pub label_class_map: BTreeMap<String, String>,
    /// Class name (case-insensitive) to rank, lower is more authoritative
    #[serde(rename = "label_priorities")]
    pub class_priorities: BTreeMap<String, i32>,
    pub fallback: FallbackLabels,
    pub selection: SelectionMode,
}

impl Default for RuleSet {
    fn default() -> Self {
        default_rule_set()
    }
}

impl RuleSet {
    /// Rule set without rules; every evaluation falls back
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            label_class_map: BTreeMap::new(),
            class_priorities: BTreeMap::new(),
            fallback: FallbackLabels::default(),
            selection: SelectionMode::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rules.iter().try_for_each(Rule::validate)?;
        for (label, fallback) in [
            ("fallback.normal", &self.fallback.normal),
            ("fallback.candidate", &self.fallback.candidate),
            ("fallback.no_object", &self.fallback.no_object),
        ] {
            if fallback.trim().is_empty() {
                return Err(AnalysisError::invalid_rule(label, "empty fallback label"));
            }
        }
        Ok(())
    }

    /// Class name of `label`
    pub fn class_for(&self, label: &str) -> String {
        self.label_class_map
            .get(label)
            .cloned()
            .unwrap_or_else(|| title_case(label))
    }

    /// Rank of `class_name`, matched case-insensitively
    pub fn priority_of(&self, class_name: &str) -> i32 {
        self.class_priorities
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(class_name))
            .map(|(_, &rank)| rank)
            .unwrap_or(DEFAULT_PRIORITY)
    }

    /// Classes by ascending rank, e.g. `"breakage > color > normal"`
    pub fn priority_chain(&self) -> String {
        let mut classes: Vec<(&String, i32)> =
            self.class_priorities.iter().map(|(name, &rank)| (name, rank)).collect();
        classes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        classes
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

/// Outcome of evaluating one feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub label: String,
    pub class_name: String,
    pub score: f64,
    pub reason: String,
}

impl Decision {
    /// `"<Label>: <reason>"`
    pub fn justification(&self) -> String {
        let detail = if self.reason.is_empty() {
            RULE_SATISFIED_REASON
        } else {
            self.reason.as_str()
        };
        format!("{}: {}", title_case(&self.label), detail)
    }

    pub fn is_fallback(&self) -> bool {
        self.reason == FALLBACK_REASON && self.score == 0.0
    }
}

/// Firing rule with its rank information
struct Candidate {
    decision: Decision,
    priority: i32,
}

/// Stateless evaluator over a fixed rule set
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rule_set: RuleSet,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}

impl RuleEngine {
    pub fn new(rule_set: RuleSet) -> Self {
        Self { rule_set }
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Classify a feature vector; never fails
    pub fn evaluate(&self, features: &FeatureVector) -> Decision {
        if !features.geometry.has_primary_object {
            debug!(file = %features.provenance.filename, "no object, skipping rules");
            return self.fallback(&self.rule_set.fallback.no_object);
        }

        let mut candidates = self
            .rule_set
            .rules
            .iter()
            .filter_map(|rule| self.score_rule(rule, features));

        let winner = match self.rule_set.selection {
            SelectionMode::FirstMatch => candidates.next(),
            SelectionMode::BestMatch => candidates.min_by(rank_candidates),
        };

        match winner {
            Some(candidate) => {
                debug!(
                    label = %candidate.decision.label,
                    score = candidate.decision.score,
                    "rule selected"
                );
                candidate.decision
            }
            None => {
                let label = if features.provenance.has_anomaly_flag {
                    &self.rule_set.fallback.candidate
                } else {
                    &self.rule_set.fallback.normal
                };
                debug!(label = %label, "no rule fired");
                self.fallback(label)
            }
        }
    }

    fn score_rule(&self, rule: &Rule, features: &FeatureVector) -> Option<Candidate> {
        let mut score = rule.base_score;
        let mut reasons = Vec::new();
        for condition in &rule.conditions {
            if condition.comparison.matches(features.metric(condition.metric)) {
                score += condition.weight;
                if let Some(template) = &condition.reason {
                    reasons.push(render(template, features));
                }
            }
        }
        if score < rule.min_score {
            return None;
        }

        let reason = if !reasons.is_empty() {
            reasons.iter().take(2).cloned().collect::<Vec<_>>().join("; ")
        } else {
            rule.fallback_reason
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| RULE_SATISFIED_REASON.to_string())
        };
        let class_name = self.rule_set.class_for(&rule.label);
        let priority = self.rule_set.priority_of(&class_name);

        Some(Candidate {
            decision: Decision {
                label: rule.label.clone(),
                class_name,
                score: (score * 1000.0).round() / 1000.0,
                reason,
            },
            priority,
        })
    }

    fn fallback(&self, label: &str) -> Decision {
        Decision {
            label: label.to_string(),
            class_name: self.rule_set.class_for(label),
            score: 0.0,
            reason: FALLBACK_REASON.to_string(),
        }
    }
}

/// Total order: score descending, rank ascending, label ascending
fn rank_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.decision
        .score
        .total_cmp(&a.decision.score)
        .then_with(|| a.priority.cmp(&b.priority))
        .then_with(|| a.decision.label.cmp(&b.decision.label))
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Built-in rules for breakage, color defects, rest and normal pellets
pub fn default_rule_set() -> RuleSet {
    let at_least = |value: f64| Comparison::AtLeast { value: Operand::Number(value) };
    let below = |value: f64| Comparison::LessThan { value: Operand::Number(value) };
    let is = |flag: bool| Comparison::Equal { value: Operand::Flag(flag) };
    let exactly = |value: f64| Comparison::Equal { value: Operand::Number(value) };

    let rules = vec![
        Rule::new("breakage")
            .condition(
                Condition::new(Metric::GeometryFragmentCount, at_least(1.0))
                    .weight(2.0)
                    .reason("{geometry_fragment_count} broken-off fragments"),
            )
            .condition(
                Condition::new(Metric::GeometryWindowCount, below(6.0))
                    .reason("only {geometry_window_count} windows"),
            )
            .condition(
                Condition::new(Metric::GeometryEdgeDamageRatio, below(0.9))
                    .reason("edge damage ratio {geometry_edge_damage_ratio:.2f}"),
            )
            .condition(
                Condition::new(Metric::GeometryHullRatio, at_least(1.15))
                    .reason("hull ratio {geometry_hull_ratio:.2f}"),
            )
            .min_score(2.0)
            .fallback_reason("broken outline"),
        Rule::new("color")
            .condition(
                Condition::new(Metric::ColorDetectionFlag, is(true))
                    .weight(2.0)
                    .reason("dark spots over {color_spot_area} px"),
            )
            .condition(
                Condition::new(Metric::ColorDarkDelta, at_least(18.0))
                    .reason("dark delta {color_dark_delta:.1f}"),
            )
            .min_score(2.0)
            .fallback_reason("surface discoloration"),
        Rule::new("rest")
            .condition(
                Condition::new(Metric::GeometryHasCenterHole, is(false))
                    .reason("no center hole"),
            )
            .condition(
                Condition::new(
                    Metric::GeometryWindowCount,
                    Comparison::AtMost { value: Operand::Number(2.0) },
                )
                    .reason("{geometry_window_count} windows"),
            )
            .min_score(2.0)
            .fallback_reason("no regular hole pattern"),
        Rule::new("normal")
            .condition(Condition::new(Metric::GeometryWindowCount, exactly(6.0)))
            .condition(Condition::new(Metric::GeometryHasCenterHole, is(true)))
            .condition(Condition::new(Metric::GeometryWindowSymmetryScore, at_least(80.0)))
            .condition(Condition::new(Metric::ColorIssueDetected, is(false)))
            .min_score(4.0)
            .fallback_reason("regular shape"),
    ];

    let label_class_map = [
        ("breakage", "Breakage"),
        ("color", "Color"),
        ("rest", "Rest"),
        ("normal", "Normal"),
    ]
    .into_iter()
    .map(|(label, class)| (label.to_string(), class.to_string()))
    .collect();

    let class_priorities = [("breakage", 1), ("color", 2), ("rest", 3), ("normal", 4)]
        .into_iter()
        .map(|(class, rank)| (class.to_string(), rank))
        .collect();

    RuleSet {
        rules,
        label_class_map,
        class_priorities,
        fallback: FallbackLabels::default(),
        selection: SelectionMode::BestMatch,
    }
}
