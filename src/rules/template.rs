//! Reason templates rendered against a feature vector
//!
//! Placeholders are `{metric}` or `{metric:.Nf}`; `{{` and `}}` produce
//! literal braces. Without a precision, counts render as integers, flags as
//! `true`/`false` and real values in their shortest form. A template with an
//! unknown metric or a malformed placeholder is returned verbatim.

use super::{Metric, MetricKind};
use crate::FeatureVector;

/// Render `template` with values from `features`
pub fn render(template: &str, features: &FeatureVector) -> String {
    try_render(template, features).unwrap_or_else(|| template.to_string())
}

fn try_render(template: &str, features: &FeatureVector) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut placeholder = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        ch => placeholder.push(ch),
                    }
                }
                out.push_str(&render_placeholder(&placeholder, features)?);
            }
            '}' => return None,
            _ => out.push(c),
        }
    }
    Some(out)
}

fn render_placeholder(placeholder: &str, features: &FeatureVector) -> Option<String> {
    let (name, spec) = match placeholder.split_once(':') {
        Some((name, spec)) => (name, Some(spec)),
        None => (placeholder, None),
    };
    let metric = Metric::from_name(name.trim())?;
    let value = features.metric(metric);

    match spec {
        Some(spec) => {
            let digits = spec.strip_prefix('.')?.strip_suffix('f')?;
            let precision: usize = digits.parse().ok()?;
            Some(format!("{:.*}", precision, value))
        }
        None => Some(match metric.kind() {
            MetricKind::Flag => (value != 0.0).to_string(),
            MetricKind::Count => format!("{}", value.round() as i64),
            MetricKind::Real => format!("{}", value),
        }),
    }
}
