//! Structural diff between two canonical rulesets.
//!
//! Equality is structural; the diff exists to show a human what drifted.
//! Rendering comes in a colored variant for terminals and a plain variant
//! for alert messages.

use colored::Colorize;
use serde_json::Value;
use sheriff_github::types::RepoRuleset;

/// One leaf-level difference, addressed by a dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub path: String,
    /// Declared side; `None` when the path only exists upstream.
    pub declared: Option<Value>,
    /// Observed side; `None` when the path only exists in config.
    pub observed: Option<Value>,
}

/// All differences between a declared and an observed ruleset.
#[derive(Debug, Clone, Default)]
pub struct RulesetDiff {
    pub changes: Vec<FieldChange>,
}

impl RulesetDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Human-readable rendering, one line per change.
    #[must_use]
    pub fn render(&self, use_color: bool) -> String {
        let mut output = String::new();
        for change in &self.changes {
            let line = match (&change.declared, &change.observed) {
                (Some(declared), Some(observed)) => format!(
                    "~ {}: {} → {}",
                    change.path,
                    format_value(observed),
                    format_value(declared)
                ),
                (Some(declared), None) => {
                    format!("+ {}: {}", change.path, format_value(declared))
                }
                (None, Some(observed)) => {
                    format!("- {}: {}", change.path, format_value(observed))
                }
                (None, None) => continue,
            };
            if use_color {
                let colored_line = match line.as_bytes()[0] {
                    b'+' => line.green().to_string(),
                    b'-' => line.red().to_string(),
                    _ => line.yellow().to_string(),
                };
                output.push_str(&colored_line);
            } else {
                output.push_str(&line);
            }
            output.push('\n');
        }
        output
    }
}

/// Compare two canonical rulesets. Both sides must already be normalized —
/// sorting happens there, so array comparison here is order-sensitive.
#[must_use]
pub fn diff_rulesets(declared: &RepoRuleset, observed: &RepoRuleset) -> RulesetDiff {
    let declared_value = serde_json::to_value(declared).unwrap_or(Value::Null);
    let observed_value = serde_json::to_value(observed).unwrap_or(Value::Null);

    let mut diff = RulesetDiff::default();
    walk("", &declared_value, &observed_value, &mut diff.changes);
    diff
}

fn walk(path: &str, declared: &Value, observed: &Value, changes: &mut Vec<FieldChange>) {
    match (declared, observed) {
        (Value::Object(d), Value::Object(o)) => {
            let mut keys: Vec<&String> = d.keys().chain(o.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = join(path, key);
                match (d.get(key), o.get(key)) {
                    (Some(dv), Some(ov)) => walk(&child, dv, ov, changes),
                    (Some(dv), None) => changes.push(FieldChange {
                        path: child,
                        declared: Some(dv.clone()),
                        observed: None,
                    }),
                    (None, Some(ov)) => changes.push(FieldChange {
                        path: child,
                        declared: None,
                        observed: Some(ov.clone()),
                    }),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(d), Value::Array(o)) => {
            for idx in 0..d.len().min(o.len()) {
                walk(&format!("{path}[{idx}]"), &d[idx], &o[idx], changes);
            }
            for (idx, extra) in d.iter().enumerate().skip(o.len()) {
                changes.push(FieldChange {
                    path: format!("{path}[{idx}]"),
                    declared: Some(extra.clone()),
                    observed: None,
                });
            }
            for (idx, extra) in o.iter().enumerate().skip(d.len()) {
                changes.push(FieldChange {
                    path: format!("{path}[{idx}]"),
                    declared: None,
                    observed: Some(extra.clone()),
                });
            }
        }
        _ => {
            if declared != observed {
                changes.push(FieldChange {
                    path: path.to_string(),
                    declared: Some(declared.clone()),
                    observed: Some(observed.clone()),
                });
            }
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        Value::Null => "(null)".to_string(),
        Value::Array(arr) if arr.is_empty() => "[]".to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_else(|_| "{...}".to_string()),
        other => other.to_string(),
    }
}
