//! Markdown compliance report for pull requests.
//!
//! Input is the results artifact written by the evaluator. It is read
//! leniently: a missing file is an empty run, and missing fields take
//! defaults, so hand-edited or older artifacts still render.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::enforcement::EnforcementLevel;
use crate::results::EvaluationResult;

/// Passed checks listed before the rest are collapsed into a count.
pub const MAX_PASSED_DISPLAY: usize = 20;

/// One result as seen by the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub policy_name: String,
    /// `None` when the artifact carries an unrecognised level.
    pub level: Option<EnforcementLevel>,
    pub manifest: String,
    pub kind: String,
    pub name: String,
    pub passed: bool,
    pub violations: Vec<String>,
}

impl ReportEntry {
    /// Read one record of the `results` array.
    pub fn from_value(value: &Value) -> Self {
        let text = |v: Option<&Value>, default: &str| {
            v.and_then(Value::as_str).unwrap_or(default).to_string()
        };
        let resource = value.get("resource");

        Self {
            policy_name: text(value.get("policyName"), "Unknown Policy"),
            level: value
                .get("level")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
            manifest: text(value.get("manifest"), "unknown"),
            kind: text(resource.and_then(|r| r.get("kind")), "Unknown"),
            name: text(resource.and_then(|r| r.get("name")), "unknown"),
            passed: value.get("passed").map_or(true, is_truthy),
            violations: value
                .get("violations")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|v| match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    fn resource_id(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }

    fn is_failing_at(&self, level: EnforcementLevel) -> bool {
        !self.passed && self.level == Some(level)
    }
}

impl From<&EvaluationResult> for ReportEntry {
    fn from(result: &EvaluationResult) -> Self {
        Self {
            policy_name: result.policy_name.clone(),
            level: Some(result.level),
            manifest: result.manifest.clone(),
            kind: result.resource.kind.clone(),
            name: result.resource.name.clone(),
            passed: result.passed,
            violations: result.violations.clone(),
        }
    }
}

/// A present `passed` value counts as passed only when truthy, so an explicit
/// `null` is a failure.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Parse a results artifact document into report entries.
pub fn entries_from_json(doc: &Value) -> Vec<ReportEntry> {
    doc.get("results")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(ReportEntry::from_value).collect())
        .unwrap_or_default()
}

/// Load report entries from disk. A missing file yields no entries.
pub fn load_entries(path: &Path) -> Result<Vec<ReportEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    let doc: Value =
        serde_json::from_str(&text).with_context(|| format!("parse {:?} as JSON", path))?;
    Ok(entries_from_json(&doc))
}

/// Overall verdict, by severity precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    Blocked,
    Warning,
    Recommendations,
    Passed,
}

impl OverallStatus {
    /// Compute the status of a set of entries.
    pub fn of(entries: &[ReportEntry]) -> Self {
        let failing = |level| entries.iter().any(|e| e.is_failing_at(level));

        if failing(EnforcementLevel::Blocking) {
            OverallStatus::Blocked
        } else if failing(EnforcementLevel::Warning) {
            OverallStatus::Warning
        } else if failing(EnforcementLevel::Recommend) {
            OverallStatus::Recommendations
        } else {
            OverallStatus::Passed
        }
    }

    /// Badge text used in the report header.
    pub fn badge(&self) -> &'static str {
        match self {
            OverallStatus::Blocked => "🚫 **BLOCKED**",
            OverallStatus::Warning => "⚠️ **WARNING**",
            OverallStatus::Recommendations => "💡 **RECOMMENDATIONS**",
            OverallStatus::Passed => "✅ **PASSED**",
        }
    }
}

/// Compliance report over a set of entries.
pub struct ComplianceReport<'a> {
    entries: &'a [ReportEntry],
}

impl<'a> ComplianceReport<'a> {
    pub fn new(entries: &'a [ReportEntry]) -> Self {
        Self { entries }
    }

    pub fn status(&self) -> OverallStatus {
        OverallStatus::of(self.entries)
    }

    pub fn passed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.passed).count()
    }

    fn failing(&self, level: EnforcementLevel) -> Vec<&'a ReportEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_failing_at(level))
            .collect()
    }

    /// Render the report as Markdown (no trailing newline).
    pub fn render_markdown(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push("## 🔍 Policy Compliance Report".to_string());
        lines.push(String::new());
        lines.push(format!("**Status:** {}", self.status().badge()));
        lines.push(String::new());
        lines.push(format!(
            "**Summary:** {}/{} checks passed",
            self.passed_count(),
            self.entries.len()
        ));
        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());

        self.push_violations_section(
            &mut lines,
            EnforcementLevel::Blocking,
            "🚫",
            "Blocking Issues",
            "These violations must be fixed before merging.",
        );
        self.push_violations_section(
            &mut lines,
            EnforcementLevel::Warning,
            "⚠️",
            "Warnings",
            "These violations cause CI to fail but can be overridden.",
        );

        let recommendations = self.failing(EnforcementLevel::Recommend);
        if !recommendations.is_empty() {
            lines.push("<details>".to_string());
            lines.push(format!(
                "<summary>💡 Recommendations ({}) - Click to expand</summary>",
                recommendations.len()
            ));
            lines.push(String::new());
            lines.push("These are suggestions for improvement and don't block merging.".to_string());
            lines.push(String::new());
            for entry in recommendations {
                push_violation_entry(&mut lines, "💡", entry);
            }
            lines.push("</details>".to_string());
            lines.push(String::new());
        }

        self.push_passed_checks(&mut lines);

        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());
        lines.push("<sub>🤖 This report is automatically generated. To override a policy, use the override comment specified in the policy configuration.</sub>".to_string());

        lines.join("\n")
    }

    fn push_violations_section(
        &self,
        lines: &mut Vec<String>,
        level: EnforcementLevel,
        emoji: &str,
        title: &str,
        description: &str,
    ) {
        let failing = self.failing(level);
        if failing.is_empty() {
            return;
        }

        lines.push(format!("### {} {} ({})", emoji, title, failing.len()));
        lines.push(String::new());
        lines.push(description.to_string());
        lines.push(String::new());
        for entry in failing {
            push_violation_entry(lines, emoji, entry);
        }
    }

    fn push_passed_checks(&self, lines: &mut Vec<String>) {
        let passed: Vec<&ReportEntry> = self.entries.iter().filter(|e| e.passed).collect();
        if passed.is_empty() {
            return;
        }

        lines.push("<details>".to_string());
        lines.push(format!(
            "<summary>✅ Passed Checks ({}) - Click to expand</summary>",
            passed.len()
        ));
        lines.push(String::new());

        for entry in passed.iter().take(MAX_PASSED_DISPLAY) {
            lines.push(format!(
                "- **{}** ✓ `{}` in `{}`",
                entry.policy_name,
                entry.resource_id(),
                entry.manifest
            ));
        }
        if passed.len() > MAX_PASSED_DISPLAY {
            lines.push(String::new());
            lines.push(format!(
                "_... and {} more_",
                passed.len() - MAX_PASSED_DISPLAY
            ));
        }

        lines.push(String::new());
        lines.push("</details>".to_string());
    }
}

fn push_violation_entry(lines: &mut Vec<String>, emoji: &str, entry: &ReportEntry) {
    lines.push(format!("#### {} {}", emoji, entry.policy_name));
    lines.push(format!("- **Resource:** `{}`", entry.resource_id()));
    lines.push(format!("- **Manifest:** `{}`", entry.manifest));
    if !entry.violations.is_empty() {
        lines.push("- **Violations:**".to_string());
        for msg in &entry.violations {
            lines.push(format!("  - {}", msg));
        }
    }
    lines.push(String::new());
}
