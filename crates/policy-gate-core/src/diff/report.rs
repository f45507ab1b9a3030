//! Manifest diff report between a "before" and an "after" render.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::unified::{split_lines, unified_diff, DEFAULT_CONTEXT};
use crate::files::list_yaml_files;

/// How a manifest changed between the two renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    New,
    Deleted,
    NoChange,
    Modified,
}

impl ChangeKind {
    /// Classify from existence flags and line counts.
    pub fn classify(before_exists: bool, after_exists: bool, additions: usize, deletions: usize) -> Self {
        if !before_exists && after_exists {
            ChangeKind::New
        } else if before_exists && !after_exists {
            ChangeKind::Deleted
        } else if additions == 0 && deletions == 0 {
            ChangeKind::NoChange
        } else {
            ChangeKind::Modified
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::New => "🆕 New",
            ChangeKind::Deleted => "🗑️ Deleted",
            ChangeKind::NoChange => "✅ No Change",
            ChangeKind::Modified => "✏️ Modified",
        }
    }
}

/// Diff of one manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    pub filename: String,
    pub before_exists: bool,
    pub after_exists: bool,
    pub additions: usize,
    pub deletions: usize,
    /// Unified diff text, empty when the contents are identical.
    pub diff: String,
    pub kind: ChangeKind,
}

impl DiffRecord {
    /// Compute the record for `filename` from the two file contents.
    pub fn compute(filename: &str, before: Option<&str>, after: Option<&str>) -> Self {
        let before_lines = before.map(split_lines).unwrap_or_default();
        let after_lines = after.map(split_lines).unwrap_or_default();

        let diff = unified_diff(
            &before_lines,
            &after_lines,
            &format!("before/{filename}"),
            &format!("after/{filename}"),
            DEFAULT_CONTEXT,
        );

        let before_exists = before.is_some();
        let after_exists = after.is_some();
        Self {
            filename: filename.to_string(),
            before_exists,
            after_exists,
            additions: diff.additions,
            deletions: diff.deletions,
            diff: diff.text(),
            kind: ChangeKind::classify(before_exists, after_exists, diff.additions, diff.deletions),
        }
    }

    /// Whether the file belongs in the detailed diffs.
    pub fn has_changes(&self) -> bool {
        self.additions > 0 || self.deletions > 0 || !self.before_exists || !self.after_exists
    }

    /// `(service, environment)` from a `<service>-<environment>.yaml` name.
    pub fn service_and_environment(&self) -> (String, String) {
        let stem = self.filename.replace(".yaml", "");
        match stem.rsplit_once('-') {
            Some((service, env)) => (service.to_string(), env.to_string()),
            None => (stem, "unknown".to_string()),
        }
    }

    fn changes_summary(&self) -> Option<String> {
        (self.additions > 0 || self.deletions > 0)
            .then(|| format!("+{} -{}", self.additions, self.deletions))
    }
}

/// Diff every manifest present in either directory, in file name order.
pub fn collect_manifest_diffs(before_dir: &Path, after_dir: &Path) -> Result<Vec<DiffRecord>> {
    let before_files = list_yaml_files(before_dir).with_context(|| format!("list {:?}", before_dir))?;
    let after_files = list_yaml_files(after_dir).with_context(|| format!("list {:?}", after_dir))?;

    let names: BTreeSet<&String> = before_files.keys().chain(after_files.keys()).collect();

    let mut records = Vec::with_capacity(names.len());
    for name in names {
        let before = read_optional(before_files.get(name))?;
        let after = read_optional(after_files.get(name))?;
        records.push(DiffRecord::compute(name, before.as_deref(), after.as_deref()));
    }
    Ok(records)
}

fn read_optional(path: Option<&PathBuf>) -> Result<Option<String>> {
    path.map(|p| std::fs::read_to_string(p).with_context(|| format!("read {:?}", p)))
        .transpose()
}

/// Markdown report over a set of diff records.
pub struct DiffReport<'a> {
    records: &'a [DiffRecord],
}

impl<'a> DiffReport<'a> {
    pub fn new(records: &'a [DiffRecord]) -> Self {
        Self { records }
    }

    fn count(&self, kind: ChangeKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// Render the report as Markdown (no trailing newline).
    pub fn render_markdown(&self) -> String {
        let mut lines: Vec<String> = vec![
            "## 📊 Manifest Changes".to_string(),
            String::new(),
            "This report shows the differences between the current state (base branch) and the proposed changes (PR branch).".to_string(),
            String::new(),
        ];

        if self.records.is_empty() {
            lines.push("⚠️ No manifest files found.".to_string());
            return lines.join("\n");
        }

        lines.push("### Summary".to_string());
        lines.push(String::new());
        lines.push(format!("- **Total manifests:** {}", self.records.len()));
        lines.push(format!(
            "- **Changed:** {}",
            self.records.iter().filter(|r| r.has_changes()).count()
        ));
        lines.push(format!("  - New: {}", self.count(ChangeKind::New)));
        lines.push(format!("  - Modified: {}", self.count(ChangeKind::Modified)));
        lines.push(format!("  - Deleted: {}", self.count(ChangeKind::Deleted)));
        lines.push(String::new());

        lines.push("| Service | Environment | Status | Changes |".to_string());
        lines.push("|---------|-------------|--------|---------|".to_string());
        for record in self.records {
            let (service, env) = record.service_and_environment();
            lines.push(format!(
                "| `{}` | `{}` | {} | {} |",
                service,
                env,
                record.kind.label(),
                record.changes_summary().unwrap_or_default()
            ));
        }
        lines.push(String::new());

        if self.records.iter().any(DiffRecord::has_changes) {
            lines.push("<details>".to_string());
            lines.push("<summary>📝 Detailed Diffs - Click to expand</summary>".to_string());
            lines.push(String::new());

            for record in self.records.iter().filter(|r| r.has_changes()) {
                lines.push(format!("### {}", record.filename));
                lines.push(String::new());
                lines.push(format!("**Status:** {}", record.kind.label()));
                if let Some(changes) = record.changes_summary() {
                    lines.push(format!("**Changes:** {}", changes));
                }
                lines.push(String::new());

                if !record.diff.is_empty() {
                    lines.push("```diff".to_string());
                    lines.push(record.diff.clone());
                    lines.push("```".to_string());
                } else if record.kind == ChangeKind::New {
                    lines.push("_New file created_".to_string());
                } else if record.kind == ChangeKind::Deleted {
                    lines.push("_File deleted_".to_string());
                }
                lines.push(String::new());
            }

            lines.push("</details>".to_string());
        }

        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());
        lines.push(
            "<sub>🤖 This diff is automatically generated. Review carefully before merging.</sub>"
                .to_string(),
        );

        lines.join("\n")
    }
}
