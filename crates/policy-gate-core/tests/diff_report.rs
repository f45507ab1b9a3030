//! Directory-level tests for the manifest diff report.

use std::path::Path;

use policy_gate_core::{collect_manifest_diffs, ChangeKind, DiffRecord, DiffReport};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).expect("write manifest");
}

fn before_after() -> (TempDir, TempDir) {
    (
        tempfile::tempdir().expect("before dir"),
        tempfile::tempdir().expect("after dir"),
    )
}

#[test]
fn classifies_each_file() {
    let (before, after) = before_after();
    write(before.path(), "api-prod.yaml", "a\nb\n");
    write(after.path(), "api-prod.yaml", "a\nc\n");
    write(before.path(), "old-stg.yaml", "kind: Service\n");
    write(after.path(), "new-stg.yaml", "kind: Deployment\nname: new\n");
    write(before.path(), "same-dev.yaml", "x\n");
    write(after.path(), "same-dev.yaml", "x\n");

    let records = collect_manifest_diffs(before.path(), after.path()).expect("collect");
    let summary: Vec<(&str, ChangeKind, usize, usize)> = records
        .iter()
        .map(|r| (r.filename.as_str(), r.kind, r.additions, r.deletions))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("api-prod.yaml", ChangeKind::Modified, 1, 1),
            ("new-stg.yaml", ChangeKind::New, 2, 0),
            ("old-stg.yaml", ChangeKind::Deleted, 0, 1),
            ("same-dev.yaml", ChangeKind::NoChange, 0, 0),
        ]
    );
}

#[test]
fn ignores_non_yaml_files() {
    let (before, after) = before_after();
    write(before.path(), "README.md", "docs\n");
    write(after.path(), "api-prod.yml", "kind: Service\n");

    let records = collect_manifest_diffs(before.path(), after.path()).expect("collect");
    assert!(records.is_empty());
}

#[test]
fn dot_files_are_diffed() {
    let (before, after) = before_after();
    write(after.path(), ".canary-prod.yaml", "kind: Service\n");

    let records = collect_manifest_diffs(before.path(), after.path()).expect("collect");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].filename, ".canary-prod.yaml");
    assert_eq!(records[0].kind, ChangeKind::New);
}

#[test]
fn missing_before_directory_makes_everything_new() {
    let (before, after) = before_after();
    write(after.path(), "api-prod.yaml", "kind: Service\n");

    let records =
        collect_manifest_diffs(&before.path().join("absent"), after.path()).expect("collect");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ChangeKind::New);
}

#[test]
fn report_has_summary_table_and_details() {
    let (before, after) = before_after();
    write(before.path(), "payment-api-prod.yaml", "replicas: 2\nimage: v1\n");
    write(after.path(), "payment-api-prod.yaml", "replicas: 3\nimage: v1\n");
    write(before.path(), "web-stg.yaml", "x\n");
    write(after.path(), "web-stg.yaml", "x\n");

    let records = collect_manifest_diffs(before.path(), after.path()).expect("collect");
    let md = DiffReport::new(&records).render_markdown();

    assert!(md.starts_with("## 📊 Manifest Changes\n"));
    assert!(md.contains("- **Total manifests:** 2\n- **Changed:** 1\n  - New: 0\n  - Modified: 1\n  - Deleted: 0\n"));
    assert!(md.contains("| `payment-api` | `prod` | ✏️ Modified | +1 -1 |"));
    assert!(md.contains("| `web` | `stg` | ✅ No Change |  |"));
    assert!(md.contains("<summary>📝 Detailed Diffs - Click to expand</summary>"));
    assert!(md.contains(
        "```diff\n--- before/payment-api-prod.yaml\n+++ after/payment-api-prod.yaml\n@@ -1,2 +1,2 @@\n-replicas: 2\n+replicas: 3\n image: v1\n```"
    ));
    assert!(!md.contains("### web-stg.yaml"));
    assert!(md.ends_with(
        "<sub>🤖 This diff is automatically generated. Review carefully before merging.</sub>"
    ));
}

#[test]
fn report_without_changes_has_no_details() {
    let (before, after) = before_after();
    write(before.path(), "web-stg.yaml", "x\n");
    write(after.path(), "web-stg.yaml", "x\n");

    let records = collect_manifest_diffs(before.path(), after.path()).expect("collect");
    let md = DiffReport::new(&records).render_markdown();

    assert!(md.contains("- **Changed:** 0"));
    assert!(!md.contains("<details>"));
}

#[test]
fn empty_new_file_is_reported_as_created() {
    let (before, after) = before_after();
    write(after.path(), "empty-dev.yaml", "");

    let records = collect_manifest_diffs(before.path(), after.path()).expect("collect");
    let md = DiffReport::new(&records).render_markdown();

    assert!(md.contains("### empty-dev.yaml\n\n**Status:** 🆕 New\n\n_New file created_\n"));
}

#[test]
fn large_manifest_rewritten_throughout() {
    let before: String = (0..20_000)
        .map(|i| format!("  helm.sh/chart: app-1.0.0 # {i}\n"))
        .collect();
    let after = before.replace("app-1.0.0 # 0\n", "app-1.1.0 # 0\n").replace(
        "0 # 4",
        "0 # x4",
    );

    let record = DiffRecord::compute("big-prod.yaml", Some(&before), Some(&after));
    let changed = before
        .lines()
        .zip(after.lines())
        .filter(|(b, a)| b != a)
        .count();

    assert!(changed > 1_000);
    assert_eq!(record.kind, ChangeKind::Modified);
    assert_eq!((record.additions, record.deletions), (changed, changed));
    assert!(record.diff.starts_with("--- before/big-prod.yaml\n+++ after/big-prod.yaml\n@@ -1,"));
}
