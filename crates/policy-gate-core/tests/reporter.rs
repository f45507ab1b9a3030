use policy_gate_core::report::{entries_from_json, MAX_PASSED_DISPLAY};
use policy_gate_core::{
    ComplianceReport, EnforcementLevel, EvaluationResult, OverallStatus, ReportEntry,
    ResourceRef,
};
use serde_json::json;

fn result(level: EnforcementLevel, passed: bool, policy: &str, name: &str) -> EvaluationResult {
    EvaluationResult {
        policy_key: policy.to_lowercase().replace(' ', "-"),
        policy_name: policy.to_string(),
        level,
        manifest: "api-prod".to_string(),
        resource: ResourceRef::new("Deployment", name),
        passed,
        violations: if passed {
            vec![]
        } else {
            vec![format!("{policy} violated by {name}")]
        },
    }
}

fn entries(results: &[EvaluationResult]) -> Vec<ReportEntry> {
    results.iter().map(ReportEntry::from).collect()
}

// ── status precedence ─────────────────────────────────────────────────────

#[test]
fn blocked_when_blocking_fails_even_if_others_pass() {
    let entries = entries(&[
        result(EnforcementLevel::Blocking, false, "Replicas", "api"),
        result(EnforcementLevel::Warning, true, "Probes", "api"),
    ]);
    let report = ComplianceReport::new(&entries);

    assert_eq!(report.status(), OverallStatus::Blocked);
    let md = report.render_markdown();
    assert!(md.contains("**Status:** 🚫 **BLOCKED**"));
    assert!(md.contains("**Summary:** 1/2 checks passed"));
}

#[test]
fn warning_outranks_recommendations() {
    let entries = entries(&[
        result(EnforcementLevel::Warning, false, "Probes", "api"),
        result(EnforcementLevel::Recommend, false, "Labels", "api"),
    ]);
    assert_eq!(OverallStatus::of(&entries), OverallStatus::Warning);
}

#[test]
fn recommendations_only() {
    let entries = entries(&[
        result(EnforcementLevel::Recommend, false, "Labels", "api"),
        result(EnforcementLevel::Blocking, true, "Replicas", "api"),
    ]);
    assert_eq!(OverallStatus::of(&entries), OverallStatus::Recommendations);
}

#[test]
fn passed_iff_every_result_passed() {
    let all_pass = entries(&[
        result(EnforcementLevel::Blocking, true, "Replicas", "api"),
        result(EnforcementLevel::Recommend, true, "Labels", "api"),
    ]);
    assert_eq!(OverallStatus::of(&all_pass), OverallStatus::Passed);
    assert_eq!(OverallStatus::of(&[]), OverallStatus::Passed);
}

// ── rendering ─────────────────────────────────────────────────────────────

#[test]
fn full_report_render_is_stable() {
    let entries = entries_from_json(&json!({
        "results": [
            {
                "policyKey": "replicas",
                "policyName": "Minimum replicas",
                "level": "BLOCKING",
                "manifest": "api-prod",
                "resource": {"kind": "Deployment", "name": "api"},
                "passed": false,
                "violations": ["replicas must be >= 2"]
            },
            {
                "policyKey": "probes",
                "policyName": "Probes",
                "level": "WARNING",
                "manifest": "api-prod",
                "resource": {"kind": "Deployment", "name": "api"},
                "passed": true,
                "violations": []
            }
        ]
    }));

    let expected = [
        "## 🔍 Policy Compliance Report",
        "",
        "**Status:** 🚫 **BLOCKED**",
        "",
        "**Summary:** 1/2 checks passed",
        "",
        "---",
        "",
        "### 🚫 Blocking Issues (1)",
        "",
        "These violations must be fixed before merging.",
        "",
        "#### 🚫 Minimum replicas",
        "- **Resource:** `Deployment/api`",
        "- **Manifest:** `api-prod`",
        "- **Violations:**",
        "  - replicas must be >= 2",
        "",
        "<details>",
        "<summary>✅ Passed Checks (1) - Click to expand</summary>",
        "",
        "- **Probes** ✓ `Deployment/api` in `api-prod`",
        "",
        "</details>",
        "",
        "---",
        "",
        "<sub>🤖 This report is automatically generated. To override a policy, use the override comment specified in the policy configuration.</sub>",
    ]
    .join("\n");

    assert_eq!(ComplianceReport::new(&entries).render_markdown(), expected);
}

#[test]
fn sections_appear_in_severity_order() {
    let entries = entries(&[
        result(EnforcementLevel::Recommend, false, "Labels", "api"),
        result(EnforcementLevel::Warning, false, "Probes", "api"),
        result(EnforcementLevel::Blocking, false, "Replicas", "api"),
        result(EnforcementLevel::Blocking, true, "Replicas", "web"),
    ]);
    let md = ComplianceReport::new(&entries).render_markdown();

    let blocking = md.find("### 🚫 Blocking Issues (1)").expect("blocking section");
    let warnings = md.find("### ⚠️ Warnings (1)").expect("warning section");
    let recommend = md
        .find("<summary>💡 Recommendations (1) - Click to expand</summary>")
        .expect("recommend section");
    let passed = md
        .find("<summary>✅ Passed Checks (1) - Click to expand</summary>")
        .expect("passed section");

    assert!(blocking < warnings);
    assert!(warnings < recommend);
    assert!(recommend < passed);
    assert!(md.contains("#### 💡 Labels"));
    assert!(md.contains("These are suggestions for improvement and don't block merging."));
}

#[test]
fn empty_sections_are_omitted() {
    let entries = entries(&[result(EnforcementLevel::Warning, false, "Probes", "api")]);
    let md = ComplianceReport::new(&entries).render_markdown();

    assert!(!md.contains("Blocking Issues"));
    assert!(!md.contains("Recommendations ("));
    assert!(!md.contains("Passed Checks"));
    assert!(md.contains("**Summary:** 0/1 checks passed"));
}

#[test]
fn passed_checks_are_capped() {
    let results: Vec<EvaluationResult> = (0..MAX_PASSED_DISPLAY + 5)
        .map(|i| result(EnforcementLevel::Recommend, true, "Labels", &format!("svc-{i}")))
        .collect();
    let entries = entries(&results);
    let md = ComplianceReport::new(&entries).render_markdown();

    assert!(md.contains("✅ Passed Checks (25)"));
    assert!(md.contains("`Deployment/svc-19`"));
    assert!(!md.contains("`Deployment/svc-20`"));
    assert!(md.contains("_... and 5 more_"));
}

#[test]
fn exactly_cap_passed_checks_has_no_suffix() {
    let results: Vec<EvaluationResult> = (0..MAX_PASSED_DISPLAY)
        .map(|i| result(EnforcementLevel::Recommend, true, "Labels", &format!("svc-{i}")))
        .collect();
    let entries = entries(&results);
    let md = ComplianceReport::new(&entries).render_markdown();

    assert!(!md.contains("more_"));
}

#[test]
fn failing_entry_without_messages_has_no_violation_list() {
    let entries = entries_from_json(&json!({
        "results": [{"policyName": "Replicas", "level": "BLOCKING", "passed": false}]
    }));
    let md = ComplianceReport::new(&entries).render_markdown();

    assert!(md.contains("#### 🚫 Replicas\n- **Resource:** `Unknown/unknown`\n- **Manifest:** `unknown`\n\n"));
    assert!(!md.contains("**Violations:**"));
}
