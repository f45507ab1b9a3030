//! Policy evaluation across rendered manifests.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use policy_gate_core::{
    EvaluationMode, EvaluationResult, GateError, PolicyConfig, PolicyEntry, Result, ResultSet,
};
use tracing::{debug, info, warn};

use crate::engine::{admission_input, EngineError, PolicyEngine, PolicyModule};
use crate::manifest::{load_manifests, ManifestFile, Resource};
use crate::settings::FailureMode;

/// Outcome of checking one resource against one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub violations: Vec<String>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    /// A resource passes exactly when the engine reports no violations.
    pub fn from_violations(violations: Vec<String>) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
        }
    }

    fn engine_failure(mode: FailureMode, err: &EngineError) -> Self {
        match mode {
            FailureMode::Open => Self::pass(),
            FailureMode::Closed => Self {
                passed: false,
                violations: vec![GateError::Engine(err.to_string()).to_string()],
            },
        }
    }
}

/// Run one policy against one resource.
///
/// Engine failures never propagate; `failure_mode` decides the verdict.
pub async fn check_resource(
    engine: &dyn PolicyEngine,
    failure_mode: FailureMode,
    module: &PolicyModule,
    resource: &Resource,
) -> Verdict {
    let outcome = match resource.to_json() {
        Ok(object) => {
            let input = admission_input(&resource.kind, object);
            engine.evaluate(module, &input).await
        }
        Err(e) => Err(EngineError::Input(e.to_string())),
    };

    match outcome {
        Ok(violations) => Verdict::from_violations(violations),
        Err(e) => {
            warn!(
                policy = %module.path.display(),
                resource = %resource.reference(),
                error = %e,
                "Policy engine failed"
            );
            Verdict::engine_failure(failure_mode, &e)
        }
    }
}

/// Evaluates configured policies against a directory of manifests.
pub struct PolicyEvaluator {
    engine: Arc<dyn PolicyEngine>,
    mode: EvaluationMode,
    failure_mode: FailureMode,
    now: DateTime<Utc>,
}

impl PolicyEvaluator {
    pub fn new(engine: Arc<dyn PolicyEngine>, mode: EvaluationMode) -> Self {
        Self {
            engine,
            mode,
            failure_mode: FailureMode::default(),
            now: Utc::now(),
        }
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    /// Resolve enforcement levels as of `now` instead of the wall clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Evaluate every selected policy against every resource.
    ///
    /// Results are ordered by policy (config order), then manifest (filename
    /// order), then resource (document order).
    pub async fn evaluate(
        &self,
        config: &PolicyConfig,
        manifests_dir: &Path,
        policies_dir: &Path,
    ) -> Result<ResultSet> {
        info!(
            mode = self.mode.as_str(),
            policies = config.policies.len(),
            "Starting policy evaluation"
        );

        let mut manifests: Option<Vec<ManifestFile>> = None;
        let mut results = Vec::new();

        for entry in &config.policies {
            for issue in entry.thresholds().ordering_issues() {
                warn!(policy = %entry.key, issue = %issue, "Enforcement thresholds out of order");
            }

            let Some(level) = entry.level_at(self.now) else {
                debug!(policy = %entry.key, "Policy not in effect");
                continue;
            };
            if !self.mode.includes(level) {
                debug!(policy = %entry.key, level = %level, "Policy excluded by mode");
                continue;
            }
            let Some(module) = self.resolve_module(entry, policies_dir) else {
                continue;
            };

            info!(policy = %entry.key, level = %level, "Evaluating policy");

            if manifests.is_none() {
                manifests = Some(load_manifests(manifests_dir)?);
            }

            for manifest in manifests.iter().flatten() {
                for resource in &manifest.resources {
                    let verdict =
                        check_resource(self.engine.as_ref(), self.failure_mode, &module, resource)
                            .await;
                    debug!(
                        policy = %entry.key,
                        manifest = %manifest.name,
                        resource = %resource.reference(),
                        passed = verdict.passed,
                        "Checked resource"
                    );
                    results.push(EvaluationResult {
                        policy_key: entry.key.clone(),
                        policy_name: entry.display_name().to_string(),
                        level,
                        manifest: manifest.name.clone(),
                        resource: resource.reference(),
                        passed: verdict.passed,
                        violations: verdict.violations,
                    });
                }
            }
        }

        let set = ResultSet::new(results);
        info!(
            total = set.results.len(),
            passed = set.passed_count(),
            failed = set.failed_count(),
            "Policy evaluation finished"
        );
        Ok(set)
    }

    fn resolve_module(&self, entry: &PolicyEntry, policies_dir: &Path) -> Option<PolicyModule> {
        let Some(path) = entry.policy_path(policies_dir).filter(|p| p.is_file()) else {
            warn!(
                policy = %entry.key,
                file = entry.file_path.as_deref().unwrap_or(""),
                "Policy file not found, skipping"
            );
            return None;
        };
        match PolicyModule::load(&path) {
            Ok(module) => Some(module),
            Err(e) => {
                warn!(policy = %entry.key, error = %e, "Cannot load policy, skipping");
                None
            }
        }
    }
}
