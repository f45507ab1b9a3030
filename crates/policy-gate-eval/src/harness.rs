//! Local policy test harness.
//!
//! Builds one service/environment overlay, then checks every resource in it
//! against a single policy file, printing progress as it goes.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use policy_gate_core::GateError;

use crate::engine::{PolicyEngine, PolicyModule};
use crate::evaluator::check_resource;
use crate::kustomize::{BuildError, ManifestBuilder};
use crate::manifest::split_documents;
use crate::settings::FailureMode;

/// Which overlay to build and which policy to test it against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTest {
    pub service: String,
    pub environment: String,
    pub policy_path: PathBuf,
}

impl Default for LocalTest {
    fn default() -> Self {
        Self {
            service: "my-app".to_string(),
            environment: "stg".to_string(),
            policy_path: PathBuf::from("policies/ha.opa"),
        }
    }
}

/// Fatal harness errors. Failing checks are not errors; see [`LocalOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Failed to build manifests: {0}")]
    Build(#[from] BuildError),

    #[error("Policy file not found: {}", .0.display())]
    PolicyNotFound(PathBuf),

    #[error("{0}")]
    Policy(GateError),

    #[error("Failed to parse built manifests: {0}")]
    Manifest(GateError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Tally of a harness run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalOutcome {
    pub checked: usize,
    pub failed: usize,
}

impl LocalOutcome {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub struct LocalHarness {
    builder: Arc<dyn ManifestBuilder>,
    engine: Arc<dyn PolicyEngine>,
    failure_mode: FailureMode,
}

impl LocalHarness {
    pub fn new(builder: Arc<dyn ManifestBuilder>, engine: Arc<dyn PolicyEngine>) -> Self {
        Self {
            builder,
            engine,
            failure_mode: FailureMode::default(),
        }
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    /// Build, echo and check the overlay, writing progress to `out`.
    pub async fn run<W: Write>(
        &self,
        test: &LocalTest,
        out: &mut W,
    ) -> Result<LocalOutcome, HarnessError> {
        writeln!(
            out,
            "🔨 Building manifests for {}/{}...",
            test.service, test.environment
        )?;
        let manifest = self.builder.build(&test.service, &test.environment).await?;

        writeln!(out, "📋 Built manifest:")?;
        writeln!(out, "---")?;
        writeln!(out, "{manifest}")?;
        writeln!(out, "---")?;
        writeln!(out)?;
        writeln!(out, "🔍 Testing policy: {}", test.policy_path.display())?;
        writeln!(out)?;

        if !test.policy_path.is_file() {
            return Err(HarnessError::PolicyNotFound(test.policy_path.clone()));
        }
        let module = PolicyModule::load(&test.policy_path).map_err(HarnessError::Policy)?;
        let resources = split_documents(&manifest).map_err(HarnessError::Manifest)?;

        let mut outcome = LocalOutcome::default();
        for resource in &resources {
            writeln!(out, "Testing {}...", resource.reference())?;

            let verdict =
                check_resource(self.engine.as_ref(), self.failure_mode, &module, resource).await;
            outcome.checked += 1;

            if verdict.passed {
                writeln!(out, "  ✅ Passed")?;
            } else {
                outcome.failed += 1;
                writeln!(out, "  ❌ Failed:")?;
                for violation in &verdict.violations {
                    writeln!(out, "     - {violation}")?;
                }
            }
            writeln!(out)?;
        }

        if outcome.all_passed() {
            writeln!(out, "✨ All checks passed!")?;
        } else {
            writeln!(out, "❌ Some checks failed!")?;
        }
        Ok(outcome)
    }
}
