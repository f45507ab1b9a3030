//! policy-gate evaluation
//!
//! Runs OPA policies against rendered Kubernetes manifests:
//! - Invokes the policy engine once per policy and resource
//! - Applies the fail-open or fail-closed policy on engine errors
//! - Builds kustomize overlays for the local test harness

pub mod engine;
pub mod evaluator;
pub mod harness;
pub mod kustomize;
pub mod manifest;
pub mod settings;

pub use engine::{parse_engine_output, EngineError, OpaEngine, PolicyEngine, PolicyModule};
pub use evaluator::{check_resource, PolicyEvaluator, Verdict};
pub use harness::{HarnessError, LocalHarness, LocalOutcome, LocalTest};
pub use kustomize::{BuildError, KustomizeBuilder, ManifestBuilder};
pub use manifest::{load_manifests, split_documents, ManifestFile, Resource};
pub use settings::{BuildSettings, EngineSettings, FailureMode};
