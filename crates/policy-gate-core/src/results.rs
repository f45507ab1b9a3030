//! Evaluation result records and the persisted results artifact.
//!
//! The artifact is `{"results": [...]}` with one record per
//! (policy, manifest, resource), in evaluation order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::enforcement::EnforcementLevel;

/// Which policies a run evaluates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Only policies currently at BLOCKING level.
    Blocking,

    /// Every active policy.
    All,
}

impl EvaluationMode {
    /// Mode name as used on the command line and in artifact names.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationMode::Blocking => "blocking",
            EvaluationMode::All => "all",
        }
    }

    /// Whether a policy at `level` takes part in this mode.
    pub fn includes(&self, level: EnforcementLevel) -> bool {
        match self {
            EvaluationMode::Blocking => level == EnforcementLevel::Blocking,
            EvaluationMode::All => true,
        }
    }

    /// Default artifact name, `policy-results-<mode>.json`.
    pub fn results_filename(&self) -> PathBuf {
        PathBuf::from(format!("policy-results-{}.json", self.as_str()))
    }
}

/// Kind and name of a Kubernetes resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Outcome of one policy against one resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub policy_key: String,
    pub policy_name: String,
    pub level: EnforcementLevel,
    pub manifest: String,
    pub resource: ResourceRef,
    pub passed: bool,
    pub violations: Vec<String>,
}

/// The persisted results artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultSet {
    pub results: Vec<EvaluationResult>,
}

impl ResultSet {
    pub fn new(results: Vec<EvaluationResult>) -> Self {
        Self { results }
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }
}

/// Write the results artifact as pretty JSON.
pub fn write_results_json(path: &Path, results: &ResultSet) -> Result<()> {
    let content = serde_json::to_string_pretty(results).context("serialize policy results")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
