//! Subprocess settings for the policy engine and the manifest build tool.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What to do when the policy engine cannot produce a verdict.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Treat the resource as passing with no violations.
    #[default]
    Open,

    /// Treat the resource as failing with the engine error as its violation.
    Closed,
}

/// Configuration for policy engine invocations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineSettings {
    /// Command prefix (first element is the executable). The `eval`
    /// arguments are appended to it.
    pub command: Vec<String>,

    /// Per-call timeout in seconds; 0 disables it.
    pub timeout_secs: u64,

    /// Outcome of an engine failure.
    pub failure_mode: FailureMode,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            command: vec!["opa".to_string()],
            timeout_secs: 0,
            failure_mode: FailureMode::Open,
        }
    }
}

impl EngineSettings {
    /// Use a different engine executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.command = vec![program.into()];
        self
    }

    /// Use a full command prefix, e.g. `["sh", "-c", "..."]`.
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    /// Bound each engine call.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Fail resources when the engine errors.
    pub fn fail_closed(mut self) -> Self {
        self.failure_mode = FailureMode::Closed;
        self
    }
}

/// Configuration for the manifest build tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildSettings {
    /// Command prefix (first element is the executable). `build <dir>` is
    /// appended to it.
    pub command: Vec<String>,

    /// Root holding `services/<service>/environments/<environment>`.
    pub manifests_root: PathBuf,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            command: vec!["kustomize".to_string()],
            manifests_root: PathBuf::from("manifests"),
        }
    }
}

impl BuildSettings {
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.command = vec![program.into()];
        self
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    pub fn with_manifests_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.manifests_root = root.into();
        self
    }
}
