//! Policy configuration file.
//!
//! ```yaml
//! policies:
//!   ha:
//!     name: High availability
//!     filePath: ha.opa
//!     enforcement:
//!       inEffectAfter: "2024-01-01"
//!       isWarningAfter: "2024-03-01"
//!       isBlockingAfter: "2024-06-01"
//! ```
//!
//! Policies keep the order in which they appear in the file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::enforcement::{EnforcementLevel, EnforcementThresholds};
use crate::error::{GateError, Result};

/// One entry under `policies:`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEntry {
    /// Mapping key of the entry; filled in by the loader.
    #[serde(skip)]
    pub key: String,

    /// Display name (falls back to the key).
    #[serde(default)]
    pub name: Option<String>,

    /// Policy file path, relative to the policies directory.
    #[serde(default)]
    pub file_path: Option<String>,

    /// Enforcement threshold dates.
    #[serde(default)]
    pub enforcement: Option<EnforcementThresholds>,
}

impl PolicyEntry {
    /// Name shown in reports.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }

    /// Thresholds, empty when the entry has no `enforcement` block.
    pub fn thresholds(&self) -> EnforcementThresholds {
        self.enforcement.clone().unwrap_or_default()
    }

    /// Level in force at `now`; `None` means the policy is inactive.
    pub fn level_at(&self, now: DateTime<Utc>) -> Option<EnforcementLevel> {
        self.enforcement.as_ref().and_then(|t| t.resolve(now))
    }

    /// Location of the policy file, or `None` if `filePath` is unset or empty.
    pub fn policy_path(&self, policies_dir: &Path) -> Option<PathBuf> {
        self.file_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| policies_dir.join(p))
    }
}

/// Parsed policy configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyConfig {
    pub policies: Vec<PolicyEntry>,
}

impl PolicyConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse config text. An empty document or missing `policies` key gives
    /// an empty config.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let root = match serde_yaml::from_str::<Value>(text)? {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(root) => root,
            _ => {
                return Err(GateError::Config(
                    "top level must be a mapping".to_string(),
                ))
            }
        };

        let policies = match root.get("policies") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Mapping(policies)) => policies,
            Some(_) => {
                return Err(GateError::Config(
                    "`policies` must be a mapping of policy keys".to_string(),
                ))
            }
        };

        let mut entries = Vec::with_capacity(policies.len());
        for (key, value) in policies {
            let key = match key {
                Value::String(key) => key.clone(),
                other => {
                    return Err(GateError::Config(format!(
                        "policy key must be a string, got {other:?}"
                    )))
                }
            };
            if !value.is_mapping() {
                return Err(GateError::Config(format!(
                    "policy `{key}` must be a mapping"
                )));
            }

            let mut entry: PolicyEntry = serde_yaml::from_value(value.clone())
                .map_err(|e| GateError::Config(format!("policy `{key}`: {e}")))?;
            entry.key = key;
            entries.push(entry);
        }

        Ok(Self { policies: entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcement::parse_threshold_date;

    const SAMPLE: &str = r#"
policies:
  replicas:
    name: Minimum replicas
    filePath: ha.opa
    enforcement:
      inEffectAfter: "2024-01-01"
      isWarningAfter: "2024-03-01"
      isBlockingAfter: "2024-06-01"
    overrideComment: "/override replicas"
  probes:
    filePath: probes.opa
  labels:
    name: Required labels
"#;

    #[test]
    fn preserves_file_order() {
        let config = PolicyConfig::from_yaml_str(SAMPLE).expect("parse config");
        let keys: Vec<&str> = config.policies.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["replicas", "probes", "labels"]);
    }

    #[test]
    fn name_falls_back_to_key() {
        let config = PolicyConfig::from_yaml_str(SAMPLE).expect("parse config");
        assert_eq!(config.policies[0].display_name(), "Minimum replicas");
        assert_eq!(config.policies[1].display_name(), "probes");
    }

    #[test]
    fn missing_enforcement_is_inactive() {
        let config = PolicyConfig::from_yaml_str(SAMPLE).expect("parse config");
        let now = parse_threshold_date("2030-01-01").expect("date");
        assert_eq!(config.policies[0].level_at(now), Some(EnforcementLevel::Blocking));
        assert_eq!(config.policies[1].level_at(now), None);
    }

    #[test]
    fn policy_path_requires_file_path() {
        let config = PolicyConfig::from_yaml_str(SAMPLE).expect("parse config");
        let dir = Path::new("policies");
        assert_eq!(
            config.policies[0].policy_path(dir),
            Some(PathBuf::from("policies/ha.opa"))
        );
        assert_eq!(config.policies[2].policy_path(dir), None);
    }

    #[test]
    fn empty_documents_give_empty_config() {
        assert!(PolicyConfig::from_yaml_str("").expect("empty").policies.is_empty());
        assert!(PolicyConfig::from_yaml_str("other: 1\n")
            .expect("no policies key")
            .policies
            .is_empty());
        assert!(PolicyConfig::from_yaml_str("policies:\n")
            .expect("null policies")
            .policies
            .is_empty());
    }

    #[test]
    fn rejects_structurally_invalid_config() {
        assert!(matches!(
            PolicyConfig::from_yaml_str("- a\n- b\n"),
            Err(GateError::Config(_))
        ));
        assert!(matches!(
            PolicyConfig::from_yaml_str("policies: [a, b]\n"),
            Err(GateError::Config(_))
        ));
        assert!(matches!(
            PolicyConfig::from_yaml_str("policies:\n  ha: just-a-string\n"),
            Err(GateError::Config(_))
        ));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("policy-config.yaml");
        std::fs::write(&path, SAMPLE).expect("write config");

        let config = PolicyConfig::load(&path).expect("load config");
        assert_eq!(config.policies.len(), 3);

        assert!(matches!(
            PolicyConfig::load(&dir.path().join("missing.yaml")),
            Err(GateError::Io(_))
        ));
    }
}
