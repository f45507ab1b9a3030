//! policy-gate Core Library
//!
//! Domain logic shared by the policy-gate binaries: enforcement levels,
//! policy configuration, result artifacts, and the Markdown reports posted
//! to pull requests.

pub mod config;
pub mod diff;
pub mod enforcement;
pub mod error;
pub mod files;
pub mod report;
pub mod results;
pub mod telemetry;

pub use config::{PolicyConfig, PolicyEntry};
pub use diff::{collect_manifest_diffs, ChangeKind, DiffRecord, DiffReport};
pub use enforcement::{parse_threshold_date, EnforcementLevel, EnforcementThresholds};
pub use error::{GateError, Result};
pub use files::list_yaml_files;
pub use report::{load_entries, ComplianceReport, OverallStatus, ReportEntry};
pub use results::{write_results_json, EvaluationMode, EvaluationResult, ResourceRef, ResultSet};
pub use telemetry::init_tracing;

/// policy-gate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
