//! Line diffs for rendered manifests.
//!
//! This module provides:
//! - LCS line alignment and edit opcodes (`lcs` submodule)
//! - Unified diff rendering with hunk grouping (`unified` submodule)
//! - The before/after manifest diff report (`report` submodule)

pub mod lcs;
pub mod report;
pub mod unified;

pub use report::{collect_manifest_diffs, ChangeKind, DiffRecord, DiffReport};
pub use unified::{split_lines, unified_diff, UnifiedDiff, DEFAULT_CONTEXT};
