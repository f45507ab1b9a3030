//! Date-driven enforcement levels for policies.
//!
//! A policy moves through RECOMMEND, WARNING and BLOCKING as its configured
//! threshold dates pass. Each threshold is checked independently against
//! "now"; nothing forces them into order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Enforcement level of an active policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnforcementLevel {
    /// Violations are reported as suggestions.
    Recommend,

    /// Violations fail CI but may be overridden.
    Warning,

    /// Violations block merging.
    Blocking,
}

impl EnforcementLevel {
    /// Wire name used in results files.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementLevel::Recommend => "RECOMMEND",
            EnforcementLevel::Warning => "WARNING",
            EnforcementLevel::Blocking => "BLOCKING",
        }
    }
}

impl fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnforcementLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECOMMEND" => Ok(EnforcementLevel::Recommend),
            "WARNING" => Ok(EnforcementLevel::Warning),
            "BLOCKING" => Ok(EnforcementLevel::Blocking),
            other => Err(format!("unknown enforcement level: {other}")),
        }
    }
}

/// The three optional threshold dates of a policy, as written in config.
///
/// Values that are not strings (numbers, lists, ...) are dropped on load, and
/// strings that do not parse as dates are ignored at resolution time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnforcementThresholds {
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub in_effect_after: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_warning_after: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_blocking_after: Option<String>,
}

impl EnforcementThresholds {
    /// Resolve the level in force at `now`, or `None` when the policy is inactive.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<EnforcementLevel> {
        let in_effect = parse_threshold(&self.in_effect_after)?;
        if now < in_effect {
            return None;
        }

        let passed = |threshold: &Option<String>| {
            parse_threshold(threshold).is_some_and(|date| now >= date)
        };

        if passed(&self.is_blocking_after) {
            Some(EnforcementLevel::Blocking)
        } else if passed(&self.is_warning_after) {
            Some(EnforcementLevel::Warning)
        } else {
            Some(EnforcementLevel::Recommend)
        }
    }

    /// Describe every pair of present thresholds that is out of order.
    ///
    /// Expected order is `inEffectAfter <= isWarningAfter <= isBlockingAfter`.
    pub fn ordering_issues(&self) -> Vec<String> {
        let named = [
            ("inEffectAfter", parse_threshold(&self.in_effect_after)),
            ("isWarningAfter", parse_threshold(&self.is_warning_after)),
            ("isBlockingAfter", parse_threshold(&self.is_blocking_after)),
        ];

        let mut issues = Vec::new();
        for (i, (earlier_name, earlier)) in named.iter().enumerate() {
            for (later_name, later) in &named[i + 1..] {
                if let (Some(earlier), Some(later)) = (earlier, later) {
                    if earlier > later {
                        issues.push(format!(
                            "{earlier_name} ({earlier}) is after {later_name} ({later})"
                        ));
                    }
                }
            }
        }
        issues
    }
}

fn parse_threshold(raw: &Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref().and_then(parse_threshold_date)
}

/// Parse an ISO-8601 threshold date.
///
/// Accepts RFC 3339 timestamps, naive date-times (read as UTC) and plain
/// dates (midnight UTC). Anything else yields `None`.
pub fn parse_threshold_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_yaml::Value::String(s)) => Some(s),
        _ => None,
    })
}
