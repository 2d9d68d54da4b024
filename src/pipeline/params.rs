// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Task execution parameters
//!
//! A pipeline carries a set of default parameters that every task inherits;
//! a task may override any of them. Only a fixed set of keys is recognized
//! because the executor consuming the definition understands nothing else.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{FlowError, FlowResult};

/// Recognized parameter keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    /// Only run when the previous run of this task succeeded
    DependsOnPast,
    /// Number of retries before the task is marked failed
    Retries,
    /// Delay between retries
    RetryDelay,
    /// Send a notification when the task fails
    NotifyOnFailure,
    /// Send a notification when the task is retried
    NotifyOnRetry,
}

impl ParamKey {
    pub const ALL: [ParamKey; 5] = [
        Self::DependsOnPast,
        Self::Retries,
        Self::RetryDelay,
        Self::NotifyOnFailure,
        Self::NotifyOnRetry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependsOnPast => "depends_on_past",
            Self::Retries => "retries",
            Self::RetryDelay => "retry_delay",
            Self::NotifyOnFailure => "notify_on_failure",
            Self::NotifyOnRetry => "notify_on_retry",
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Self::Retries => "a non-negative integer",
            Self::RetryDelay => "a duration",
            _ => "a boolean",
        }
    }

    /// Check that `value` has the kind this key accepts
    fn check(&self, value: &ParamValue) -> FlowResult<()> {
        let ok = match (self, value) {
            (Self::Retries, ParamValue::Int(n)) => *n >= 0 && *n <= u32::MAX as i64,
            (Self::RetryDelay, ParamValue::Duration(_)) => true,
            (Self::DependsOnPast | Self::NotifyOnFailure | Self::NotifyOnRetry, ParamValue::Bool(_)) => true,
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(FlowError::InvalidParameter {
                key: self.as_str().to_string(),
                expected: self.expected().to_string(),
                found: value.to_string(),
            })
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown parameter: {}", s))
    }
}

/// A parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Duration(Duration),
}

impl ParamValue {
    /// Convert a YAML scalar into a parameter value.
    ///
    /// Strings are read as humantime durations (`5m`, `1h 30m`).
    pub fn from_yaml(key: &str, value: &serde_yaml::Value) -> FlowResult<Self> {
        match value {
            serde_yaml::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_yaml::Value::Number(n) => n.as_i64().map(Self::Int).ok_or_else(|| {
                FlowError::InvalidParameter {
                    key: key.to_string(),
                    expected: "an integer".into(),
                    found: n.to_string(),
                }
            }),
            serde_yaml::Value::String(s) => humantime::parse_duration(s)
                .map(Self::Duration)
                .map_err(|e| FlowError::InvalidParameter {
                    key: key.to_string(),
                    expected: "a duration like '5m' or '30s'".into(),
                    found: format!("'{}' ({})", s, e),
                }),
            other => Err(FlowError::InvalidParameter {
                key: key.to_string(),
                expected: "a boolean, integer or duration".into(),
                found: format!("{:?}", other),
            }),
        }
    }

    /// YAML form used when saving definitions
    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            Self::Bool(b) => serde_yaml::Value::Bool(*b),
            Self::Int(n) => serde_yaml::Value::Number((*n).into()),
            Self::Duration(d) => serde_yaml::Value::String(humantime::format_duration(*d).to_string()),
        }
    }

    /// JSON form used in the executor hand-off
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Duration(d) => serde_json::Value::from(d.as_secs_f64()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Duration(d) => write!(f, "{}", humantime::format_duration(*d)),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<Duration> for ParamValue {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// Parameters keyed by name, as written by a definition author
pub type RawParams = BTreeMap<String, ParamValue>;

/// Build raw parameters from `(name, value)` pairs
pub fn raw_params<I, K, V>(pairs: I) -> RawParams
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<ParamValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A checked set of parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskParams {
    values: BTreeMap<ParamKey, ParamValue>,
}

impl TaskParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check raw parameters. `owner` names the pipeline or task in errors.
    pub fn from_raw(owner: &str, raw: &RawParams) -> FlowResult<Self> {
        let mut params = Self::new();
        for (name, value) in raw {
            let key: ParamKey = name.parse().map_err(|_| FlowError::UnknownParameter {
                owner: owner.to_string(),
                key: name.clone(),
            })?;
            params.set(key, *value)?;
        }
        Ok(params)
    }

    pub fn set(&mut self, key: ParamKey, value: ParamValue) -> FlowResult<()> {
        key.check(&value)?;
        self.values.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: ParamKey) -> Option<&ParamValue> {
        self.values.get(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamKey, &ParamValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Defaults merged with `overrides`; the override wins on collision
    pub fn merged_with(&self, overrides: &TaskParams) -> TaskParams {
        let mut values = self.values.clone();
        values.extend(overrides.values.iter().map(|(k, v)| (*k, *v)));
        TaskParams { values }
    }

    pub fn depends_on_past(&self) -> Option<bool> {
        self.flag(ParamKey::DependsOnPast)
    }

    pub fn retries(&self) -> Option<u32> {
        match self.get(ParamKey::Retries) {
            Some(ParamValue::Int(n)) => u32::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn retry_delay(&self) -> Option<Duration> {
        match self.get(ParamKey::RetryDelay) {
            Some(ParamValue::Duration(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn notify_on_failure(&self) -> Option<bool> {
        self.flag(ParamKey::NotifyOnFailure)
    }

    pub fn notify_on_retry(&self) -> Option<bool> {
        self.flag(ParamKey::NotifyOnRetry)
    }

    fn flag(&self, key: ParamKey) -> Option<bool> {
        match self.get(key) {
            Some(ParamValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Name-keyed form, for saving and export
    pub fn to_raw(&self) -> RawParams {
        self.iter()
            .map(|(k, v)| (k.as_str().to_string(), *v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let defaults = TaskParams::from_raw("example", &raw_params([("retries", 1i64)])).unwrap();
        let overrides = TaskParams::from_raw("t2", &raw_params([("retries", 3i64)])).unwrap();

        assert_eq!(defaults.merged_with(&overrides).retries(), Some(3));
        assert_eq!(defaults.merged_with(&TaskParams::new()).retries(), Some(1));
    }

    #[test]
    fn test_merge_keeps_unrelated_defaults() {
        let mut defaults = TaskParams::new();
        defaults.set(ParamKey::Retries, ParamValue::Int(1)).unwrap();
        defaults
            .set(ParamKey::RetryDelay, Duration::from_secs(300).into())
            .unwrap();
        let mut overrides = TaskParams::new();
        overrides.set(ParamKey::DependsOnPast, true.into()).unwrap();

        let merged = defaults.merged_with(&overrides);
        assert_eq!(merged.retry_delay(), Some(Duration::from_secs(300)));
        assert_eq!(merged.depends_on_past(), Some(true));
        assert_eq!(merged.notify_on_retry(), None);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let raw = raw_params([("email", true)]);
        let err = TaskParams::from_raw("t1", &raw).unwrap_err();
        assert!(matches!(err, FlowError::UnknownParameter { ref key, .. } if key == "email"));
    }

    #[test]
    fn test_value_kind_checked() {
        let mut params = TaskParams::new();
        assert!(matches!(
            params.set(ParamKey::Retries, ParamValue::Int(-1)),
            Err(FlowError::InvalidParameter { .. })
        ));
        assert!(matches!(
            params.set(ParamKey::NotifyOnFailure, ParamValue::Int(1)),
            Err(FlowError::InvalidParameter { .. })
        ));
        assert!(params.is_empty());
    }

    #[test]
    fn test_from_yaml_scalars() {
        let v: serde_yaml::Value = serde_yaml::from_str("5m").unwrap();
        assert_eq!(
            ParamValue::from_yaml("retry_delay", &v).unwrap(),
            ParamValue::Duration(Duration::from_secs(300))
        );

        let v: serde_yaml::Value = serde_yaml::from_str("3").unwrap();
        assert_eq!(ParamValue::from_yaml("retries", &v).unwrap(), ParamValue::Int(3));

        let v: serde_yaml::Value = serde_yaml::from_str("not a duration").unwrap();
        assert!(ParamValue::from_yaml("retry_delay", &v).is_err());
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!("retry_delay".parse::<ParamKey>().unwrap(), ParamKey::RetryDelay);
        assert!("queue".parse::<ParamKey>().is_err());
    }
}
