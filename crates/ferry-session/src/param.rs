//! Session-level parameters that live beside the engine option table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Recognized session parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionParam {
    SleepMinSeconds,
    SleepMaxSeconds,
    BomRemoving,
}

impl SessionParam {
    pub const ALL: [SessionParam; 3] = [
        SessionParam::SleepMinSeconds,
        SessionParam::SleepMaxSeconds,
        SessionParam::BomRemoving,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionParam::SleepMinSeconds => "sleepMinSeconds",
            SessionParam::SleepMaxSeconds => "sleepMaxSeconds",
            SessionParam::BomRemoving => "bomRemoving",
        }
    }
}

impl fmt::Display for SessionParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionParam {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionParam::ALL
            .into_iter()
            .find(|param| param.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
}

impl ParamValue {
    pub(crate) fn seconds(self) -> Option<u64> {
        match self {
            ParamValue::Int(i) => u64::try_from(i).ok(),
            ParamValue::Bool(_) => None,
        }
    }

    pub(crate) fn flag(self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(b),
            ParamValue::Int(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}
