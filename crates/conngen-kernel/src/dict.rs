//! Parameter dictionaries passed to edge storage

use std::collections::BTreeMap;
use core::fmt;

/// A single staged synapse parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamScalar {
    /// Integer-valued parameter (e.g. receptor type)
    Int(i64),
    /// Real-valued parameter
    Double(f64),
}

impl ParamScalar {
    /// Value as a real number
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Double(v) => v,
        }
    }

    /// Value as an integer, if it is integer-typed
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            Self::Double(_) => None,
        }
    }

    /// Whether the value is integer-typed
    pub fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }
}

impl fmt::Display for ParamScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamScalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamScalar {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

/// Named parameter values, ordered by name
pub type ParamDict = BTreeMap<String, ParamScalar>;

/// Name of the weight entry in model defaults
pub const WEIGHT: &str = "weight";

/// Name of the delay entry in model defaults
pub const DELAY: &str = "delay";
