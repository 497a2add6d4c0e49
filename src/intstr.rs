//! Values that are either an absolute count or a percentage of some total.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::format::is_valid_percent;

/// An integer or a string such as `"25%"`.
///
/// Serializes as a bare JSON number or string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrString {
    Int(i32),
    String(String),
}

impl Default for IntOrString {
    fn default() -> Self {
        IntOrString::Int(0)
    }
}

impl From<i32> for IntOrString {
    fn from(value: i32) -> Self {
        IntOrString::Int(value)
    }
}

impl From<&str> for IntOrString {
    fn from(value: &str) -> Self {
        IntOrString::String(value.to_string())
    }
}

impl fmt::Display for IntOrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntOrString::Int(i) => write!(f, "{i}"),
            IntOrString::String(s) => f.write_str(s),
        }
    }
}

impl IntOrString {
    /// The integer value; strings are parsed and fall back to 0.
    pub fn int_value(&self) -> i32 {
        match self {
            IntOrString::Int(i) => *i,
            IntOrString::String(s) => s.parse().unwrap_or(0),
        }
    }

    /// The `N` of a well-formed `"N%"` string, saturating at `i32::MAX`.
    pub fn percent(&self) -> Option<i32> {
        match self {
            // Only digits remain, so a parse failure is overflow.
            IntOrString::String(s) if is_valid_percent(s) => {
                Some(s[..s.len() - 1].parse().unwrap_or(i32::MAX))
            }
            _ => None,
        }
    }

    /// The percentage if this is one, the integer value otherwise.
    pub fn int_or_percent_value(&self) -> i32 {
        self.percent().unwrap_or_else(|| self.int_value())
    }

    /// Resolve against `total`. Percentages round down: `floor(N * total / 100)`.
    pub fn scaled_value(&self, total: i32) -> Result<i32, String> {
        if total < 0 {
            return Err(format!("invalid total {total}: must be non-negative"));
        }
        match self {
            IntOrString::Int(i) => Ok(*i),
            IntOrString::String(s) => {
                let percent = self
                    .percent()
                    .ok_or_else(|| format!("invalid value {s:?}: must be an integer or percentage"))?;
                let scaled = (i64::from(percent) * i64::from(total)) / 100;
                i32::try_from(scaled)
                    .map_err(|_| format!("invalid value {s:?}: {scaled} exceeds the range of an int32"))
            }
        }
    }
}

/// Resolve a surge/unavailable pair against a replica count.
///
/// Both values round down. When both come out as zero, `max_unavailable`
/// becomes 1 so the rollout can make progress.
pub fn resolve_fenceposts(
    max_surge: &IntOrString,
    max_unavailable: &IntOrString,
    total: i32,
) -> Result<(i32, i32), String> {
    let surge = max_surge.scaled_value(total)?;
    let unavailable = max_unavailable.scaled_value(total)?;
    if surge == 0 && unavailable == 0 {
        return Ok((0, 1));
    }
    Ok((surge, unavailable))
}
