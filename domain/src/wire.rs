//! Serde helpers for the review server's JSON records.

use serde::Deserialize;

/// An integer that older servers encode as a JSON string (`"2"`, `"-1"`)
/// and newer ones as a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum LooseInt {
    Number(i64),
    Text(String),
}

impl LooseInt {
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            LooseInt::Number(n) => Some(*n),
            LooseInt::Text(s) => s.trim().trim_start_matches('+').parse().ok(),
        }
    }

    pub(crate) fn raw(&self) -> String {
        match self {
            LooseInt::Number(n) => n.to_string(),
            LooseInt::Text(s) => s.clone(),
        }
    }
}
