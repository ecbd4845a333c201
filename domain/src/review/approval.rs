//! Approval value object

use serde::{Deserialize, Serialize};

/// One reviewer's vote on a label for a specific patchset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Label the vote was cast on (e.g. `Code-Review`, `Verified`)
    pub label: String,
    /// Signed vote value (e.g. `-2`, `+1`)
    pub value: i32,
}

impl Approval {
    pub fn new(label: impl Into<String>, value: i32) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

impl std::fmt::Display for Approval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:+}", self.label, self.value)
    }
}
