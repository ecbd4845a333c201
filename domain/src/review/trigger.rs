//! Trigger token matching

use serde::{Deserialize, Serialize};

/// Default token that requests propagation.
pub const DEFAULT_TRIGGER: &str = "Upstream-Ready+1";

/// Literal token a reviewer puts in the first line of a comment to ask for
/// the change to be sent upstream.
///
/// # Example
///
/// ```
/// use relay_domain::Trigger;
///
/// let trigger = Trigger::default();
/// assert!(trigger.matches("Upstream-Ready+1\nlgtm"));
/// assert!(!trigger.matches("lgtm\nUpstream-Ready+1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trigger(String);

impl Trigger {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Substring match against the first line only.
    pub fn matches(&self, comment: &str) -> bool {
        comment
            .lines()
            .next()
            .is_some_and(|first_line| first_line.contains(self.0.as_str()))
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
