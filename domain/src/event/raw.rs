//! Raw event records as read from the event feed.

use serde_json::Value;

/// Event type of a reviewer comment (carries votes and the trigger token).
pub const COMMENT_ADDED: &str = "comment-added";

/// Event type emitted when a branch or tag moves.
pub const REF_UPDATED: &str = "ref-updated";

/// Classification of a raw event by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    CommentAdded,
    RefUpdated,
    /// Any other typed event (`patchset-created`, `change-merged`, ...)
    Other(String),
    /// A record without a string `type` field
    Untyped,
}

/// One JSON record from the event feed.
///
/// This is a thin wrapper: the typed views ([`CommentAdded`](super::CommentAdded))
/// are extracted on demand so that unrelated event types cost nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    value: Value,
}

impl RawEvent {
    /// Parse one line of the feed.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line).map(Self::from_value)
    }

    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    pub fn event_type(&self) -> Option<&str> {
        self.value.get("type").and_then(|t| t.as_str())
    }

    pub fn kind(&self) -> EventKind {
        match self.event_type() {
            Some(COMMENT_ADDED) => EventKind::CommentAdded,
            Some(REF_UPDATED) => EventKind::RefUpdated,
            Some(other) => EventKind::Other(other.to_string()),
            None => EventKind::Untyped,
        }
    }

    pub fn as_json(&self) -> &Value {
        &self.value
    }
}
