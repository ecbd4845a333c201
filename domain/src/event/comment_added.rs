//! Typed view over a `comment-added` event.

use super::raw::{COMMENT_ADDED, RawEvent};
use crate::core::error::DomainError;
use crate::identity::ChangeOwner;
use crate::wire::LooseInt;
use serde::Deserialize;

#[derive(Deserialize)]
struct WireEvent {
    change: WireChange,
    #[serde(rename = "patchSet")]
    patch_set: WirePatchSet,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Deserialize)]
struct WireChange {
    id: String,
    project: String,
    branch: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    owner: Option<ChangeOwner>,
}

#[derive(Deserialize)]
struct WirePatchSet {
    number: LooseInt,
    revision: String,
}

/// A reviewer comment on one patchset of a change.
///
/// Structural fields (change id, project, branch, patchset number, revision)
/// are required; owner identity and topic are optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentAdded {
    pub change_id: String,
    pub patchset: u32,
    pub project: String,
    pub branch: String,
    pub topic: Option<String>,
    /// Commit id of the patchset
    pub revision: String,
    /// Comment text (empty when the event carried none)
    pub comment: String,
    pub owner: ChangeOwner,
}

impl CommentAdded {
    /// Extract the fields needed for propagation from a raw event.
    ///
    /// Fails with [`DomainError::MalformedEvent`] when the record is not a
    /// `comment-added` event or a required field is absent.
    pub fn from_event(event: &RawEvent) -> Result<Self, DomainError> {
        if event.event_type() != Some(COMMENT_ADDED) {
            return Err(DomainError::MalformedEvent(format!(
                "expected {} event, got {:?}",
                COMMENT_ADDED,
                event.event_type()
            )));
        }

        let wire = WireEvent::deserialize(event.as_json())
            .map_err(|e| DomainError::MalformedEvent(e.to_string()))?;

        let patchset = wire
            .patch_set
            .number
            .as_i64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                DomainError::MalformedEvent(format!(
                    "invalid patchset number '{}'",
                    wire.patch_set.number.raw()
                ))
            })?;

        Ok(Self {
            change_id: wire.change.id,
            patchset,
            project: wire.change.project,
            branch: wire.change.branch,
            topic: wire.change.topic.filter(|t| !t.is_empty()),
            revision: wire.patch_set.revision,
            comment: wire.comment.unwrap_or_default(),
            owner: wire.change.owner.unwrap_or_default(),
        })
    }

    /// `<change-id>,<patchset>` as understood by the review-submission tool
    pub fn change_ref(&self) -> String {
        format!("{},{}", self.change_id, self.patchset)
    }
}

impl TryFrom<&RawEvent> for CommentAdded {
    type Error = DomainError;

    fn try_from(event: &RawEvent) -> Result<Self, Self::Error> {
        Self::from_event(event)
    }
}
