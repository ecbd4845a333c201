//! Typed view over a `ref-updated` event.

use super::raw::{REF_UPDATED, RawEvent};
use crate::core::error::DomainError;
use serde::Deserialize;

#[derive(Deserialize)]
struct WireEvent {
    #[serde(rename = "refUpdate")]
    ref_update: WireRefUpdate,
}

#[derive(Deserialize)]
struct WireRefUpdate {
    project: String,
    #[serde(rename = "refName")]
    ref_name: String,
    #[serde(rename = "newRev", default)]
    new_rev: Option<String>,
}

/// A ref moved on the server that published the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdated {
    pub project: String,
    pub ref_name: String,
    /// Commit the ref now points to; all zeros for a deletion
    pub new_rev: Option<String>,
}

impl RefUpdated {
    pub fn from_event(event: &RawEvent) -> Result<Self, DomainError> {
        if event.event_type() != Some(REF_UPDATED) {
            return Err(DomainError::MalformedEvent(format!(
                "expected {} event, got {:?}",
                REF_UPDATED,
                event.event_type()
            )));
        }

        let wire = WireEvent::deserialize(event.as_json())
            .map_err(|e| DomainError::MalformedEvent(e.to_string()))?;

        Ok(Self {
            project: wire.ref_update.project,
            ref_name: wire.ref_update.ref_name,
            new_rev: wire.ref_update.new_rev,
        })
    }
}
