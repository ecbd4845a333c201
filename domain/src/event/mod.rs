//! Event model and classifier
//!
//! Raw feed lines become [`RawEvent`]s. Downstream `comment-added` events are
//! turned into the typed [`CommentAdded`] view the propagation workflow
//! consumes; upstream `ref-updated` events become [`RefUpdated`] and schedule
//! a mirror sync.

pub mod comment_added;
pub mod raw;
pub mod ref_updated;

pub use comment_added::CommentAdded;
pub use ref_updated::RefUpdated;
pub use raw::{COMMENT_ADDED, EventKind, REF_UPDATED, RawEvent};
