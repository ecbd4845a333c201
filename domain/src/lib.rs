//! Domain layer for review-relay
//!
//! This crate contains the pure business rules of change propagation between
//! two review servers. It performs no I/O.
//!
//! # Core Concepts
//!
//! ## Labels
//!
//! A change may only be promoted when every required label passes the
//! "max with block" rule: someone cast the highest vote and nobody cast the
//! lowest one. See [`review::label`].
//!
//! ## Events
//!
//! The downstream server publishes a JSON event feed. [`event::RawEvent`]
//! wraps one record; [`event::CommentAdded`] is the typed view of the only
//! event kind that can trigger propagation.
//!
//! ## Mirrors
//!
//! A project may name a canonical source repository. [`project::SourceMirror`]
//! describes which refs are pushed from it into the downstream server and
//! which downstream-only refs survive the prune.

pub mod command;
pub mod core;
pub mod event;
pub mod identity;
pub mod project;
pub mod query;
pub mod review;
mod wire;

// Re-export commonly used types
pub use command::ServerCommand;
pub use crate::core::{
    error::DomainError,
    remote::{DEFAULT_SSH_PORT, Remote},
};
pub use event::{COMMENT_ADDED, CommentAdded, EventKind, REF_UPDATED, RawEvent, RefUpdated};
pub use identity::{ChangeOwner, GitIdentity, IdentitySource, PushIdentity};
pub use project::{ReviewProject, SourceMirror};
pub use query::{ChangeRecord, PatchSetRecord, QueryResult, parse_query_output};
pub use review::{Approval, DEFAULT_TRIGGER, Label, LabelSet, LabelSpec, Trigger};
