//! Review domain: approvals, labels and the propagation trigger.
//!
//! - [`approval::Approval`] — a single vote fetched from the review server
//! - [`label::Label`] / [`label::LabelSet`] — max-with-block evaluation
//! - [`trigger::Trigger`] — first-line token that requests propagation

pub mod approval;
pub mod label;
pub mod trigger;

pub use approval::Approval;
pub use label::{Label, LabelSet, LabelSpec};
pub use trigger::{DEFAULT_TRIGGER, Trigger};
