//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod listen_events;
pub mod propagate_change;
pub mod relay_service;
pub mod scratch;
pub mod sync_project;

#[cfg(test)]
pub(crate) mod test_mocks;
