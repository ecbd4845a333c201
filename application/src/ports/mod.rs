//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod audit_logger;
pub mod command_channel;
pub mod config_source;
pub mod event_feed;
pub mod local_repo;
