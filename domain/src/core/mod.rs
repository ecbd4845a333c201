//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] — domain-level errors
//! - [`remote::Remote`] — connection descriptor for one review server

pub mod error;
pub mod remote;
