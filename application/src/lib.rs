//! Application layer for review-relay
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{DEFAULT_RECONNECT_DELAY, DEFAULT_SYNC_DELAY, DaemonParams, RelayConfig};
pub use ports::{
    audit_logger::{AuditEvent, AuditLogger, NoAuditLogger},
    command_channel::{ChannelError, CommandChannel, CommandOutput},
    config_source::{ConfigSource, ConfigSourceError, StaticConfig},
    event_feed::{EventFeed, EventSession, FeedError},
    local_repo::{
        CloneOptions, LocalTooling, PushOptions, RemoteRefsOptions, ReviewTool, Vcs, VcsError,
    },
};
pub use use_cases::listen_events::{
    ConnectorState, EventQueue, EventStreamConnector, event_channel,
};
pub use use_cases::propagate_change::{
    ChangeKey, InFlightChanges, NOT_APPROVED_MESSAGE, PropagateChangeUseCase, PropagateError,
    PropagationOutcome, TRANSFER_ERROR_MESSAGE,
};
pub use use_cases::relay_service::{RelayService, RelayStats};
pub use use_cases::scratch::ScratchDir;
pub use use_cases::sync_project::{SyncError, SyncOutcome, SyncProjectUseCase, SyncSchedule};
