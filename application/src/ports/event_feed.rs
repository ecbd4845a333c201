//! Event feed port
//!
//! A long-lived session on the downstream server that emits one raw event per
//! line. The stream connector opens a session, reads lines until the session
//! ends or fails, closes it, and opens a new one.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while opening or reading an event session
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("Stream exited with status {0}")]
    Exited(i32),
}

/// Opens event sessions
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Open a new authenticated session and start the event-stream command.
    async fn connect(&self) -> Result<Box<dyn EventSession>, FeedError>;

    /// Human-readable target, used in log lines.
    fn describe(&self) -> String;
}

/// An open event-stream session
#[async_trait]
pub trait EventSession: Send {
    /// Wait for the next line.
    ///
    /// Returns `Ok(None)` when the stream ended cleanly. The future must be
    /// cancel-safe: dropping it must not lose a partially read line.
    async fn next_line(&mut self) -> Result<Option<String>, FeedError>;

    /// Release the session. Called on every exit path before reconnecting.
    async fn close(&mut self);
}
