//! Event stream connector.
//!
//! Keeps a live subscription to the downstream server's event feed and hands
//! every received line, unparsed, to a single-consumer unbounded queue.
//!
//! ```text
//! Disconnected ──▶ Connecting ──▶ Streaming
//!      ▲               │              │
//!      └── delay ◀─────┴── error / end┘
//! ```
//!
//! The only terminal state is [`ConnectorState::Stopped`], reached when the
//! cancellation token fires or the consumer drops its end of the queue.
//! Cancellation is checked before every wait, so shutdown latency is bounded
//! by the longest single await rather than by the reconnect delay.

use crate::config::DEFAULT_RECONNECT_DELAY;
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::event_feed::{EventFeed, EventSession, FeedError};
use relay_domain::RawEvent;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Connection state of the [`EventStreamConnector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Disconnected,
    Connecting,
    Streaming,
    Stopped,
}

/// Create the hand-off queue between the connector and its consumer.
pub fn event_channel() -> (mpsc::UnboundedSender<String>, EventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, EventQueue { rx, closed: false })
}

/// Consumer end of the hand-off queue.
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<String>,
    closed: bool,
}

impl EventQueue {
    /// Take the next parseable event without waiting.
    ///
    /// Returns `None` when the queue is empty. Lines that are not valid JSON
    /// are logged and dropped; the next line is tried instead.
    pub fn try_next(&mut self) -> Option<RawEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(line) => match RawEvent::parse(&line) {
                    Ok(event) => return Some(event),
                    Err(e) => {
                        warn!("Dropping malformed event ({}): {}", e, truncate(&line, 200));
                    }
                },
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    /// True once the producer is gone and every queued line was consumed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Why one streaming session ended.
enum SessionEnd {
    Stopped,
    ConsumerGone,
    Ended,
    Failed(FeedError),
}

/// Maintains the event subscription and feeds the hand-off queue.
pub struct EventStreamConnector {
    feed: Arc<dyn EventFeed>,
    queue: mpsc::UnboundedSender<String>,
    reconnect_delay: Duration,
    audit: Arc<dyn AuditLogger>,
    state: watch::Sender<ConnectorState>,
}

impl EventStreamConnector {
    pub fn new(feed: Arc<dyn EventFeed>, queue: mpsc::UnboundedSender<String>) -> Self {
        let (state, _) = watch::channel(ConnectorState::Disconnected);
        Self {
            feed,
            queue,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            audit: Arc::new(NoAuditLogger),
            state,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectorState> {
        self.state.subscribe()
    }

    /// Run the connector on a background task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Connect, stream and reconnect until `cancel` fires or the consumer
    /// drops the queue.
    pub async fn run(self, cancel: CancellationToken) {
        let target = self.feed.describe();
        info!("Event stream: starting for {}", target);

        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.transition(ConnectorState::Connecting);
            debug!("Event stream: connecting to {}", target);

            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.feed.connect() => result,
            };

            let end = match connected {
                Ok(mut session) => {
                    self.transition(ConnectorState::Streaming);
                    info!("Event stream: connected to {}", target);
                    self.audit
                        .log(AuditEvent::new("feed_connected", json!({ "target": target })));

                    let end = self.stream(session.as_mut(), &cancel).await;
                    session.close().await;
                    end
                }
                Err(e) => SessionEnd::Failed(e),
            };

            self.transition(ConnectorState::Disconnected);

            match end {
                SessionEnd::Stopped => break,
                SessionEnd::ConsumerGone => {
                    info!("Event stream: consumer gone, stopping");
                    break;
                }
                SessionEnd::Ended => {
                    warn!("Event stream: {} closed the stream", target);
                    self.audit_disconnect(&target, "stream ended");
                }
                SessionEnd::Failed(e) => {
                    warn!("Event stream: {} failed: {}", target, e);
                    self.audit_disconnect(&target, &e.to_string());
                }
            }

            debug!(
                "Event stream: reconnecting in {:?}",
                self.reconnect_delay
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.transition(ConnectorState::Stopped);
        info!("Event stream: stopped");
    }

    async fn stream(&self, session: &mut dyn EventSession, cancel: &CancellationToken) -> SessionEnd {
        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Stopped,
                line = session.next_line() => line,
            };

            match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    trace!("Event stream: {}", truncate(&line, 200));
                    if self.queue.send(line).is_err() {
                        return SessionEnd::ConsumerGone;
                    }
                }
                Ok(None) => return SessionEnd::Ended,
                Err(e) => return SessionEnd::Failed(e),
            }
        }
    }

    fn transition(&self, state: ConnectorState) {
        self.state.send_replace(state);
    }

    fn audit_disconnect(&self, target: &str, reason: &str) {
        self.audit.log(AuditEvent::new(
            "feed_disconnected",
            json!({ "target": target, "reason": reason }),
        ));
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
