//! Relay service: the consumer loop behind the event stream connectors.
//!
//! Polls the downstream hand-off queue, classifies each event by type and
//! hands `comment-added` events to a bounded pool of workers. When an upstream
//! queue is attached, its `ref-updated` events schedule a mirror sync of the
//! project `sync_delay` later; due syncs are dispatched to the same pool ahead
//! of new downstream events.

use super::listen_events::EventQueue;
use super::propagate_change::PropagateChangeUseCase;
use super::sync_project::{SyncProjectUseCase, SyncSchedule};
use crate::config::DaemonParams;
use relay_domain::{CommentAdded, EventKind, RawEvent, RefUpdated};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub received: usize,
    pub comments: usize,
    pub dispatched: usize,
    pub malformed: usize,
    pub ignored: usize,
    /// Upstream `ref-updated` events seen
    pub ref_updates: usize,
    /// Mirror syncs started
    pub syncs: usize,
}

/// Upstream event source and the workflow its updates trigger.
struct UpstreamSync {
    queue: EventQueue,
    sync: Arc<SyncProjectUseCase>,
    schedule: SyncSchedule,
}

pub struct RelayService {
    queue: EventQueue,
    propagate: Arc<PropagateChangeUseCase>,
    upstream: Option<UpstreamSync>,
    workers: usize,
    poll_interval: Duration,
    dispatch: bool,
    sync: bool,
    sync_delay: Duration,
}

impl RelayService {
    pub fn new(queue: EventQueue, propagate: Arc<PropagateChangeUseCase>, params: &DaemonParams) -> Self {
        Self {
            queue,
            propagate,
            upstream: None,
            workers: params.workers.max(1),
            poll_interval: params.poll_interval,
            dispatch: params.propagate,
            sync: params.sync,
            sync_delay: params.sync_delay,
        }
    }

    /// Watch `queue` for upstream ref updates and mirror the affected projects.
    pub fn with_upstream(mut self, queue: EventQueue, sync: Arc<SyncProjectUseCase>) -> Self {
        self.upstream = Some(UpstreamSync {
            queue,
            sync,
            schedule: SyncSchedule::new(),
        });
        self
    }

    /// Consume events until `cancel` fires or the downstream queue closes,
    /// then wait for running attempts to finish.
    pub async fn run(mut self, cancel: CancellationToken) -> RelayStats {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut stats = RelayStats::default();

        info!(
            "Relay: consuming events with {} workers (propagation {}, sync {})",
            self.workers,
            if self.dispatch { "enabled" } else { "disabled" },
            match (&self.upstream, self.sync) {
                (Some(_), true) => "enabled",
                _ => "disabled",
            }
        );

        'relay: loop {
            if cancel.is_cancelled() {
                break;
            }
            while let Some(joined) = tasks.try_join_next() {
                report_join(joined);
            }

            self.schedule_upstream(&mut stats);
            if let Some(upstream) = &mut self.upstream {
                for project in upstream.schedule.take_due(Instant::now()) {
                    let Some(permit) = acquire(&semaphore, &cancel).await else {
                        break 'relay;
                    };
                    stats.syncs += 1;
                    let sync = Arc::clone(&upstream.sync);
                    tasks.spawn(async move {
                        let _permit = permit;
                        match sync.execute(&project).await {
                            Ok(outcome) => debug!("Sync {}: finished: {}", project, outcome.as_str()),
                            Err(e) => error!("Sync {}: aborted: {}", project, e),
                        }
                    });
                }
            }

            let Some(event) = self.queue.try_next() else {
                if self.queue.is_closed() {
                    info!("Relay: event queue closed");
                    break;
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
                continue;
            };

            stats.received += 1;
            let Some(comment) = classify(&event, &mut stats) else {
                continue;
            };
            if !self.dispatch {
                continue;
            }

            let Some(permit) = acquire(&semaphore, &cancel).await else {
                break;
            };

            stats.dispatched += 1;
            let propagate = Arc::clone(&self.propagate);
            tasks.spawn(async move {
                let _permit = permit;
                match propagate.execute(&comment).await {
                    Ok(outcome) => debug!(
                        "Change {}: attempt finished: {}",
                        comment.change_id,
                        outcome.as_str()
                    ),
                    Err(e) => error!("Change {}: attempt aborted: {}", comment.change_id, e),
                }
            });
        }

        if let Some(upstream) = &self.upstream
            && !upstream.schedule.is_empty()
        {
            info!("Relay: dropping {} scheduled syncs", upstream.schedule.len());
        }
        if !tasks.is_empty() {
            info!("Relay: waiting for {} running attempts", tasks.len());
        }
        while let Some(joined) = tasks.join_next().await {
            report_join(joined);
        }

        info!(
            "Relay: stopped after {} events ({} dispatched, {} syncs)",
            stats.received, stats.dispatched, stats.syncs
        );
        stats
    }

    /// Drain the upstream queue, scheduling a sync for every ref update.
    fn schedule_upstream(&mut self, stats: &mut RelayStats) {
        let Some(upstream) = &mut self.upstream else {
            return;
        };
        while let Some(event) = upstream.queue.try_next() {
            stats.received += 1;
            if event.kind() != EventKind::RefUpdated {
                stats.ignored += 1;
                trace!(
                    "Relay: ignoring upstream {} event",
                    event.event_type().unwrap_or("untyped")
                );
                continue;
            }
            let update = match RefUpdated::from_event(&event) {
                Ok(update) => update,
                Err(e) => {
                    stats.malformed += 1;
                    warn!("Relay: dropping malformed ref-updated event: {}", e);
                    continue;
                }
            };
            stats.ref_updates += 1;
            if !self.sync {
                continue;
            }
            if upstream
                .schedule
                .schedule(&update.project, Instant::now() + self.sync_delay)
            {
                info!(
                    "Relay: {} updated upstream ({}), sync in {}s",
                    update.project,
                    update.ref_name,
                    self.sync_delay.as_secs()
                );
            } else {
                debug!("Relay: sync of {} already scheduled", update.project);
            }
        }
    }
}

async fn acquire(semaphore: &Arc<Semaphore>, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
    }
}

fn classify(event: &RawEvent, stats: &mut RelayStats) -> Option<CommentAdded> {
    match event.kind() {
        EventKind::CommentAdded => match CommentAdded::from_event(event) {
            Ok(comment) => {
                stats.comments += 1;
                Some(comment)
            }
            Err(e) => {
                stats.malformed += 1;
                warn!("Relay: dropping malformed comment-added event: {}", e);
                None
            }
        },
        EventKind::RefUpdated => {
            stats.ignored += 1;
            debug!("Relay: ignoring downstream ref-updated event");
            None
        }
        EventKind::Other(kind) => {
            stats.ignored += 1;
            trace!("Relay: ignoring {} event", kind);
            None
        }
        EventKind::Untyped => {
            stats.malformed += 1;
            warn!("Relay: dropping event without a type");
            None
        }
    }
}

fn report_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!("Relay: worker panicked: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::config_source::StaticConfig;
    use crate::use_cases::listen_events::event_channel;
    use crate::use_cases::test_mocks::*;
    use tokio::time::timeout;

    struct Fixture {
        _root: tempfile::TempDir,
        downstream: Arc<MockChannel>,
        tooling: Arc<MockTooling>,
        propagate: Arc<PropagateChangeUseCase>,
        sync: Arc<SyncProjectUseCase>,
        params: DaemonParams,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let config = relay_config(root.path());
        let params = config.daemon.clone();
        let downstream = Arc::new(MockChannel::new(downstream()).answer_queries(
            approvals_output(&[(3, &[("Code-Review", "2")])]),
        ));
        let tooling = Arc::new(MockTooling::default());
        let config = Arc::new(StaticConfig::new(config));
        let propagate = Arc::new(PropagateChangeUseCase::new(
            config.clone(),
            downstream.clone(),
            Arc::new(MockChannel::new(upstream())),
            tooling.clone(),
        ));
        let sync = Arc::new(SyncProjectUseCase::new(config, tooling.clone()));
        Fixture {
            _root: root,
            downstream,
            tooling,
            propagate,
            sync,
            params,
        }
    }

    fn line(value: serde_json::Value) -> String {
        value.to_string()
    }

    #[tokio::test]
    async fn test_dispatches_comment_events_until_queue_closes() {
        let f = fixture();
        let (tx, queue) = event_channel();
        tx.send(line(comment_added_json("demo", "Upstream-Ready+1"))).unwrap();
        tx.send(line(serde_json::json!({ "type": "ref-updated" }))).unwrap();
        tx.send(line(serde_json::json!({ "type": "patchset-created" }))).unwrap();
        tx.send("garbage".into()).unwrap();
        tx.send(line(serde_json::json!({ "type": "comment-added", "change": {} }))).unwrap();
        tx.send(line(comment_added_json("local", "Upstream-Ready+1"))).unwrap();
        drop(tx);

        let service = RelayService::new(queue, f.propagate.clone(), &f.params);
        let stats = timeout(Duration::from_secs(2), service.run(CancellationToken::new()))
            .await
            .unwrap();

        assert_eq!(
            stats,
            RelayStats {
                received: 5,
                comments: 2,
                dispatched: 2,
                malformed: 1,
                ignored: 2,
                ref_updates: 0,
                syncs: 0,
            }
        );
        assert_eq!(
            f.downstream.comments(),
            vec!["Sent to upstream: https://review.upstream.org/#q,I8473b95934b5732ac55d26311a706c9c2bde9940,n,z"]
        );
        assert_eq!(
            f.tooling
                .log()
                .iter()
                .filter(|l| l.starts_with("upload"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_dispatch_disabled() {
        let f = fixture();
        let (tx, queue) = event_channel();
        tx.send(line(comment_added_json("demo", "Upstream-Ready+1"))).unwrap();
        drop(tx);

        let params = f.params.clone().with_propagate(false);
        let stats = RelayService::new(queue, f.propagate.clone(), &params)
            .run(CancellationToken::new())
            .await;

        assert_eq!(stats.comments, 1);
        assert_eq!(stats.dispatched, 0);
        assert!(f.downstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stops_on_cancel_while_idle() {
        let f = fixture();
        let (_tx, queue) = event_channel();
        let cancel = CancellationToken::new();
        let params = f.params.clone().with_poll_interval(Duration::from_secs(60));
        let handle = tokio::spawn(RelayService::new(queue, f.propagate.clone(), &params).run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        let stats = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert_eq!(stats, RelayStats::default());
    }

    #[tokio::test]
    async fn test_failed_attempt_does_not_stop_loop() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let mut config = relay_config(root.path());
        config.daemon.scratch_root = blocker;
        let params = config.daemon.clone();
        let downstream = Arc::new(MockChannel::new(downstream()).answer_queries(
            approvals_output(&[(3, &[("Code-Review", "2")])]),
        ));
        let propagate = Arc::new(PropagateChangeUseCase::new(
            Arc::new(StaticConfig::new(config)),
            downstream.clone(),
            Arc::new(MockChannel::new(upstream())),
            Arc::new(MockTooling::default()),
        ));

        let (tx, queue) = event_channel();
        tx.send(line(comment_added_json("demo", "Upstream-Ready+1"))).unwrap();
        tx.send(line(comment_added_json("demo", "Upstream-Ready+1"))).unwrap();
        drop(tx);

        let stats = RelayService::new(queue, propagate, &params)
            .run(CancellationToken::new())
            .await;
        assert_eq!(stats.dispatched, 2);
    }

    async fn wait_for_log(tooling: &MockTooling, entry: &str) {
        timeout(Duration::from_secs(2), async {
            while !tooling.log().iter().any(|l| l == entry) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_upstream_ref_updates_schedule_one_sync_per_project() {
        let f = fixture();
        let (_down_tx, queue) = event_channel();
        let (up_tx, upstream_queue) = event_channel();
        up_tx.send(line(ref_updated_json("mirrored"))).unwrap();
        up_tx.send(line(ref_updated_json("mirrored"))).unwrap();
        up_tx.send(line(ref_updated_json("demo"))).unwrap();
        up_tx.send(line(comment_added_json("demo", "Upstream-Ready+1"))).unwrap();
        up_tx.send(line(serde_json::json!({ "type": "ref-updated" }))).unwrap();

        let params = f.params.clone().with_sync_delay(Duration::from_millis(20));
        let cancel = CancellationToken::new();
        let service = RelayService::new(queue, f.propagate.clone(), &params)
            .with_upstream(upstream_queue, f.sync.clone());
        let handle = tokio::spawn(service.run(cancel.clone()));

        wait_for_log(&f.tooling, "ls-remote origin").await;
        cancel.cancel();
        let stats = handle.await.unwrap();

        assert_eq!(stats.received, 5);
        assert_eq!(stats.ref_updates, 3);
        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.syncs, 2);
        assert_eq!(stats.dispatched, 0);
        assert_eq!(
            f.tooling
                .log()
                .iter()
                .filter(|l| l.starts_with("clone"))
                .count(),
            1
        );
        assert!(f.downstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sync_waits_for_delay() {
        let f = fixture();
        let (_down_tx, queue) = event_channel();
        let (up_tx, upstream_queue) = event_channel();
        up_tx.send(line(ref_updated_json("mirrored"))).unwrap();

        let params = f.params.clone().with_sync_delay(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let service = RelayService::new(queue, f.propagate.clone(), &params)
            .with_upstream(upstream_queue, f.sync.clone());
        let handle = tokio::spawn(service.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(40)).await;
        cancel.cancel();
        let stats = handle.await.unwrap();

        assert_eq!(stats.ref_updates, 1);
        assert_eq!(stats.syncs, 0);
        assert!(f.tooling.log().is_empty());
    }

    #[tokio::test]
    async fn test_sync_disabled_only_counts_updates() {
        let f = fixture();
        let (_down_tx, queue) = event_channel();
        let (up_tx, upstream_queue) = event_channel();
        up_tx.send(line(ref_updated_json("mirrored"))).unwrap();

        let params = f
            .params
            .clone()
            .with_sync(false)
            .with_sync_delay(Duration::ZERO);
        let cancel = CancellationToken::new();
        let service = RelayService::new(queue, f.propagate.clone(), &params)
            .with_upstream(upstream_queue, f.sync.clone());
        let handle = tokio::spawn(service.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(40)).await;
        cancel.cancel();
        let stats = handle.await.unwrap();

        assert_eq!(stats.ref_updates, 1);
        assert_eq!(stats.syncs, 0);
        assert!(f.tooling.log().is_empty());
    }
}
