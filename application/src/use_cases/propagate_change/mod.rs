//! Propagation workflow.
//!
//! Given one `comment-added` event, decide whether the change qualifies for
//! the upstream server and, if so, re-submit it there. Gates are evaluated in
//! order and the first failing one ends the attempt:
//!
//! | Step | Failure outcome | Comment posted |
//! |------|-----------------|----------------|
//! | Project gate | [`NotUpstreamProject`](PropagationOutcome::NotUpstreamProject) | no |
//! | Trigger gate | [`NotTriggered`](PropagationOutcome::NotTriggered) | no |
//! | In-flight guard | [`AlreadyInFlight`](PropagationOutcome::AlreadyInFlight) | no |
//! | Evaluation gate | [`NotApproved`](PropagationOutcome::NotApproved) | yes |
//! | Transfer | [`Failed`](PropagationOutcome::Failed) | yes |
//!
//! A successful transfer yields [`Sent`](PropagationOutcome::Sent) and a
//! comment carrying the upstream URL.
//!
//! The transfer runs in a fresh [`ScratchDir`]; every local command uses it as
//! its working directory, so the process working directory never changes.
//! The directory is removed before [`PropagateChangeUseCase::execute`]
//! returns, whatever the outcome.

mod in_flight;

pub use in_flight::{ChangeKey, InFlightChanges, InFlightGuard};

use crate::config::RelayConfig;
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::command_channel::CommandChannel;
use crate::ports::config_source::{ConfigSource, ConfigSourceError};
use crate::ports::local_repo::{LocalTooling, VcsError};
use crate::use_cases::scratch::ScratchDir;
use relay_domain::{
    Approval, CommentAdded, LabelSet, PushIdentity, ServerCommand, parse_query_output,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Comment posted when the evaluation gate fails.
pub const NOT_APPROVED_MESSAGE: &str = "Could not send to upstream: One or more labels not approved.";

/// Comment posted when the transfer failed for a reason other than the
/// review tool exiting non-zero.
pub const TRANSFER_ERROR_MESSAGE: &str = "Could not send to upstream: Error running git-review";

const DOWNSTREAM_REMOTE: &str = "downstream";
const UPSTREAM_REMOTE: &str = "upstream";

/// Errors that abort an attempt without a reviewer-visible outcome
#[derive(Error, Debug)]
pub enum PropagateError {
    #[error(transparent)]
    Config(#[from] ConfigSourceError),

    #[error("Failed to create scratch directory under {root}: {source}")]
    Scratch {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How one propagation attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagationOutcome {
    /// Project unknown or not marked upstream.
    NotUpstreamProject,
    /// First comment line lacks the trigger token.
    NotTriggered,
    /// Another attempt for the same change is running.
    AlreadyInFlight,
    /// At least one configured label is not approved.
    NotApproved,
    /// Change submitted upstream.
    Sent { url: String },
    /// Transfer failed; `message` is the comment posted downstream.
    Failed { message: String },
}

impl PropagationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationOutcome::NotUpstreamProject => "not_upstream_project",
            PropagationOutcome::NotTriggered => "not_triggered",
            PropagationOutcome::AlreadyInFlight => "already_in_flight",
            PropagationOutcome::NotApproved => "not_approved",
            PropagationOutcome::Sent { .. } => "sent",
            PropagationOutcome::Failed { .. } => "failed",
        }
    }
}

/// Transfer failure, split by how much detail reaches the reviewer.
#[derive(Debug)]
enum TransferFailure {
    /// The review tool ran and exited non-zero.
    ToolExited(VcsError),
    /// Anything else inside the transfer block.
    Unexpected(VcsError),
}

impl TransferFailure {
    fn from_tool(e: VcsError) -> Self {
        match e {
            VcsError::CommandFailed { .. } => TransferFailure::ToolExited(e),
            VcsError::Spawn { .. } => TransferFailure::Unexpected(e),
        }
    }

    fn comment(&self) -> String {
        match self {
            TransferFailure::ToolExited(e) => format!(
                "Could not send to upstream:\n{}",
                e.output().unwrap_or_default()
            ),
            TransferFailure::Unexpected(_) => TRANSFER_ERROR_MESSAGE.to_string(),
        }
    }

    fn error(&self) -> &VcsError {
        match self {
            TransferFailure::ToolExited(e) | TransferFailure::Unexpected(e) => e,
        }
    }
}

/// Runs the propagation workflow for single events.
pub struct PropagateChangeUseCase {
    config: Arc<dyn ConfigSource>,
    downstream: Arc<dyn CommandChannel>,
    upstream: Arc<dyn CommandChannel>,
    tooling: Arc<dyn LocalTooling>,
    audit: Arc<dyn AuditLogger>,
    in_flight: InFlightChanges,
}

impl PropagateChangeUseCase {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        downstream: Arc<dyn CommandChannel>,
        upstream: Arc<dyn CommandChannel>,
        tooling: Arc<dyn LocalTooling>,
    ) -> Self {
        Self {
            config,
            downstream,
            upstream,
            tooling,
            audit: Arc::new(NoAuditLogger),
            in_flight: InFlightChanges::new(),
        }
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn in_flight(&self) -> &InFlightChanges {
        &self.in_flight
    }

    /// Run every gate for `event` and, when all pass, transfer the change.
    ///
    /// Reviewer-visible outcomes are returned as [`PropagationOutcome`];
    /// only an unreadable configuration or a scratch directory that cannot
    /// be created is an error.
    pub async fn execute(&self, event: &CommentAdded) -> Result<PropagationOutcome, PropagateError> {
        let config = self.config.load()?;

        let Some(project) = config.project(&event.project).filter(|p| p.upstream) else {
            debug!(
                "Change {}: project {} is not an upstream project",
                event.change_id, event.project
            );
            return Ok(self.skipped(event, PropagationOutcome::NotUpstreamProject));
        };

        if !config.trigger.matches(&event.comment) {
            debug!(
                "Change {}: comment does not start with {}",
                event.change_id, config.trigger
            );
            return Ok(self.skipped(event, PropagationOutcome::NotTriggered));
        }

        let Some(_guard) = self.in_flight.try_acquire(ChangeKey::of(event)) else {
            info!(
                "Change {}: another propagation attempt is in progress",
                event.change_id
            );
            return Ok(self.skipped(event, PropagationOutcome::AlreadyInFlight));
        };

        info!(
            "Change {}: propagation requested for patchset {} on {}",
            event.change_id, event.patchset, event.branch
        );

        let approvals = self.fetch_approvals(event).await;
        let mut labels = LabelSet::from_specs(config.labels_for(project));
        labels.add_approvals(&approvals);

        if !labels.approved() {
            let unapproved: Vec<&str> = labels.unapproved().collect();
            info!(
                "Change {}: labels not approved: {}",
                event.change_id,
                unapproved.join(", ")
            );
            self.post_comment(event, NOT_APPROVED_MESSAGE).await;
            self.audit.log(AuditEvent::new(
                "propagation_rejected",
                json!({
                    "change_id": event.change_id,
                    "patchset": event.patchset,
                    "project": event.project,
                    "unapproved": unapproved,
                }),
            ));
            return Ok(PropagationOutcome::NotApproved);
        }

        let scratch = ScratchDir::create(&config.daemon.scratch_root)
            .await
            .map_err(|source| PropagateError::Scratch {
                root: config.daemon.scratch_root.clone(),
                source,
            })?;
        let transferred = self.transfer(&config, event, scratch.path()).await;
        scratch.remove().await;

        let outcome = match transferred {
            Ok(url) => {
                info!("Change {}: sent to upstream: {}", event.change_id, url);
                self.post_comment(event, &format!("Sent to upstream: {}", url))
                    .await;
                self.audit.log(AuditEvent::new(
                    "propagation_sent",
                    json!({
                        "change_id": event.change_id,
                        "patchset": event.patchset,
                        "project": event.project,
                        "url": url,
                    }),
                ));
                PropagationOutcome::Sent { url }
            }
            Err(failure) => {
                error!(
                    "Change {}: transfer to upstream failed: {}",
                    event.change_id,
                    failure.error()
                );
                if let Some(output) = failure.error().output() {
                    error!("Change {}: command output:\n{}", event.change_id, output);
                }
                let message = failure.comment();
                self.post_comment(event, &message).await;
                self.audit.log(AuditEvent::new(
                    "propagation_failed",
                    json!({
                        "change_id": event.change_id,
                        "patchset": event.patchset,
                        "project": event.project,
                        "error": failure.error().to_string(),
                    }),
                ));
                PropagationOutcome::Failed { message }
            }
        };

        Ok(outcome)
    }

    fn skipped(&self, event: &CommentAdded, outcome: PropagationOutcome) -> PropagationOutcome {
        self.audit.log(AuditEvent::new(
            "propagation_skipped",
            json!({
                "change_id": event.change_id,
                "patchset": event.patchset,
                "project": event.project,
                "reason": outcome.as_str(),
            }),
        ));
        outcome
    }

    /// Approvals on the event's patchset. Any failure yields an empty list,
    /// which the evaluation gate then rejects.
    async fn fetch_approvals(&self, event: &CommentAdded) -> Vec<Approval> {
        let command = ServerCommand::query_approvals(&event.change_id, &event.branch, &event.project);

        let output = match self.downstream.execute(&command).await {
            Ok(output) if output.is_success() => output.output,
            Ok(output) => {
                warn!(
                    "Change {}: approval query exited with {}: {}",
                    event.change_id,
                    output.exit_status,
                    output.output.trim()
                );
                return Vec::new();
            }
            Err(e) => {
                warn!("Change {}: approval query failed: {}", event.change_id, e);
                return Vec::new();
            }
        };

        match parse_query_output(&output) {
            Ok(result) => {
                let approvals = result
                    .first()
                    .map(|change| change.approvals_for(event.patchset))
                    .unwrap_or_default();
                debug!(
                    "Change {}: {} approvals on patchset {}",
                    event.change_id,
                    approvals.len(),
                    event.patchset
                );
                approvals
            }
            Err(e) => {
                warn!(
                    "Change {}: could not parse approval query output: {}",
                    event.change_id, e
                );
                Vec::new()
            }
        }
    }

    async fn transfer(
        &self,
        config: &RelayConfig,
        event: &CommentAdded,
        dir: &Path,
    ) -> Result<String, TransferFailure> {
        let downstream = self.downstream.remote();
        let upstream = self.upstream.remote();
        let vcs = self.tooling.vcs(dir);
        let review_tool = self.tooling.review_tool(dir);

        vcs.init().await.map_err(TransferFailure::Unexpected)?;
        vcs.add_remote(
            DOWNSTREAM_REMOTE,
            &downstream.ssh_url(&downstream.username, &event.project),
        )
        .await
        .map_err(TransferFailure::Unexpected)?;

        let identity = PushIdentity::resolve(&event.owner, &upstream.username, &config.git_identity);
        info!(
            "Change {}: pushing as username {}, email {}, name {}",
            event.change_id, identity.username, identity.email, identity.name
        );

        vcs.add_remote(
            UPSTREAM_REMOTE,
            &upstream.ssh_url(&identity.username, &event.project),
        )
        .await
        .map_err(TransferFailure::Unexpected)?;
        vcs.set_config("user.name", &identity.name)
            .await
            .map_err(TransferFailure::Unexpected)?;
        vcs.set_config("user.email", &identity.email)
            .await
            .map_err(TransferFailure::Unexpected)?;

        review_tool
            .download(DOWNSTREAM_REMOTE, &event.change_ref())
            .await
            .map_err(TransferFailure::from_tool)?;
        review_tool
            .upload(UPSTREAM_REMOTE, &event.branch, event.topic.as_deref())
            .await
            .map_err(TransferFailure::from_tool)?;

        Ok(self.upstream_url(event).await)
    }

    /// URL of the change on the upstream server, or the search URL when the
    /// lookup finds nothing.
    async fn upstream_url(&self, event: &CommentAdded) -> String {
        let fallback = || self.upstream.remote().change_search_url(&event.change_id);
        let command = ServerCommand::query_change(&event.change_id, &event.branch, &event.project);

        match self.upstream.execute(&command).await {
            Ok(output) if output.is_success() => match parse_query_output(&output.output) {
                Ok(result) => result
                    .first()
                    .and_then(|change| change.url.clone())
                    .unwrap_or_else(fallback),
                Err(e) => {
                    warn!(
                        "Change {}: could not parse upstream query output: {}",
                        event.change_id, e
                    );
                    fallback()
                }
            },
            Ok(output) => {
                warn!(
                    "Change {}: upstream query exited with {}",
                    event.change_id, output.exit_status
                );
                fallback()
            }
            Err(e) => {
                warn!("Change {}: upstream query failed: {}", event.change_id, e);
                fallback()
            }
        }
    }

    async fn post_comment(&self, event: &CommentAdded, message: &str) {
        let command = ServerCommand::review(message, &event.revision);
        match self.downstream.execute(&command).await {
            Ok(output) if output.is_success() => {
                debug!("Change {}: comment posted", event.change_id);
            }
            Ok(output) => warn!(
                "Change {}: posting comment exited with {}: {}",
                event.change_id,
                output.exit_status,
                output.output.trim()
            ),
            Err(e) => warn!("Change {}: posting comment failed: {}", event.change_id, e),
        }
    }
}
