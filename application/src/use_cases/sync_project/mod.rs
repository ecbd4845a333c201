//! Mirror sync workflow.
//!
//! Re-synchronizes a downstream project from its canonical source. The source
//! is cloned bare into a fresh [`ScratchDir`], its heads and tags are pushed
//! to the downstream server as configured, and downstream refs the source no
//! longer has are deleted unless they sit under the project's preserve
//! prefix. The scratch directory is removed whatever the outcome.

mod schedule;

pub use schedule::SyncSchedule;

use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::config_source::{ConfigSource, ConfigSourceError};
use crate::ports::local_repo::{CloneOptions, LocalTooling, PushOptions, RemoteRefsOptions, VcsError};
use crate::use_cases::scratch::ScratchDir;
use relay_domain::{Remote, SourceMirror};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

const SOURCE_REMOTE: &str = "origin";
const DOWNSTREAM_REMOTE: &str = "downstream";
const MIRROR_DIR: &str = "mirror.git";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigSourceError),

    #[error("Failed to create scratch directory under {root}: {source}")]
    Scratch {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sync of {project} failed: {source}")]
    Git {
        project: String,
        #[source]
        source: VcsError,
    },
}

/// How one sync ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Project unknown or without a source repository.
    NotMirrored,
    /// Neither heads nor tags are mirrored.
    NothingMirrored,
    /// Source pushed; `pruned` lists the downstream refs deleted.
    Synced { pruned: Vec<String> },
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::NotMirrored => "not_mirrored",
            SyncOutcome::NothingMirrored => "nothing_mirrored",
            SyncOutcome::Synced { .. } => "synced",
        }
    }
}

/// Mirrors projects from their source into the downstream server.
pub struct SyncProjectUseCase {
    config: Arc<dyn ConfigSource>,
    tooling: Arc<dyn LocalTooling>,
    audit: Arc<dyn AuditLogger>,
}

impl SyncProjectUseCase {
    pub fn new(config: Arc<dyn ConfigSource>, tooling: Arc<dyn LocalTooling>) -> Self {
        Self {
            config,
            tooling,
            audit: Arc::new(NoAuditLogger),
        }
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub async fn execute(&self, project: &str) -> Result<SyncOutcome, SyncError> {
        let config = self.config.load()?;

        let Some(mirror) = config.project(project).and_then(|p| p.mirror.as_ref()) else {
            debug!("Sync {}: no source repository configured", project);
            return Ok(SyncOutcome::NotMirrored);
        };
        if !mirror.mirrors_anything() {
            debug!("Sync {}: neither heads nor tags are mirrored", project);
            return Ok(SyncOutcome::NothingMirrored);
        }

        info!("Sync {}: mirroring from {}", project, mirror.url);
        let scratch = ScratchDir::create(&config.daemon.scratch_root)
            .await
            .map_err(|source| SyncError::Scratch {
                root: config.daemon.scratch_root.clone(),
                source,
            })?;
        let mirrored = self
            .mirror(&config.downstream, project, mirror, scratch.path())
            .await;
        scratch.remove().await;

        match mirrored {
            Ok(pruned) => {
                info!("Sync {}: done, {} refs pruned", project, pruned.len());
                self.audit.log(AuditEvent::new(
                    "project_synced",
                    json!({
                        "project": project,
                        "source": mirror.url,
                        "pruned": pruned,
                    }),
                ));
                Ok(SyncOutcome::Synced { pruned })
            }
            Err(source) => {
                error!("Sync {}: {}", project, source);
                if let Some(output) = source.output() {
                    error!("Sync {}: command output:\n{}", project, output);
                }
                self.audit.log(AuditEvent::new(
                    "project_sync_failed",
                    json!({
                        "project": project,
                        "source": mirror.url,
                        "error": source.to_string(),
                    }),
                ));
                Err(SyncError::Git {
                    project: project.to_string(),
                    source,
                })
            }
        }
    }

    async fn mirror(
        &self,
        downstream: &Remote,
        project: &str,
        mirror: &SourceMirror,
        dir: &Path,
    ) -> Result<Vec<String>, VcsError> {
        self.tooling
            .vcs(dir)
            .clone_from(
                &mirror.url,
                &CloneOptions {
                    bare: true,
                    target: Some(MIRROR_DIR.into()),
                },
            )
            .await?;

        let repo = self.tooling.vcs(&dir.join(MIRROR_DIR));
        repo.add_remote(
            DOWNSTREAM_REMOTE,
            &downstream.ssh_url(&downstream.username, project),
        )
        .await?;

        if mirror.heads {
            repo.push(
                DOWNSTREAM_REMOTE,
                &PushOptions {
                    all: true,
                    force: mirror.force,
                    ..Default::default()
                },
            )
            .await?;
        }
        if mirror.tags {
            repo.push(
                DOWNSTREAM_REMOTE,
                &PushOptions {
                    tags: true,
                    force: mirror.force,
                    ..Default::default()
                },
            )
            .await?;
        }

        let namespaces = RemoteRefsOptions {
            heads: mirror.heads,
            tags: mirror.tags,
        };
        let downstream_refs = repo.remote_refs(DOWNSTREAM_REMOTE, namespaces).await?;
        let source_refs = repo.remote_refs(SOURCE_REMOTE, namespaces).await?;
        let pruned = mirror.refs_to_prune(&downstream_refs, &source_refs);

        if !pruned.is_empty() {
            debug!("Sync {}: pruning {}", project, pruned.join(" "));
            repo.push(
                DOWNSTREAM_REMOTE,
                &PushOptions {
                    refspecs: pruned.iter().map(|r| format!(":{}", r)).collect(),
                    ..Default::default()
                },
            )
            .await?;
        }

        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::config_source::StaticConfig;
    use crate::use_cases::test_mocks::*;

    struct Harness {
        root: tempfile::TempDir,
        tooling: Arc<MockTooling>,
        audit: Arc<MockAudit>,
        use_case: SyncProjectUseCase,
    }

    fn harness(tooling: MockTooling) -> Harness {
        let root = tempfile::tempdir().unwrap();
        let tooling = Arc::new(tooling);
        let audit = Arc::new(MockAudit::default());
        let use_case = SyncProjectUseCase::new(
            Arc::new(StaticConfig::new(relay_config(root.path()))),
            tooling.clone(),
        )
        .with_audit_logger(audit.clone());
        Harness {
            root,
            tooling,
            audit,
            use_case,
        }
    }

    fn scratch_entries(h: &Harness) -> usize {
        let root = relay_config(h.root.path()).daemon.scratch_root;
        std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_project_without_source_is_skipped() {
        let h = harness(MockTooling::default());
        for project in ["demo", "unknown"] {
            let outcome = h.use_case.execute(project).await.unwrap();
            assert_eq!(outcome, SyncOutcome::NotMirrored);
        }
        assert!(h.tooling.log().is_empty());
        assert!(h.audit.types().is_empty());
    }

    #[tokio::test]
    async fn test_mirror_pushes_and_prunes() {
        let tooling = MockTooling::default()
            .with_remote_refs(
                "downstream",
                &[
                    "refs/heads/master",
                    "refs/heads/retired",
                    "refs/heads/internal/hotfix",
                    "refs/tags/v1.0",
                    "refs/tags/v0.9-rc",
                ],
            )
            .with_remote_refs("origin", &["refs/heads/master", "refs/tags/v1.0"]);
        let h = harness(tooling);

        let outcome = h.use_case.execute("mirrored").await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                pruned: vec!["refs/heads/retired".into(), "refs/tags/v0.9-rc".into()]
            }
        );
        assert_eq!(
            h.tooling.log(),
            vec![
                "clone --bare https://git.example.org/mirrored.git mirror.git",
                "remote add downstream ssh://relay@review.internal:29418/mirrored",
                "push downstream --all --force",
                "push downstream --tags --force",
                "ls-remote downstream",
                "ls-remote origin",
                "push downstream :refs/heads/retired :refs/tags/v0.9-rc",
            ]
        );
        let dirs = h.tooling.dirs();
        assert_eq!(dirs[1], dirs[0].join("mirror.git"));
        assert_eq!(scratch_entries(&h), 0);
        assert_eq!(h.audit.types(), vec!["project_synced"]);
        assert_eq!(
            h.audit.payloads("project_synced")[0]["pruned"],
            json!(["refs/heads/retired", "refs/tags/v0.9-rc"])
        );
    }

    #[tokio::test]
    async fn test_in_sync_mirror_prunes_nothing() {
        let refs = ["refs/heads/master"];
        let tooling = MockTooling::default()
            .with_remote_refs("downstream", &refs)
            .with_remote_refs("origin", &refs);
        let h = harness(tooling);

        let outcome = h.use_case.execute("mirrored").await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced { pruned: vec![] });
        assert!(!h.tooling.log().iter().any(|l| l.contains(" :refs/")));
    }

    #[tokio::test]
    async fn test_disabled_namespaces_do_nothing() {
        let root = tempfile::tempdir().unwrap();
        let config = relay_config(root.path()).with_project(
            relay_domain::ReviewProject::new("bare")
                .with_mirror(SourceMirror::new("https://git.example.org/bare.git").with_heads(false)),
        );
        let tooling = Arc::new(MockTooling::default());
        let use_case = SyncProjectUseCase::new(Arc::new(StaticConfig::new(config)), tooling.clone());

        let outcome = use_case.execute("bare").await.unwrap();

        assert_eq!(outcome, SyncOutcome::NothingMirrored);
        assert!(tooling.log().is_empty());
    }

    #[tokio::test]
    async fn test_clone_failure_is_reported_and_cleaned_up() {
        let h = harness(
            MockTooling::default().with_clone(Step::Fail(128, "fatal: repository not found")),
        );

        let err = h.use_case.execute("mirrored").await.unwrap_err();

        match &err {
            SyncError::Git { project, source } => {
                assert_eq!(project, "mirrored");
                assert_eq!(source.output(), Some("fatal: repository not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!h.tooling.log().iter().any(|l| l.starts_with("push")));
        assert_eq!(scratch_entries(&h), 0);
        assert_eq!(h.audit.types(), vec!["project_sync_failed"]);
    }

    #[tokio::test]
    async fn test_push_failure_stops_before_prune() {
        let h = harness(MockTooling::default().with_push(Step::Fail(1, "! [remote rejected]")));

        assert!(h.use_case.execute("mirrored").await.is_err());

        let log = h.tooling.log();
        assert_eq!(log.last().unwrap(), "push downstream --all --force");
        assert!(!log.iter().any(|l| l.starts_with("ls-remote")));
        assert_eq!(scratch_entries(&h), 0);
    }

    #[tokio::test]
    async fn test_scratch_failure_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let mut config = relay_config(root.path());
        config.daemon.scratch_root = blocker;
        let tooling = Arc::new(MockTooling::default());
        let use_case = SyncProjectUseCase::new(Arc::new(StaticConfig::new(config)), tooling.clone());

        let err = use_case.execute("mirrored").await.unwrap_err();

        assert!(matches!(err, SyncError::Scratch { .. }));
        assert!(tooling.log().is_empty());
    }
}
