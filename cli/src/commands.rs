//! Subcommand handlers.
//!
//! Each handler wires the infrastructure adapters into the application use
//! cases (dependency injection happens here and nowhere else).

use anyhow::{Context, Result, bail};
use relay_application::{
    AuditLogger, EventStreamConnector, NoAuditLogger, PropagateChangeUseCase, PropagationOutcome,
    RelayConfig, RelayService, SyncOutcome, SyncProjectUseCase, event_channel,
};
use relay_domain::{CommentAdded, RawEvent};
use relay_infrastructure::{
    ConfigLoader, FileConfigSource, JsonlAuditLogger, ProcessTooling, SshCommandChannel,
    SshEventFeed,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Open the audit log, or a no-op logger when none was requested.
pub fn audit_logger(path: Option<&Path>) -> Result<Arc<dyn AuditLogger>> {
    match path {
        Some(path) => {
            let logger = JsonlAuditLogger::open(path)
                .with_context(|| format!("cannot open audit log {}", path.display()))?;
            info!("Audit log: {}", logger.path().display());
            Ok(Arc::new(logger))
        }
        None => Ok(Arc::new(NoAuditLogger)),
    }
}

fn propagate_use_case(
    config: &RelayConfig,
    config_path: Option<PathBuf>,
    audit: Arc<dyn AuditLogger>,
) -> PropagateChangeUseCase {
    PropagateChangeUseCase::new(
        Arc::new(FileConfigSource::new(config_path)),
        Arc::new(SshCommandChannel::new(config.downstream.clone())),
        Arc::new(SshCommandChannel::new(config.upstream.clone())),
        Arc::new(ProcessTooling::discover()),
    )
    .with_audit_logger(audit)
}

fn sync_use_case(config_path: Option<PathBuf>, audit: Arc<dyn AuditLogger>) -> SyncProjectUseCase {
    SyncProjectUseCase::new(
        Arc::new(FileConfigSource::new(config_path)),
        Arc::new(ProcessTooling::discover()),
    )
    .with_audit_logger(audit)
}

/// `run`: stream downstream (and, with sync enabled, upstream) events until
/// Ctrl+C or SIGTERM.
pub async fn run(config_path: Option<PathBuf>, audit: Arc<dyn AuditLogger>) -> Result<()> {
    let config = ConfigLoader::load_relay_config(config_path.as_deref())?;
    info!(
        "Relaying {} -> {} ({} projects configured)",
        config.downstream.destination(),
        config.upstream.destination(),
        config.projects.len()
    );

    let propagate = Arc::new(propagate_use_case(
        &config,
        config_path.clone(),
        Arc::clone(&audit),
    ));
    let (tx, queue) = event_channel();
    let cancel = CancellationToken::new();

    let mut connectors = vec![
        EventStreamConnector::new(Arc::new(SshEventFeed::new(config.downstream.clone())), tx)
            .with_reconnect_delay(config.daemon.reconnect_delay)
            .with_audit_logger(Arc::clone(&audit))
            .spawn(cancel.clone()),
    ];

    let mut service = RelayService::new(queue, propagate, &config.daemon);
    if config.daemon.sync {
        info!(
            "Watching {} for ref updates (sync delay {}s)",
            config.upstream.destination(),
            config.daemon.sync_delay.as_secs()
        );
        let (upstream_tx, upstream_queue) = event_channel();
        connectors.push(
            EventStreamConnector::new(
                Arc::new(SshEventFeed::new(config.upstream.clone())),
                upstream_tx,
            )
            .with_reconnect_delay(config.daemon.reconnect_delay)
            .with_audit_logger(Arc::clone(&audit))
            .spawn(cancel.clone()),
        );
        let sync = Arc::new(sync_use_case(config_path, audit));
        service = service.with_upstream(upstream_queue, sync);
    }

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    let stats = service.run(cancel.clone()).await;

    cancel.cancel();
    for connector in connectors {
        if let Err(e) = connector.await {
            warn!("Event stream connector ended abnormally: {}", e);
        }
    }

    info!(
        "Shutdown complete: {} events, {} comment-added, {} dispatched, {} malformed, {} syncs",
        stats.received, stats.comments, stats.dispatched, stats.malformed, stats.syncs
    );
    Ok(())
}

/// `propagate`: run a single attempt for an event read from a file or stdin.
pub async fn propagate(
    config_path: Option<PathBuf>,
    event_path: &Path,
    audit: Arc<dyn AuditLogger>,
) -> Result<()> {
    let config = ConfigLoader::load_relay_config(config_path.as_deref())?;
    let text = read_event(event_path)?;
    let event = RawEvent::parse(text.trim()).context("event is not valid JSON")?;
    let comment = CommentAdded::from_event(&event)?;

    let outcome = propagate_use_case(&config, config_path, audit)
        .execute(&comment)
        .await?;

    match outcome {
        PropagationOutcome::Sent { url } => println!("sent: {}", url),
        PropagationOutcome::Failed { message } => bail!("{}", message),
        other => println!("{}", other.as_str()),
    }
    Ok(())
}

/// `sync`: mirror one project from its source repository right away.
pub async fn sync(
    config_path: Option<PathBuf>,
    project: &str,
    audit: Arc<dyn AuditLogger>,
) -> Result<()> {
    // Fail on a bad configuration before touching any repository
    ConfigLoader::load_relay_config(config_path.as_deref())?;

    match sync_use_case(config_path, audit).execute(project).await? {
        SyncOutcome::Synced { pruned } if pruned.is_empty() => println!("synced"),
        SyncOutcome::Synced { pruned } => println!("synced, pruned: {}", pruned.join(" ")),
        SyncOutcome::NotMirrored => bail!("project {} has no source repository", project),
        other => println!("{}", other.as_str()),
    }
    Ok(())
}

fn read_event(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("cannot read event from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("cannot read event file {}", path.display()))
    }
}

/// `check-config`: show where configuration comes from and what it resolves to.
pub fn check_config(config_path: Option<&Path>) -> Result<()> {
    ConfigLoader::print_config_sources(config_path);
    let config = ConfigLoader::load_relay_config(config_path)?;

    println!();
    println!("Downstream: {}", config.downstream.destination());
    println!("Upstream:   {}", config.upstream.destination());
    println!("Trigger:    {}", config.trigger);
    println!(
        "Workers:    {} (propagation {})",
        config.daemon.workers,
        if config.daemon.propagate { "enabled" } else { "disabled" }
    );
    println!("Scratch:    {}", config.daemon.scratch_root.display());
    println!(
        "Sync:       {}",
        if config.daemon.sync {
            format!("{}s after upstream ref updates", config.daemon.sync_delay.as_secs())
        } else {
            "disabled".to_string()
        }
    );
    println!();

    if config.projects.is_empty() {
        println!("No projects configured; nothing will be propagated.");
    }
    for project in &config.projects {
        if let Some(mirror) = &project.mirror {
            println!("  {}: mirrored from {}", project.name, mirror.url);
        }
        if !project.upstream {
            println!("  {} (not propagated)", project.name);
            continue;
        }
        let labels: Vec<String> = config
            .labels_for(project)
            .iter()
            .map(|l| format!("{} [{}..{}]", l.name, l.min, l.max))
            .collect();
        let labels = if labels.is_empty() {
            "no label requirements".to_string()
        } else {
            labels.join(", ")
        };
        println!("  {}: {}", project.name, labels);
    }
    Ok(())
}

/// Resolve when the process receives Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
