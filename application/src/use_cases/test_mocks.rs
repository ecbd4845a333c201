//! In-memory port implementations shared by the use case tests.

use crate::config::{DaemonParams, RelayConfig};
use crate::ports::audit_logger::{AuditEvent, AuditLogger};
use crate::ports::command_channel::{ChannelError, CommandChannel, CommandOutput};
use crate::ports::event_feed::{EventFeed, EventSession, FeedError};
use crate::ports::local_repo::{
    CloneOptions, LocalTooling, PushOptions, RemoteRefsOptions, ReviewTool, Vcs, VcsError,
};
use async_trait::async_trait;
use relay_domain::{
    CommentAdded, GitIdentity, LabelSpec, RawEvent, Remote, ReviewProject, ServerCommand,
    SourceMirror,
};
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==================== Fixtures ====================

pub fn downstream() -> Remote {
    Remote::new("review.internal", "relay")
}

pub fn upstream() -> Remote {
    Remote::new("review.upstream.org", "relay-bot").with_port(29419)
}

/// `demo` is upstream-eligible with the default `Code-Review` label,
/// `strict` additionally requires `Verified`, `local` stays downstream and
/// `mirrored` is re-synced from its source with heads and tags.
pub fn relay_config(scratch_root: &Path) -> RelayConfig {
    RelayConfig::new(downstream(), upstream())
        .with_git_identity(GitIdentity::new("Relay Bot", "relay@example.org"))
        .with_default_labels(vec![LabelSpec::new("Code-Review", -2, 2).unwrap()])
        .with_project(ReviewProject::new("demo").upstream())
        .with_project(ReviewProject::new("strict").upstream().with_labels(vec![
            LabelSpec::new("Code-Review", -2, 2).unwrap(),
            LabelSpec::new("Verified", -1, 1).unwrap(),
        ]))
        .with_project(ReviewProject::new("local"))
        .with_project(ReviewProject::new("mirrored").with_mirror(
            SourceMirror::new("https://git.example.org/mirrored.git")
                .with_tags(true)
                .with_preserve_prefix("internal/"),
        ))
        .with_daemon(
            DaemonParams::default()
                .with_workers(2)
                .with_poll_interval(Duration::from_millis(5))
                .with_scratch_root(scratch_root),
        )
}

pub fn comment_added_json(project: &str, comment: &str) -> Value {
    json!({
        "type": "comment-added",
        "change": {
            "id": "I8473b95934b5732ac55d26311a706c9c2bde9940",
            "project": project,
            "branch": "master",
            "topic": "relay",
            "owner": {
                "username": "alice",
                "name": "Alice",
                "email": "alice@example.org"
            }
        },
        "patchSet": { "number": "3", "revision": "5a3f0e1c" },
        "comment": comment
    })
}

pub fn comment_added(project: &str, comment: &str) -> CommentAdded {
    CommentAdded::from_event(&RawEvent::from_value(comment_added_json(project, comment))).unwrap()
}

/// `gerrit query --all-approvals` output for one change.
pub fn approvals_output(patch_sets: &[(u32, &[(&str, &str)])]) -> String {
    let patch_sets: Vec<Value> = patch_sets
        .iter()
        .map(|(number, approvals)| {
            let approvals: Vec<Value> = approvals
                .iter()
                .map(|(label, value)| json!({ "type": label, "value": value }))
                .collect();
            json!({ "number": number.to_string(), "approvals": approvals })
        })
        .collect();
    format!(
        "{}\n{}\n",
        json!({ "project": "demo", "patchSets": patch_sets }),
        json!({ "type": "stats", "rowCount": 1 })
    )
}

pub fn ref_updated_json(project: &str) -> Value {
    json!({
        "type": "ref-updated",
        "refUpdate": {
            "oldRev": "5a3f0e1c",
            "newRev": "b7f0d5c1",
            "refName": "refs/heads/master",
            "project": project
        }
    })
}

pub fn url_output(url: &str) -> String {
    format!(
        "{}\n{}\n",
        json!({ "project": "demo", "url": url }),
        json!({ "type": "stats", "rowCount": 1 })
    )
}

// ==================== Test Mocks ====================

type Responder = Box<dyn Fn(&ServerCommand) -> Result<CommandOutput, ChannelError> + Send + Sync>;

/// Records every command and answers from a closure.
pub struct MockChannel {
    remote: Remote,
    calls: Mutex<Vec<ServerCommand>>,
    responder: Responder,
    delay: Option<Duration>,
}

impl MockChannel {
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            calls: Mutex::new(Vec::new()),
            responder: Box::new(|_| Ok(CommandOutput::success(""))),
            delay: None,
        }
    }

    pub fn respond_with(
        mut self,
        responder: impl Fn(&ServerCommand) -> Result<CommandOutput, ChannelError> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }

    /// Answer `query` commands with `output`, everything else with success.
    pub fn answer_queries(self, output: String) -> Self {
        self.respond_with(move |cmd| {
            if cmd.args().get(1).map(String::as_str) == Some("query") {
                Ok(CommandOutput::success(output.clone()))
            } else {
                Ok(CommandOutput::success(""))
            }
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ServerCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Messages of every `gerrit review -m <msg> <rev>` call.
    pub fn comments(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|c| c.args().get(1).map(String::as_str) == Some("review"))
            .filter_map(|c| c.args().get(3).cloned())
            .collect()
    }
}

#[async_trait]
impl CommandChannel for MockChannel {
    fn remote(&self) -> &Remote {
        &self.remote
    }

    async fn execute(&self, command: &ServerCommand) -> Result<CommandOutput, ChannelError> {
        self.calls.lock().unwrap().push(command.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(command)
    }
}

/// Scripted outcome of one local tool step.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Ok,
    Fail(i32, &'static str),
    Spawn,
}

impl Step {
    fn run(self, command: &str) -> Result<(), VcsError> {
        match self {
            Step::Ok => Ok(()),
            Step::Fail(status, output) => Err(VcsError::CommandFailed {
                command: command.to_string(),
                status,
                output: output.to_string(),
            }),
            Step::Spawn => Err(VcsError::Spawn {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            }),
        }
    }
}

/// Hands out recording VCS and review-tool mocks.
pub struct MockTooling {
    log: Arc<Mutex<Vec<String>>>,
    dirs: Arc<Mutex<Vec<PathBuf>>>,
    refs: Arc<HashMap<String, BTreeSet<String>>>,
    init: Step,
    clone: Step,
    push: Step,
    download: Step,
    upload: Step,
}

impl Default for MockTooling {
    fn default() -> Self {
        Self {
            log: Arc::default(),
            dirs: Arc::default(),
            refs: Arc::default(),
            init: Step::Ok,
            clone: Step::Ok,
            push: Step::Ok,
            download: Step::Ok,
            upload: Step::Ok,
        }
    }
}

impl MockTooling {
    pub fn with_init(mut self, step: Step) -> Self {
        self.init = step;
        self
    }

    pub fn with_clone(mut self, step: Step) -> Self {
        self.clone = step;
        self
    }

    pub fn with_push(mut self, step: Step) -> Self {
        self.push = step;
        self
    }

    pub fn with_download(mut self, step: Step) -> Self {
        self.download = step;
        self
    }

    pub fn with_upload(mut self, step: Step) -> Self {
        self.upload = step;
        self
    }

    /// Refs `ls-remote <remote>` reports, regardless of namespace flags.
    pub fn with_remote_refs(mut self, remote: &str, refs: &[&str]) -> Self {
        Arc::make_mut(&mut self.refs).insert(
            remote.to_string(),
            refs.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Working directories tools were bound to.
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().unwrap().clone()
    }
}

impl LocalTooling for MockTooling {
    fn vcs(&self, dir: &Path) -> Box<dyn Vcs> {
        self.dirs.lock().unwrap().push(dir.to_path_buf());
        Box::new(MockVcs {
            dir: dir.to_path_buf(),
            log: Arc::clone(&self.log),
            refs: Arc::clone(&self.refs),
            init: self.init,
            clone: self.clone,
            push: self.push,
        })
    }

    fn review_tool(&self, dir: &Path) -> Box<dyn ReviewTool> {
        Box::new(MockReviewTool {
            dir: dir.to_path_buf(),
            log: Arc::clone(&self.log),
            download: self.download,
            upload: self.upload,
        })
    }
}

struct MockVcs {
    dir: PathBuf,
    log: Arc<Mutex<Vec<String>>>,
    refs: Arc<HashMap<String, BTreeSet<String>>>,
    init: Step,
    clone: Step,
    push: Step,
}

impl MockVcs {
    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Vcs for MockVcs {
    async fn init(&self) -> Result<(), VcsError> {
        self.record("init".into());
        self.init.run("git init")
    }

    async fn add_remote(&self, name: &str, url: &str) -> Result<(), VcsError> {
        self.record(format!("remote add {} {}", name, url));
        Ok(())
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<(), VcsError> {
        self.record(format!("config {} {}", key, value));
        Ok(())
    }

    async fn push(&self, remote: &str, options: &PushOptions) -> Result<(), VcsError> {
        let mut entry = format!("push {}", remote);
        for (set, flag) in [(options.all, "--all"), (options.tags, "--tags"), (options.force, "--force")] {
            if set {
                entry.push(' ');
                entry.push_str(flag);
            }
        }
        for refspec in &options.refspecs {
            entry.push(' ');
            entry.push_str(refspec);
        }
        self.record(entry);
        self.push.run("git push")
    }

    async fn clone_from(&self, source: &str, options: &CloneOptions) -> Result<(), VcsError> {
        assert!(self.dir.is_dir(), "scratch dir missing during clone");
        self.record(format!(
            "clone{} {} {}",
            if options.bare { " --bare" } else { "" },
            source,
            options.target.as_deref().unwrap_or("-")
        ));
        self.clone.run("git clone")
    }

    async fn remote_refs(
        &self,
        remote: &str,
        _options: RemoteRefsOptions,
    ) -> Result<BTreeSet<String>, VcsError> {
        self.record(format!("ls-remote {}", remote));
        Ok(self.refs.get(remote).cloned().unwrap_or_default())
    }
}

struct MockReviewTool {
    dir: PathBuf,
    log: Arc<Mutex<Vec<String>>>,
    download: Step,
    upload: Step,
}

#[async_trait]
impl ReviewTool for MockReviewTool {
    async fn download(&self, remote: &str, change_ref: &str) -> Result<(), VcsError> {
        assert!(self.dir.is_dir(), "scratch dir missing during download");
        self.log
            .lock()
            .unwrap()
            .push(format!("download {} {}", remote, change_ref));
        self.download.run("git-review -d")
    }

    async fn upload(
        &self,
        remote: &str,
        branch: &str,
        topic: Option<&str>,
    ) -> Result<(), VcsError> {
        self.log.lock().unwrap().push(format!(
            "upload {} {} {}",
            remote,
            branch,
            topic.unwrap_or("-")
        ));
        self.upload.run("git-review -R")
    }
}

/// Records audit events by type.
#[derive(Default)]
pub struct MockAudit {
    events: Mutex<Vec<(String, Value)>>,
}

impl MockAudit {
    pub fn types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub fn payloads(&self, event_type: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == event_type)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl AuditLogger for MockAudit {
    fn log(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type.to_string(), event.payload));
    }
}

/// How a scripted session ends once its lines run out.
#[derive(Debug, Clone, Copy)]
enum SessionEnd {
    Clean,
    Fail,
    FailAfter(Duration),
    Hang,
}

/// Behavior of one `connect` call on [`MockFeed`].
pub struct SessionScript {
    refuse: bool,
    lines: Vec<String>,
    end: SessionEnd,
}

impl SessionScript {
    pub fn lines(lines: &[&str]) -> Self {
        Self {
            refuse: false,
            lines: lines.iter().map(|l| l.to_string()).collect(),
            end: SessionEnd::Clean,
        }
    }

    pub fn refuse() -> Self {
        Self {
            refuse: true,
            lines: Vec::new(),
            end: SessionEnd::Clean,
        }
    }

    pub fn fail(mut self) -> Self {
        self.end = SessionEnd::Fail;
        self
    }

    pub fn fail_after(mut self, delay: Duration) -> Self {
        self.end = SessionEnd::FailAfter(delay);
        self
    }

    pub fn hang(mut self) -> Self {
        self.end = SessionEnd::Hang;
        self
    }
}

/// Event feed playing back one script per connection; once the scripts run
/// out every session stays open without emitting lines.
pub struct MockFeed {
    scripts: Mutex<VecDeque<SessionScript>>,
    connects: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl MockFeed {
    pub fn new(scripts: Vec<SessionScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            connects: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventFeed for MockFeed {
    async fn connect(&self) -> Result<Box<dyn EventSession>, FeedError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| SessionScript::lines(&[]).hang());

        if script.refuse {
            return Err(FeedError::Connect("connection refused".into()));
        }

        Ok(Box::new(MockSession {
            lines: script.lines.into(),
            end: script.end,
            closes: Arc::clone(&self.closes),
        }))
    }

    fn describe(&self) -> String {
        "mock feed".into()
    }
}

struct MockSession {
    lines: VecDeque<String>,
    end: SessionEnd,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl EventSession for MockSession {
    async fn next_line(&mut self) -> Result<Option<String>, FeedError> {
        if let Some(line) = self.lines.pop_front() {
            return Ok(Some(line));
        }
        match self.end {
            SessionEnd::Clean => Ok(None),
            SessionEnd::Fail => Err(FeedError::Exited(255)),
            SessionEnd::FailAfter(delay) => {
                tokio::time::sleep(delay).await;
                Err(FeedError::Exited(255))
            }
            SessionEnd::Hang => std::future::pending::<Result<Option<String>, FeedError>>().await,
        }
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
