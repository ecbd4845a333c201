//! Review-server commands as structured argument lists.
//!
//! Arguments are kept separate; quoting them for a remote shell is the job of
//! the command channel that sends them.

/// A command understood by the review server's SSH interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    args: Vec<String>,
}

impl ServerCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Long-lived event feed.
    pub fn stream_events() -> Self {
        Self::new(["gerrit", "stream-events"])
    }

    /// Post `message` as a review comment on `revision`.
    pub fn review(message: &str, revision: &str) -> Self {
        Self::new(["gerrit", "review", "-m", message, revision])
    }

    /// Query one change including the approvals of all its patchsets.
    pub fn query_approvals(change_id: &str, branch: &str, project: &str) -> Self {
        let mut command = Self::query_change(change_id, branch, project);
        command
            .args
            .splice(5..5, ["--all-approvals".to_string(), "limit:1".to_string()]);
        command
    }

    /// Query one change (used to find its URL).
    pub fn query_change(change_id: &str, branch: &str, project: &str) -> Self {
        Self::new([
            "gerrit".to_string(),
            "query".to_string(),
            format!("change:{}", change_id),
            format!("branch:{}", branch),
            format!("project:{}", project),
            "--format".to_string(),
            "JSON".to_string(),
        ])
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }

    /// First two words, for log lines that must not echo comment bodies
    pub fn summary(&self) -> String {
        self.args
            .iter()
            .take(2)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for ServerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}
