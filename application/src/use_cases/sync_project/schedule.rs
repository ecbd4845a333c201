//! Pending mirror syncs.

use std::collections::HashMap;
use tokio::time::Instant;

/// Projects waiting for a sync, with the instant each becomes due.
///
/// A project has at most one pending entry; bursts of ref updates collapse
/// into the first scheduled sync.
#[derive(Debug, Default)]
pub struct SyncSchedule {
    due: HashMap<String, Instant>,
}

impl SyncSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `project` at `at`. Returns `false` when it was already pending.
    pub fn schedule(&mut self, project: &str, at: Instant) -> bool {
        if self.due.contains_key(project) {
            return false;
        }
        self.due.insert(project.to_string(), at);
        true
    }

    /// Remove and return every project due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        let mut ready: Vec<(Instant, String)> = self
            .due
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(project, at)| (*at, project.clone()))
            .collect();
        ready.sort();
        for (_, project) in &ready {
            self.due.remove(project);
        }
        ready.into_iter().map(|(_, project)| project).collect()
    }

    pub fn len(&self) -> usize {
        self.due.len()
    }

    pub fn is_empty(&self) -> bool {
        self.due.is_empty()
    }
}
