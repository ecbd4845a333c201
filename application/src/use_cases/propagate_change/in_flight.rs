//! Per-change mutual exclusion for propagation attempts.

use relay_domain::CommentAdded;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Identity of one change on the review server.
///
/// The change id alone is not unique: cherry-picks to other branches reuse
/// it, so project and branch are part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeKey {
    pub project: String,
    pub branch: String,
    pub change_id: String,
}

impl ChangeKey {
    pub fn new(
        project: impl Into<String>,
        branch: impl Into<String>,
        change_id: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            branch: branch.into(),
            change_id: change_id.into(),
        }
    }

    pub fn of(event: &CommentAdded) -> Self {
        Self::new(&event.project, &event.branch, &event.change_id)
    }
}

/// Changes with a propagation attempt in progress.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct InFlightChanges {
    keys: Arc<Mutex<HashSet<ChangeKey>>>,
}

impl InFlightChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` when another attempt already holds it.
    pub fn try_acquire(&self, key: ChangeKey) -> Option<InFlightGuard> {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    pub fn contains(&self, key: &ChangeKey) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its change when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<ChangeKey>>>,
    key: ChangeKey,
}

impl InFlightGuard {
    pub fn key(&self) -> &ChangeKey {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}
