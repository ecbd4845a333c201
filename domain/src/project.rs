//! Per-project propagation and mirror settings

use crate::review::LabelSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A project known to the relay.
///
/// Only projects marked `upstream` are ever propagated. `labels` overrides the
/// global label requirements when present (an empty list means "no labels
/// required"). Projects with a `mirror` are re-synced from their source
/// repository when the upstream server reports a ref update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewProject {
    pub name: String,
    #[serde(default)]
    pub upstream: bool,
    #[serde(default)]
    pub labels: Option<Vec<LabelSpec>>,
    #[serde(default)]
    pub mirror: Option<SourceMirror>,
}

impl ReviewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            upstream: false,
            labels: None,
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, mirror: SourceMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn upstream(mut self) -> Self {
        self.upstream = true;
        self
    }

    pub fn with_labels(mut self, labels: Vec<LabelSpec>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// This project's label requirements, or `defaults` when it declares none.
    pub fn labels_or<'a>(&'a self, defaults: &'a [LabelSpec]) -> &'a [LabelSpec] {
        self.labels.as_deref().unwrap_or(defaults)
    }
}

/// Where a project's canonical history lives and which of its refs the
/// downstream server mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMirror {
    /// Clone URL of the canonical repository
    pub url: String,
    /// Mirror `refs/heads/*`
    pub heads: bool,
    /// Mirror `refs/tags/*`
    pub tags: bool,
    /// Force-push, overwriting diverged downstream refs
    pub force: bool,
    /// Downstream refs under `refs/heads/<prefix>` or `refs/tags/<prefix>`
    /// are never pruned.
    pub preserve_prefix: Option<String>,
}

impl SourceMirror {
    /// Heads mirrored with force, tags left alone.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heads: true,
            tags: false,
            force: true,
            preserve_prefix: None,
        }
    }

    pub fn with_heads(mut self, heads: bool) -> Self {
        self.heads = heads;
        self
    }

    pub fn with_tags(mut self, tags: bool) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_preserve_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.preserve_prefix = Some(prefix.into());
        self
    }

    /// Whether any ref namespace is mirrored at all.
    pub fn mirrors_anything(&self) -> bool {
        self.heads || self.tags
    }

    pub fn is_preserved(&self, ref_name: &str) -> bool {
        let Some(prefix) = &self.preserve_prefix else {
            return false;
        };
        ["refs/heads/", "refs/tags/"].iter().any(|namespace| {
            ref_name
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with(prefix.as_str()))
        })
    }

    /// Downstream refs absent from the source, minus preserved ones.
    pub fn refs_to_prune(
        &self,
        downstream: &BTreeSet<String>,
        source: &BTreeSet<String>,
    ) -> Vec<String> {
        downstream
            .difference(source)
            .filter(|r| !self.is_preserved(r))
            .cloned()
            .collect()
    }
}
