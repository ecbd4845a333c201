//! Label and project lists from TOML (`[[upstream_labels]]`, `[[projects]]`)

use relay_domain::{LabelSpec, ReviewProject, SourceMirror};
use serde::{Deserialize, Serialize};

/// Raw label requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLabelConfig {
    pub name: String,
    pub min: i32,
    pub max: i32,
}

impl FileLabelConfig {
    pub fn to_spec(&self) -> LabelSpec {
        LabelSpec {
            name: self.name.clone(),
            min: self.min,
            max: self.max,
        }
    }
}

/// Raw project entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProjectConfig {
    pub name: String,
    /// Changes of this project may be sent upstream
    #[serde(default)]
    pub upstream: bool,
    /// Overrides the global `[[upstream_labels]]`
    #[serde(default)]
    pub upstream_labels: Option<Vec<FileLabelConfig>>,
    /// Canonical repository the downstream copy is re-synced from
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "enabled")]
    pub heads: bool,
    #[serde(default)]
    pub tags: bool,
    #[serde(default = "enabled")]
    pub force: bool,
    /// Downstream-only refs under this prefix survive the prune
    #[serde(default)]
    pub preserve_prefix: Option<String>,
}

fn enabled() -> bool {
    true
}

impl FileProjectConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            upstream: false,
            upstream_labels: None,
            source: None,
            heads: true,
            tags: false,
            force: true,
            preserve_prefix: None,
        }
    }

    pub fn to_project(&self) -> ReviewProject {
        let mut project = ReviewProject::new(&self.name);
        project.upstream = self.upstream;
        project.labels = self
            .upstream_labels
            .as_ref()
            .map(|labels| labels.iter().map(FileLabelConfig::to_spec).collect());
        project.mirror = self.source.as_ref().map(|url| {
            let mut mirror = SourceMirror::new(url.trim())
                .with_heads(self.heads)
                .with_tags(self.tags)
                .with_force(self.force);
            mirror.preserve_prefix = self.preserve_prefix.clone();
            mirror
        });
        project
    }
}
