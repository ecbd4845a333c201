//! Label voting model
//!
//! Reproduces the "max with block" submit rule of Gerrit: a label passes when
//! somebody cast the highest vote and nobody cast the lowest one.

use super::approval::Approval;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Configured requirement for one label: its name and voting range.
///
/// `min` is the blocking vote and `max` the approving vote, so a usable
/// requirement always has `min < max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub name: String,
    pub min: i32,
    pub max: i32,
}

impl LabelSpec {
    /// Create a validated label requirement.
    pub fn new(name: impl Into<String>, min: i32, max: i32) -> Result<Self, DomainError> {
        let spec = Self {
            name: name.into(),
            min,
            max,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Reject zero-slack or inverted ranges.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.min >= self.max {
            return Err(DomainError::InvalidLabelBounds {
                name: self.name.clone(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Accumulator of the votes observed on one label.
///
/// # Example
///
/// ```
/// use relay_domain::{Approval, Label};
///
/// let mut label = Label::new("Code-Review", -2, 2);
/// label.add_approval(&Approval::new("Code-Review", 2));
/// assert!(label.approved());
///
/// label.add_approval(&Approval::new("Code-Review", -2));
/// assert!(!label.approved()); // a single block vetoes
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    name: String,
    min: i32,
    max: i32,
    values: Vec<i32>,
}

impl Label {
    pub fn new(name: impl Into<String>, min: i32, max: i32) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            values: Vec::new(),
        }
    }

    pub fn from_spec(spec: &LabelSpec) -> Self {
        Self::new(spec.name.clone(), spec.min, spec.max)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Record a vote. Callers route approvals by label name before calling.
    pub fn add_approval(&mut self, approval: &Approval) {
        self.values.push(approval.value);
    }

    /// Max-with-block decision.
    ///
    /// The block check runs before the max check: a lowest-possible vote
    /// fails the label even when a highest-possible vote is also present.
    pub fn approved(&self) -> bool {
        let (Some(lowest), Some(highest)) =
            (self.values.iter().min(), self.values.iter().max())
        else {
            return false;
        };

        if *lowest <= self.min {
            return false;
        }

        *highest >= self.max
    }
}

/// All labels required for one project, evaluated together.
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    pub fn from_specs(specs: &[LabelSpec]) -> Self {
        Self {
            labels: specs.iter().map(Label::from_spec).collect(),
        }
    }

    /// Route each approval to the label with the exact same name.
    ///
    /// Approvals on labels that are not required are ignored.
    pub fn add_approvals<'a>(&mut self, approvals: impl IntoIterator<Item = &'a Approval>) {
        for approval in approvals {
            if let Some(label) = self.labels.iter_mut().find(|l| l.name == approval.label) {
                label.add_approval(approval);
            }
        }
    }

    /// True when every required label is approved (vacuously true when empty).
    pub fn approved(&self) -> bool {
        self.labels.iter().all(Label::approved)
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Names of the labels that did not pass
    pub fn unapproved(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .filter(|l| !l.approved())
            .map(|l| l.name.as_str())
    }
}
