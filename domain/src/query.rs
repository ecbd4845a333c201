//! Parsing of `gerrit query --format JSON` output.
//!
//! The server prints one JSON object per line: one row per matching change,
//! followed by a `stats` row that is always present.

use crate::core::error::DomainError;
use crate::review::Approval;
use crate::wire::LooseInt;
use serde::Deserialize;

#[derive(Deserialize)]
struct WireChange {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "patchSets")]
    patch_sets: Vec<WirePatchSet>,
}

#[derive(Deserialize)]
struct WirePatchSet {
    number: LooseInt,
    #[serde(default)]
    approvals: Vec<WireApproval>,
}

#[derive(Deserialize)]
struct WireApproval {
    #[serde(rename = "type")]
    label: String,
    value: LooseInt,
}

/// Approvals recorded on one patchset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSetRecord {
    pub number: u32,
    pub approvals: Vec<Approval>,
}

/// One change row of a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub url: Option<String>,
    pub patch_sets: Vec<PatchSetRecord>,
}

impl ChangeRecord {
    /// Approvals attached to patchset `number` (empty when absent).
    pub fn approvals_for(&self, number: u32) -> Vec<Approval> {
        self.patch_sets
            .iter()
            .filter(|ps| ps.number == number)
            .flat_map(|ps| ps.approvals.iter().cloned())
            .collect()
    }
}

/// Parsed query output, without the trailing `stats` row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub changes: Vec<ChangeRecord>,
}

impl QueryResult {
    pub fn first(&self) -> Option<&ChangeRecord> {
        self.changes.first()
    }
}

/// Parse newline-delimited query output.
pub fn parse_query_output(output: &str) -> Result<QueryResult, DomainError> {
    let mut changes = Vec::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| DomainError::QueryParse(format!("{}: {}", e, line)))?;

        match value.get("type").and_then(|t| t.as_str()) {
            Some("stats") => continue,
            Some("error") => {
                let message = value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown query error");
                return Err(DomainError::QueryParse(message.to_string()));
            }
            _ => {}
        }

        let wire = WireChange::deserialize(&value)
            .map_err(|e| DomainError::QueryParse(e.to_string()))?;
        changes.push(convert_change(wire)?);
    }

    Ok(QueryResult { changes })
}

fn convert_change(wire: WireChange) -> Result<ChangeRecord, DomainError> {
    let mut patch_sets = Vec::with_capacity(wire.patch_sets.len());

    for ps in wire.patch_sets {
        let number = ps
            .number
            .as_i64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                DomainError::QueryParse(format!("invalid patchset number '{}'", ps.number.raw()))
            })?;

        let approvals = ps
            .approvals
            .into_iter()
            .map(|a| -> Result<Approval, DomainError> {
                let value = a
                    .value
                    .as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .ok_or_else(|| DomainError::InvalidApprovalValue(a.value.raw()))?;
                Ok(Approval::new(a.label, value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        patch_sets.push(PatchSetRecord { number, approvals });
    }

    Ok(ChangeRecord {
        url: wire.url,
        patch_sets,
    })
}
