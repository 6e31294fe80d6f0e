//! Audit journal rows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Succeeded,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Succeeded => "succeeded",
            AuditOutcome::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(AuditOutcome::Succeeded),
            "failed" => Some(AuditOutcome::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operation about to be written to the journal.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub operation: String,
    pub course_ids: Vec<i64>,
    pub reason: Option<String>,
    pub outcome: AuditOutcome,
    pub message: String,
    pub actor: Option<String>,
}

/// A stored journal row.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub operation_id: Uuid,
    pub operation: String,
    pub course_ids: Vec<i64>,
    pub reason: Option<String>,
    pub outcome: AuditOutcome,
    pub message: String,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}
