//! Append-only audit records for attempted phase transitions.

use crate::phase::WorkflowPhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable record of one attempted transition, success or failure.
///
/// Entries are owned exclusively by the state machine and never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowAuditEntry {
    pub id: Uuid,
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub from_phase: WorkflowPhase,
    pub to_phase: WorkflowPhase,
    /// Who or what requested the transition.
    pub triggered_by: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl WorkflowAuditEntry {
    pub(crate) fn new(
        project_id: &str,
        timestamp: DateTime<Utc>,
        from_phase: WorkflowPhase,
        to_phase: WorkflowPhase,
        triggered_by: &str,
        success: bool,
        error_message: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            timestamp,
            from_phase,
            to_phase,
            triggered_by: triggered_by.to_string(),
            success,
            error_message,
            metadata: None,
        }
    }
}
