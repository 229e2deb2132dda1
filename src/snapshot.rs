//! The JSON snapshot exchanged with an external persistence layer.
//!
//! The engine does no file I/O of its own: a snapshot writer serializes this
//! document after transitions, and a loader deserializes it back into a
//! [`Project`] on resume. The wire shape uses camelCase keys and
//! SCREAMING_SNAKE_CASE phase names.

use crate::phase::WorkflowPhase;
use crate::project::{ApprovalKey, ApprovalState, PhaseApprovals, Project};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Persisted status of one gated phase artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Pending,
    Generated,
    Approved,
}

impl PhaseStatus {
    fn from_approval(state: &ApprovalState) -> Self {
        if state.is_complete() {
            PhaseStatus::Approved
        } else if state.generated {
            PhaseStatus::Generated
        } else {
            PhaseStatus::Pending
        }
    }

    fn to_approval(self) -> ApprovalState {
        match self {
            PhaseStatus::Pending => ApprovalState {
                generated: false,
                approved: false,
            },
            PhaseStatus::Generated => ApprovalState {
                generated: true,
                approved: false,
            },
            PhaseStatus::Approved => ApprovalState {
                generated: true,
                approved: true,
            },
        }
    }
}

/// Persisted record for one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRecord {
    pub status: PhaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Time spent in the phase, in milliseconds, once it is left.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl PhaseRecord {
    fn new(status: PhaseStatus) -> Self {
        Self {
            status,
            started_at: None,
            approved_at: None,
            duration: None,
        }
    }
}

/// The full snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub current_phase: WorkflowPhase,
    /// Free-form workflow state marker, e.g. "active".
    pub state: String,
    pub phases: HashMap<WorkflowPhase, PhaseRecord>,
}

impl WorkflowSnapshot {
    /// Captures the governed fields of a project. Timestamps beyond the
    /// approval flags are not tracked by the engine and stay unset.
    pub fn from_project(project: &Project) -> Self {
        let mut phases = HashMap::new();
        for key in [
            ApprovalKey::Requirements,
            ApprovalKey::Design,
            ApprovalKey::Tasks,
        ] {
            let phase = match key {
                ApprovalKey::Requirements => WorkflowPhase::Requirements,
                ApprovalKey::Design => WorkflowPhase::Design,
                ApprovalKey::Tasks => WorkflowPhase::Tasks,
            };
            phases.insert(
                phase,
                PhaseRecord::new(PhaseStatus::from_approval(project.approvals.get(key))),
            );
        }
        Self {
            current_phase: project.phase,
            state: "active".to_string(),
            phases,
        }
    }

    /// Rebuilds a project snapshot. Identity fields are not persisted in the
    /// document and must be supplied by the caller; phases absent from the
    /// map resume as pending.
    pub fn into_project(
        self,
        id: impl Into<String>,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Project {
        let mut approvals = PhaseApprovals::default();
        for (phase, record) in &self.phases {
            if let Some(key) = ApprovalKey::for_phase(*phase) {
                *approvals.get_mut(key) = record.status.to_approval();
            }
        }
        Project {
            id: id.into(),
            name: name.into(),
            phase: self.current_phase,
            approvals,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_captures_approval_status() {
        let now = Utc::now();
        let project = Project::new("p-1", "demo", now)
            .with_phase(WorkflowPhase::Design, now)
            .with_approval(
                ApprovalKey::Requirements,
                ApprovalState {
                    generated: true,
                    approved: true,
                },
            )
            .with_approval(
                ApprovalKey::Design,
                ApprovalState {
                    generated: true,
                    approved: false,
                },
            );

        let snapshot = WorkflowSnapshot::from_project(&project);
        assert_eq!(snapshot.current_phase, WorkflowPhase::Design);
        assert_eq!(
            snapshot.phases[&WorkflowPhase::Requirements].status,
            PhaseStatus::Approved
        );
        assert_eq!(
            snapshot.phases[&WorkflowPhase::Design].status,
            PhaseStatus::Generated
        );
        assert_eq!(
            snapshot.phases[&WorkflowPhase::Tasks].status,
            PhaseStatus::Pending
        );
    }

    #[test]
    fn test_resume_restores_governed_fields() {
        let now = Utc::now();
        let project = Project::new("p-1", "demo", now)
            .with_phase(WorkflowPhase::Tasks, now)
            .with_approval(
                ApprovalKey::Requirements,
                ApprovalState {
                    generated: true,
                    approved: true,
                },
            )
            .with_approval(
                ApprovalKey::Design,
                ApprovalState {
                    generated: true,
                    approved: true,
                },
            );

        let snapshot = WorkflowSnapshot::from_project(&project);
        let resumed = snapshot.into_project("p-1", "demo", now);

        assert_eq!(resumed.phase, project.phase);
        assert_eq!(resumed.approvals, project.approvals);
    }

    #[test]
    fn test_wire_shape_uses_camel_case_and_phase_names() {
        let now = Utc::now();
        let project = Project::new("p-1", "demo", now).with_phase(WorkflowPhase::Requirements, now);
        let value = serde_json::to_value(WorkflowSnapshot::from_project(&project)).unwrap();

        assert_eq!(value["currentPhase"], json!("REQUIREMENTS"));
        assert_eq!(value["phases"]["REQUIREMENTS"]["status"], json!("pending"));
        // Unset timestamps are omitted, not null
        assert!(value["phases"]["REQUIREMENTS"]
            .as_object()
            .unwrap()
            .get("startedAt")
            .is_none());
    }

    #[test]
    fn test_partial_document_resumes_with_pending_defaults() {
        let snapshot: WorkflowSnapshot = serde_json::from_value(json!({
            "currentPhase": "REQUIREMENTS",
            "state": "active",
            "phases": {}
        }))
        .unwrap();

        let project = snapshot.into_project("p-1", "demo", Utc::now());
        assert_eq!(project.phase, WorkflowPhase::Requirements);
        assert_eq!(project.approvals, PhaseApprovals::default());
    }
}
