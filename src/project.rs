//! Caller-owned project snapshots.
//!
//! The engine never mutates a `Project` in place: every transition produces a
//! new snapshot, and the caller applies it optimistically. The engine only
//! reads the fields modeled here.

use crate::phase::WorkflowPhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Approval record for one gated phase artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalState {
    /// The phase's artifact has been generated.
    pub generated: bool,
    /// The artifact has been approved by the caller.
    pub approved: bool,
}

impl ApprovalState {
    /// Both generated and approved.
    pub fn is_complete(&self) -> bool {
        self.generated && self.approved
    }
}

/// The phases that carry an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKey {
    Requirements,
    Design,
    Tasks,
}

impl ApprovalKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalKey::Requirements => "requirements",
            ApprovalKey::Design => "design",
            ApprovalKey::Tasks => "tasks",
        }
    }

    /// The approval key owned by a phase, if that phase is gated.
    pub fn for_phase(phase: WorkflowPhase) -> Option<ApprovalKey> {
        match phase {
            WorkflowPhase::Requirements => Some(ApprovalKey::Requirements),
            WorkflowPhase::Design => Some(ApprovalKey::Design),
            WorkflowPhase::Tasks => Some(ApprovalKey::Tasks),
            WorkflowPhase::Init | WorkflowPhase::Implementation => None,
        }
    }
}

impl std::fmt::Display for ApprovalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-phase approval records for the three gated artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseApprovals {
    pub requirements: ApprovalState,
    pub design: ApprovalState,
    pub tasks: ApprovalState,
}

impl PhaseApprovals {
    pub fn get(&self, key: ApprovalKey) -> &ApprovalState {
        match key {
            ApprovalKey::Requirements => &self.requirements,
            ApprovalKey::Design => &self.design,
            ApprovalKey::Tasks => &self.tasks,
        }
    }

    pub fn get_mut(&mut self, key: ApprovalKey) -> &mut ApprovalState {
        match key {
            ApprovalKey::Requirements => &mut self.requirements,
            ApprovalKey::Design => &mut self.design,
            ApprovalKey::Tasks => &mut self.tasks,
        }
    }
}

/// A project snapshot as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Stable identifier used to correlate audit entries.
    pub id: String,
    /// Human-readable project name.
    pub name: String,
    /// Current workflow phase.
    pub phase: WorkflowPhase,
    /// Approval records for the gated phases.
    pub approvals: PhaseApprovals,
    /// Timestamp of the last snapshot update.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates a fresh project at the Init phase with no approvals.
    pub fn new(id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phase: WorkflowPhase::Init,
            approvals: PhaseApprovals::default(),
            updated_at: now,
        }
    }

    /// Returns a new snapshot with the phase replaced and the timestamp
    /// refreshed. The original is left untouched.
    pub fn with_phase(&self, phase: WorkflowPhase, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.phase = phase;
        next.updated_at = now;
        next
    }

    /// Returns a new snapshot with one approval record replaced.
    pub fn with_approval(&self, key: ApprovalKey, state: ApprovalState) -> Self {
        let mut next = self.clone();
        *next.approvals.get_mut(key) = state;
        next
    }
}
