//! Workflow phases and their fixed linear ordering.
//!
//! The specification workflow is a straight line: Init → Requirements →
//! Design → Tasks → Implementation. All transition legality is derived from
//! this ordering plus the approval records on the project snapshot; the
//! phase enum itself only knows its neighbors.

use serde::{Deserialize, Serialize};

/// A stage of the specification workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowPhase {
    Init,
    Requirements,
    Design,
    Tasks,
    Implementation,
}

impl WorkflowPhase {
    /// All phases in workflow order.
    pub const ALL: [WorkflowPhase; 5] = [
        WorkflowPhase::Init,
        WorkflowPhase::Requirements,
        WorkflowPhase::Design,
        WorkflowPhase::Tasks,
        WorkflowPhase::Implementation,
    ];

    /// Zero-based position of this phase in the workflow order.
    pub fn index(&self) -> usize {
        match self {
            WorkflowPhase::Init => 0,
            WorkflowPhase::Requirements => 1,
            WorkflowPhase::Design => 2,
            WorkflowPhase::Tasks => 3,
            WorkflowPhase::Implementation => 4,
        }
    }

    /// The phase that follows this one, or `None` at the terminal end.
    pub fn next(&self) -> Option<WorkflowPhase> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The phase that precedes this one, or `None` at the start.
    pub fn previous(&self) -> Option<WorkflowPhase> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Human-readable label for display and denial messages.
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowPhase::Init => "Init",
            WorkflowPhase::Requirements => "Requirements",
            WorkflowPhase::Design => "Design",
            WorkflowPhase::Tasks => "Tasks",
            WorkflowPhase::Implementation => "Implementation",
        }
    }

    /// Lowercase label used in denial messages ("before tasks phase").
    pub fn label_lower(&self) -> &'static str {
        match self {
            WorkflowPhase::Init => "init",
            WorkflowPhase::Requirements => "requirements",
            WorkflowPhase::Design => "design",
            WorkflowPhase::Tasks => "tasks",
            WorkflowPhase::Implementation => "implementation",
        }
    }
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
