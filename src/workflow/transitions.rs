//! The static phase transition table.
//!
//! Transitions are enumerated once: forward progression one step at a time,
//! gated on the source phase's approval record, plus one-step rollbacks that
//! are always permitted for workflow correction. Nothing else is legal —
//! skipping phases is rejected even when every approval happens to be true.

use crate::phase::WorkflowPhase;
use crate::project::{ApprovalKey, Project};

/// Why a transition was denied, and which approvals would unblock it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionDenial {
    pub reason: String,
    pub required_approvals: Vec<ApprovalKey>,
}

/// The condition guarding a forward transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionCondition {
    /// No gate (Init → Requirements, and every rollback).
    None,
    /// The named phase artifact must be generated and approved.
    PhaseApproved(ApprovalKey),
}

/// One legal edge in the workflow graph.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: WorkflowPhase,
    pub to: WorkflowPhase,
    condition: TransitionCondition,
}

impl StateTransition {
    fn forward(from: WorkflowPhase, to: WorkflowPhase) -> Self {
        let condition = match ApprovalKey::for_phase(from) {
            Some(key) => TransitionCondition::PhaseApproved(key),
            None => TransitionCondition::None,
        };
        Self {
            from,
            to,
            condition,
        }
    }

    fn rollback(from: WorkflowPhase, to: WorkflowPhase) -> Self {
        Self {
            from,
            to,
            condition: TransitionCondition::None,
        }
    }

    /// Evaluates the condition against a project snapshot. Returns the
    /// denial if the gate is unmet, `None` when the transition may proceed.
    pub fn check(&self, project: &Project) -> Option<TransitionDenial> {
        match self.condition {
            TransitionCondition::None => None,
            TransitionCondition::PhaseApproved(key) => {
                let state = project.approvals.get(key);
                if state.is_complete() {
                    return None;
                }
                Some(TransitionDenial {
                    reason: format!(
                        "{} must be generated and approved before {} phase",
                        self.from.label(),
                        self.to.label_lower()
                    ),
                    required_approvals: vec![key],
                })
            }
        }
    }
}

/// Builds the full transition table: four forward edges and four rollbacks.
pub fn transition_table() -> Vec<StateTransition> {
    let mut table = Vec::with_capacity(8);
    for pair in WorkflowPhase::ALL.windows(2) {
        table.push(StateTransition::forward(pair[0], pair[1]));
    }
    for pair in WorkflowPhase::ALL.windows(2) {
        table.push(StateTransition::rollback(pair[1], pair[0]));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ApprovalState;
    use chrono::Utc;

    #[test]
    fn test_table_has_only_one_step_edges() {
        for transition in transition_table() {
            let distance =
                transition.to.index() as i64 - transition.from.index() as i64;
            assert!(distance == 1 || distance == -1);
        }
    }

    #[test]
    fn test_rollbacks_are_unconditional() {
        let project = Project::new("p", "demo", Utc::now());
        for transition in transition_table() {
            if transition.to.index() < transition.from.index() {
                assert!(transition.check(&project).is_none());
            }
        }
    }

    #[test]
    fn test_forward_gate_reports_required_key() {
        let project = Project::new("p", "demo", Utc::now())
            .with_phase(WorkflowPhase::Requirements, Utc::now());
        let edge = transition_table()
            .into_iter()
            .find(|t| {
                t.from == WorkflowPhase::Requirements && t.to == WorkflowPhase::Design
            })
            .unwrap();

        let denial = edge.check(&project).expect("gate should be unmet");
        assert_eq!(denial.required_approvals, vec![ApprovalKey::Requirements]);
        assert_eq!(
            denial.reason,
            "Requirements must be generated and approved before design phase"
        );

        let approved = project.with_approval(
            ApprovalKey::Requirements,
            ApprovalState {
                generated: true,
                approved: true,
            },
        );
        assert!(edge.check(&approved).is_none());
    }
}
