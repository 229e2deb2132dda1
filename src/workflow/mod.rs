//! The workflow state machine.
//!
//! This is the only place phase transitions are validated and executed. The
//! machine owns the transition table and the append-only audit log; project
//! snapshots are supplied by the caller and never mutated in place — a
//! successful transition returns a new snapshot for the caller to apply.
//!
//! Illegal transitions never produce an `Err`: they come back as structured
//! denials so an adapter can surface the reason and the missing approvals.

mod audit;
mod transitions;

pub use audit::WorkflowAuditEntry;
pub use transitions::{StateTransition, TransitionDenial};

use crate::clock::{system_clock, Clock};
use crate::phase::WorkflowPhase;
use crate::project::{ApprovalKey, Project};
use std::sync::{Arc, Mutex};
use transitions::transition_table;

/// Result of asking whether a transition is legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCheck {
    pub allowed: bool,
    /// Denial reason when not allowed.
    pub reason: Option<String>,
    /// Approval keys that would have to be satisfied.
    pub required_approvals: Vec<ApprovalKey>,
}

impl TransitionCheck {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            required_approvals: Vec::new(),
        }
    }

    fn denied(reason: String, required_approvals: Vec<ApprovalKey>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            required_approvals,
        }
    }
}

/// Result of executing a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub success: bool,
    /// The new project snapshot on success.
    pub updated_project: Option<Project>,
    /// Denial or failure reason.
    pub error: Option<String>,
    /// The audit entry appended for this attempt.
    pub audit_entry: WorkflowAuditEntry,
}

/// Progress summary for a project snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseProgress {
    pub phase_index: usize,
    pub total_phases: usize,
    /// Rounded percentage of phases entered, current phase included.
    pub progress_percentage: u8,
    pub next_phase: Option<WorkflowPhase>,
    pub can_progress: bool,
    pub blockers: Vec<String>,
}

/// Advisory report from `validate_integrity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub valid: bool,
    pub violations: Vec<String>,
    pub recommendations: Vec<String>,
}

/// The workflow governance engine's phase state machine.
pub struct WorkflowStateMachine {
    transitions: Vec<StateTransition>,
    audit_log: Mutex<Vec<WorkflowAuditEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowStateMachine {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            transitions: transition_table(),
            audit_log: Mutex::new(Vec::new()),
            clock,
        }
    }

    /// Checks whether `project` may move to `to`.
    ///
    /// Looks up the transition whose `from` matches the project's current
    /// phase; absence means the move is structurally illegal (a skip or a
    /// self-transition) regardless of approval state.
    pub fn can_transition(&self, project: &Project, to: WorkflowPhase) -> TransitionCheck {
        let transition = self
            .transitions
            .iter()
            .find(|t| t.from == project.phase && t.to == to);

        let Some(transition) = transition else {
            return TransitionCheck::denied(
                format!(
                    "No valid transition from {} to {}",
                    project.phase.label(),
                    to.label()
                ),
                Vec::new(),
            );
        };

        match transition.check(project) {
            None => TransitionCheck::allowed(),
            Some(TransitionDenial {
                reason,
                required_approvals,
            }) => TransitionCheck::denied(reason, required_approvals),
        }
    }

    /// Validates and executes a transition, appending exactly one audit
    /// entry whether it succeeds or not.
    pub fn execute_transition(
        &self,
        project: &Project,
        to: WorkflowPhase,
        triggered_by: &str,
    ) -> TransitionOutcome {
        let check = self.can_transition(project, to);
        let now = self.clock.now();

        if !check.allowed {
            let reason = check
                .reason
                .unwrap_or_else(|| "transition denied".to_string());
            tracing::debug!(
                project = %project.id,
                from = %project.phase,
                to = %to,
                reason = %reason,
                "transition denied"
            );
            let entry = WorkflowAuditEntry::new(
                &project.id,
                now,
                project.phase,
                to,
                triggered_by,
                false,
                Some(reason.clone()),
            );
            self.append_audit(entry.clone());
            return TransitionOutcome {
                success: false,
                updated_project: None,
                error: Some(reason),
                audit_entry: entry,
            };
        }

        let updated = project.with_phase(to, now);
        let entry = WorkflowAuditEntry::new(
            &project.id,
            now,
            project.phase,
            to,
            triggered_by,
            true,
            None,
        );
        self.append_audit(entry.clone());
        tracing::debug!(
            project = %project.id,
            from = %project.phase,
            to = %to,
            triggered_by,
            "phase transition executed"
        );

        TransitionOutcome {
            success: true,
            updated_project: Some(updated),
            error: None,
            audit_entry: entry,
        }
    }

    /// Derives progress and blockers for a snapshot by probing the next
    /// forward transition.
    pub fn phase_progress(&self, project: &Project) -> PhaseProgress {
        let total = WorkflowPhase::ALL.len();
        let index = project.phase.index();
        let next_phase = project.phase.next();

        let (can_progress, blockers) = match next_phase {
            None => (false, Vec::new()),
            Some(next) => {
                let check = self.can_transition(project, next);
                (check.allowed, check.reason.into_iter().collect())
            }
        };

        let percentage = ((index + 1) as f64 / total as f64 * 100.0).round() as u8;

        PhaseProgress {
            phase_index: index,
            total_phases: total,
            progress_percentage: percentage,
            next_phase,
            can_progress,
            blockers,
        }
    }

    /// Cross-checks the phase against the approval records.
    ///
    /// Advisory only: a violation here never blocks a transition, it flags a
    /// snapshot that could not have been reached through the gates (e.g. a
    /// hand-edited or corrupted persisted state).
    pub fn validate_integrity(&self, project: &Project) -> IntegrityReport {
        let mut violations = Vec::new();
        let mut recommendations = Vec::new();

        // A phase beyond a gate implies the gate's approval is complete.
        for key in [
            ApprovalKey::Requirements,
            ApprovalKey::Design,
            ApprovalKey::Tasks,
        ] {
            let gated_phase = match key {
                ApprovalKey::Requirements => WorkflowPhase::Requirements,
                ApprovalKey::Design => WorkflowPhase::Design,
                ApprovalKey::Tasks => WorkflowPhase::Tasks,
            };
            let state = project.approvals.get(key);

            if project.phase.index() > gated_phase.index() && !state.is_complete() {
                violations.push(format!(
                    "phase is {} but {} is not generated and approved",
                    project.phase.label(),
                    key
                ));
            }

            if state.approved && !state.generated {
                violations.push(format!("{} is approved but was never generated", key));
            }

            if state.generated && !state.approved {
                recommendations.push(format!("{} is generated and awaiting approval", key));
            } else if !state.generated && project.phase == gated_phase {
                recommendations.push(format!("generate the {} artifact to proceed", key));
            }
        }

        IntegrityReport {
            valid: violations.is_empty(),
            violations,
            recommendations,
        }
    }

    /// Entries for one project, in the order the attempts were made.
    pub fn audit_trail(&self, project_id: &str) -> Vec<WorkflowAuditEntry> {
        match self.audit_log.lock() {
            Ok(log) => log
                .iter()
                .filter(|e| e.project_id == project_id)
                .cloned()
                .collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .iter()
                .filter(|e| e.project_id == project_id)
                .cloned()
                .collect(),
        }
    }

    fn append_audit(&self, entry: WorkflowAuditEntry) {
        match self.audit_log.lock() {
            Ok(mut log) => log.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[cfg(test)]
mod tests;
