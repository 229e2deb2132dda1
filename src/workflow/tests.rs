//! Tests for the workflow state machine.

use super::*;
use crate::clock::FixedClock;
use crate::project::{ApprovalState, PhaseApprovals};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

/// Creates a machine with a pinned clock and a fresh project at Init.
fn create_test_machine() -> (WorkflowStateMachine, Project) {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let machine = WorkflowStateMachine::with_clock(Arc::new(FixedClock(now)));
    let project = Project::new("proj-1", "demo", now);
    (machine, project)
}

fn approved() -> ApprovalState {
    ApprovalState {
        generated: true,
        approved: true,
    }
}

/// A project at `phase` with every earlier gate satisfied.
fn project_at(phase: WorkflowPhase) -> Project {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut project = Project::new("proj-1", "demo", now);
    project.phase = phase;
    for key in [
        ApprovalKey::Requirements,
        ApprovalKey::Design,
        ApprovalKey::Tasks,
    ] {
        let gated = match key {
            ApprovalKey::Requirements => WorkflowPhase::Requirements,
            ApprovalKey::Design => WorkflowPhase::Design,
            ApprovalKey::Tasks => WorkflowPhase::Tasks,
        };
        if phase.index() > gated.index() {
            *project.approvals.get_mut(key) = approved();
        }
    }
    project
}

#[test]
fn test_init_to_requirements_is_ungated() {
    let (machine, project) = create_test_machine();

    let check = machine.can_transition(&project, WorkflowPhase::Requirements);
    assert!(check.allowed);
    assert!(check.reason.is_none());
}

#[test]
fn test_forward_transition_requires_approval() {
    let (machine, _) = create_test_machine();
    let mut project = project_at(WorkflowPhase::Requirements);

    // Not generated, not approved
    let check = machine.can_transition(&project, WorkflowPhase::Design);
    assert!(!check.allowed);
    assert_eq!(check.required_approvals, vec![ApprovalKey::Requirements]);

    // Generated but not approved
    project.approvals.requirements.generated = true;
    let check = machine.can_transition(&project, WorkflowPhase::Design);
    assert!(!check.allowed);

    // Generated and approved
    project.approvals.requirements.approved = true;
    let check = machine.can_transition(&project, WorkflowPhase::Design);
    assert!(check.allowed);
}

#[test]
fn test_skip_is_denied_even_with_all_approvals() {
    let (machine, _) = create_test_machine();
    let mut project = project_at(WorkflowPhase::Init);
    project.approvals = PhaseApprovals {
        requirements: approved(),
        design: approved(),
        tasks: approved(),
    };

    let check = machine.can_transition(&project, WorkflowPhase::Design);
    assert!(!check.allowed);
    assert_eq!(
        check.reason.as_deref(),
        Some("No valid transition from Init to Design")
    );
}

#[test]
fn test_rollback_is_always_allowed() {
    let (machine, _) = create_test_machine();
    let project = project_at(WorkflowPhase::Tasks);

    let check = machine.can_transition(&project, WorkflowPhase::Design);
    assert!(check.allowed);
}

#[test]
fn test_design_awaiting_approval_scenario() {
    let (machine, _) = create_test_machine();
    let mut project = project_at(WorkflowPhase::Design);
    project.approvals.design = ApprovalState {
        generated: true,
        approved: false,
    };

    let check = machine.can_transition(&project, WorkflowPhase::Tasks);
    assert!(!check.allowed);
    assert_eq!(
        check.reason.as_deref(),
        Some("Design must be generated and approved before tasks phase")
    );
}

#[test]
fn test_execute_transition_returns_new_snapshot() {
    let (machine, project) = create_test_machine();

    let outcome = machine.execute_transition(&project, WorkflowPhase::Requirements, "user");
    assert!(outcome.success);
    assert!(outcome.error.is_none());

    let updated = outcome.updated_project.expect("should produce a snapshot");
    assert_eq!(updated.phase, WorkflowPhase::Requirements);

    // The caller's snapshot is untouched
    assert_eq!(project.phase, WorkflowPhase::Init);
}

#[test]
fn test_execute_transition_denial_does_not_update() {
    let (machine, _) = create_test_machine();
    let project = project_at(WorkflowPhase::Requirements);

    let outcome = machine.execute_transition(&project, WorkflowPhase::Design, "user");
    assert!(!outcome.success);
    assert!(outcome.updated_project.is_none());
    assert_eq!(
        outcome.error.as_deref(),
        Some("Requirements must be generated and approved before design phase")
    );
}

#[test]
fn test_every_attempt_appends_one_audit_entry() {
    let (machine, project) = create_test_machine();

    // Success
    let outcome = machine.execute_transition(&project, WorkflowPhase::Requirements, "user");
    let moved = outcome.updated_project.unwrap();

    // Denial (requirements not approved)
    machine.execute_transition(&moved, WorkflowPhase::Design, "user");

    // Structurally illegal
    machine.execute_transition(&moved, WorkflowPhase::Implementation, "agent");

    let trail = machine.audit_trail("proj-1");
    assert_eq!(trail.len(), 3);

    assert!(trail[0].success);
    assert_eq!(trail[0].from_phase, WorkflowPhase::Init);
    assert_eq!(trail[0].to_phase, WorkflowPhase::Requirements);
    assert_eq!(trail[0].triggered_by, "user");

    assert!(!trail[1].success);
    assert!(trail[1].error_message.is_some());

    assert!(!trail[2].success);
    assert_eq!(trail[2].triggered_by, "agent");
}

#[test]
fn test_audit_trail_is_scoped_to_project() {
    let (machine, project) = create_test_machine();
    let now = project.updated_at;
    let other = Project::new("proj-2", "other", now);

    machine.execute_transition(&project, WorkflowPhase::Requirements, "user");
    machine.execute_transition(&other, WorkflowPhase::Requirements, "user");

    assert_eq!(machine.audit_trail("proj-1").len(), 1);
    assert_eq!(machine.audit_trail("proj-2").len(), 1);
    assert!(machine.audit_trail("proj-3").is_empty());
}

#[test]
fn test_phase_progress_blocked() {
    let (machine, _) = create_test_machine();
    let project = project_at(WorkflowPhase::Design);

    let progress = machine.phase_progress(&project);
    assert_eq!(progress.phase_index, 2);
    assert_eq!(progress.total_phases, 5);
    assert_eq!(progress.progress_percentage, 60);
    assert_eq!(progress.next_phase, Some(WorkflowPhase::Tasks));
    assert!(!progress.can_progress);
    assert_eq!(
        progress.blockers,
        vec!["Design must be generated and approved before tasks phase".to_string()]
    );
}

#[test]
fn test_phase_progress_at_terminal_phase() {
    let (machine, _) = create_test_machine();
    let project = project_at(WorkflowPhase::Implementation);

    let progress = machine.phase_progress(&project);
    assert_eq!(progress.progress_percentage, 100);
    assert_eq!(progress.next_phase, None);
    assert!(!progress.can_progress);
    assert!(progress.blockers.is_empty());
}

#[test]
fn test_integrity_flags_unreachable_state() {
    let (machine, _) = create_test_machine();
    let mut project = project_at(WorkflowPhase::Design);
    // Forge a snapshot that skipped the requirements gate
    project.approvals.requirements = ApprovalState::default();

    let report = machine.validate_integrity(&project);
    assert!(!report.valid);
    assert_eq!(
        report.violations,
        vec!["phase is Design but requirements is not generated and approved".to_string()]
    );
}

#[test]
fn test_integrity_flags_approved_without_generated() {
    let (machine, _) = create_test_machine();
    let mut project = project_at(WorkflowPhase::Requirements);
    project.approvals.requirements = ApprovalState {
        generated: false,
        approved: true,
    };

    let report = machine.validate_integrity(&project);
    assert!(!report.valid);
    assert!(report
        .violations
        .iter()
        .any(|v| v.contains("approved but was never generated")));
}

#[test]
fn test_integrity_recommends_awaiting_approval() {
    let (machine, _) = create_test_machine();
    let mut project = project_at(WorkflowPhase::Requirements);
    project.approvals.requirements.generated = true;

    let report = machine.validate_integrity(&project);
    assert!(report.valid);
    assert!(report
        .recommendations
        .contains(&"requirements is generated and awaiting approval".to_string()));
}

#[test]
fn test_integrity_never_blocks_transitions() {
    let (machine, _) = create_test_machine();
    let mut project = project_at(WorkflowPhase::Design);
    project.approvals.requirements = ApprovalState::default();

    // Invalid integrity, but the rollback is still legal
    assert!(!machine.validate_integrity(&project).valid);
    let check = machine.can_transition(&project, WorkflowPhase::Requirements);
    assert!(check.allowed);
}

fn arb_phase() -> impl Strategy<Value = WorkflowPhase> {
    prop::sample::select(WorkflowPhase::ALL.to_vec())
}

fn arb_approvals() -> impl Strategy<Value = PhaseApprovals> {
    (any::<[bool; 6]>()).prop_map(|b| PhaseApprovals {
        requirements: ApprovalState {
            generated: b[0],
            approved: b[1],
        },
        design: ApprovalState {
            generated: b[2],
            approved: b[3],
        },
        tasks: ApprovalState {
            generated: b[4],
            approved: b[5],
        },
    })
}

proptest! {
    /// A transition can only ever be allowed to the immediate neighbor
    /// phases, regardless of approval state.
    #[test]
    fn prop_phase_monotonicity(from in arb_phase(), to in arb_phase(), approvals in arb_approvals()) {
        let machine = WorkflowStateMachine::new();
        let mut project = Project::new("p", "demo", Utc::now());
        project.phase = from;
        project.approvals = approvals;

        let check = machine.can_transition(&project, to);
        if check.allowed {
            prop_assert!(Some(to) == from.next() || Some(to) == from.previous());
        }
    }

    /// Rollbacks are allowed for every approval combination.
    #[test]
    fn prop_rollback_always_allowed(from in arb_phase(), approvals in arb_approvals()) {
        let machine = WorkflowStateMachine::new();
        let mut project = Project::new("p", "demo", Utc::now());
        project.phase = from;
        project.approvals = approvals;

        if let Some(prev) = from.previous() {
            prop_assert!(machine.can_transition(&project, prev).allowed);
        }
    }
}
