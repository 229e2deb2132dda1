//! Governance engine for a multi-phase specification workflow.
//!
//! The crate has two halves. The workflow half is a phase state machine
//! (Init → Requirements → Design → Tasks → Implementation) that gates
//! forward progress on per-phase approval records, permits one-step
//! rollbacks, and keeps an append-only audit trail of every attempted
//! transition. The plugin half is three in-memory registries invoked at
//! workflow boundaries: a prioritized hook dispatcher, a schema-validated
//! tool registry with security screening, and a steering-document resolver
//! with template rendering.
//!
//! Everything operates over caller-supplied data. No component performs its
//! own file I/O; persistence happens through the [`snapshot`] document, and
//! registries are explicit instances constructed by the host so tests and
//! embedders can run isolated copies side by side.

pub mod clock;
pub mod error;
pub mod hooks;
pub mod phase;
pub mod project;
pub mod snapshot;
pub mod steering;
pub mod tools;
pub mod workflow;

pub use error::RegistryError;
pub use phase::WorkflowPhase;
pub use project::{ApprovalKey, ApprovalState, PhaseApprovals, Project};
pub use workflow::WorkflowStateMachine;
