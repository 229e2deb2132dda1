//! Named, prioritized, phase-scoped hook dispatch.
//!
//! Plugins register handlers against a workflow phase; the engine (or any
//! caller) fires the phase and receives an aggregated result. Hooks run
//! strictly in descending priority order, sequentially, threading the
//! evolving data payload from one handler to the next — later hooks may
//! depend on earlier hooks' mutations, so nothing runs concurrently.

mod cancel;

pub use cancel::CancellationToken;

use crate::error::RegistryError;
use crate::phase::WorkflowPhase;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// What a hook is for. Validators and filters short-circuit the chain on
/// failure; observers and actions do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookType {
    Validator,
    Filter,
    Observer,
    Action,
}

impl HookType {
    /// Whether a failure of this hook stops the rest of the chain.
    pub fn short_circuits(&self) -> bool {
        matches!(self, HookType::Validator | HookType::Filter)
    }
}

/// What a handler returns.
#[derive(Debug, Clone, Default)]
pub struct HookOutcome {
    pub success: bool,
    /// Replacement data payload threaded to the next hook, if any.
    pub data: Option<Value>,
    pub error: Option<String>,
    /// Halt the chain after this hook, without failing it.
    pub stop_propagation: bool,
}

impl HookOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn ok_with(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn stop(mut self) -> Self {
        self.stop_propagation = true;
        self
    }
}

/// A hook handler contributed by a plugin.
///
/// Handlers may be I/O-bound; the dispatcher awaits each one to completion
/// before invoking the next.
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn run(&self, data: &Value, metadata: &Value, cancel: &CancellationToken)
        -> HookOutcome;
}

/// Gate on the data payload: the hook is skipped (not failed) when the
/// dot-path field does not equal the expected value.
#[derive(Debug, Clone, PartialEq)]
pub struct HookCondition {
    pub field: String,
    pub equals: Value,
}

impl HookCondition {
    fn matches(&self, data: &Value) -> bool {
        lookup_path(data, &self.field) == Some(&self.equals)
    }
}

/// Resolves a dotted path like `request.kind` inside a JSON value.
fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// A registered hook, keyed by `(plugin_id, name)`.
#[derive(Clone)]
pub struct HookRegistration {
    pub plugin_id: String,
    pub name: String,
    pub hook_type: HookType,
    pub phase: WorkflowPhase,
    /// Higher priority executes first; ties run in registration order.
    pub priority: i32,
    pub handler: Arc<dyn HookHandler>,
    pub conditions: Vec<HookCondition>,
}

impl std::fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistration")
            .field("plugin_id", &self.plugin_id)
            .field("name", &self.name)
            .field("hook_type", &self.hook_type)
            .field("phase", &self.phase)
            .field("priority", &self.priority)
            .field("conditions", &self.conditions)
            .finish()
    }
}

/// One recorded hook failure in an aggregated result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError {
    pub plugin_id: String,
    pub hook_name: String,
    pub message: String,
}

/// Aggregated result of firing a phase.
#[derive(Debug, Clone)]
pub struct HookResult {
    pub success: bool,
    /// The data payload after every executed hook's mutations.
    pub data: Value,
    pub errors: Vec<HookError>,
    pub hooks_executed: usize,
    pub error_count: usize,
    pub execution_time_ms: u128,
    /// True when the chain stopped because the token was cancelled.
    pub cancelled: bool,
    /// Name of the hook that set `stop_propagation`, if any.
    pub stopped_by: Option<String>,
}

struct HookBuckets {
    by_phase: HashMap<WorkflowPhase, Vec<HookRegistration>>,
    /// Hook name → owning plugin, for the cross-plugin conflict rule.
    owners: HashMap<String, String>,
}

/// The hook dispatcher: a named, prioritized, phase-scoped event bus.
pub struct HookDispatcher {
    buckets: Mutex<HookBuckets>,
}

impl Default for HookDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HookBuckets {
                by_phase: HashMap::new(),
                owners: HashMap::new(),
            }),
        }
    }

    /// Registers a hook under its phase bucket, kept sorted by descending
    /// priority with a stable sort.
    ///
    /// The same plugin re-registering a hook name replaces the previous
    /// entry (logged as a warning); another plugin claiming the name is a
    /// hard failure.
    pub fn register(&self, hook: HookRegistration) -> Result<(), RegistryError> {
        let mut buckets = lock_unpoisoned(&self.buckets);

        if let Some(owner) = buckets.owners.get(&hook.name) {
            if owner != &hook.plugin_id {
                return Err(RegistryError::NameConflict {
                    name: hook.name.clone(),
                    owner: owner.clone(),
                });
            }
            tracing::warn!(
                plugin = %hook.plugin_id,
                hook = %hook.name,
                "hook re-registered, replacing previous registration"
            );
            // Drop the prior entry wherever it lives (the phase may differ).
            for bucket in buckets.by_phase.values_mut() {
                bucket.retain(|h| h.name != hook.name);
            }
        }

        buckets
            .owners
            .insert(hook.name.clone(), hook.plugin_id.clone());
        let bucket = buckets.by_phase.entry(hook.phase).or_default();
        bucket.push(hook);
        bucket.sort_by_key(|h| Reverse(h.priority));
        Ok(())
    }

    /// Removes a hook. Unknown removals are a warning, not an error.
    pub fn unregister(&self, plugin_id: &str, hook_name: &str) {
        let mut buckets = lock_unpoisoned(&self.buckets);

        let owned = buckets.owners.get(hook_name).map(|o| o == plugin_id);
        match owned {
            Some(true) => {
                buckets.owners.remove(hook_name);
                for bucket in buckets.by_phase.values_mut() {
                    bucket.retain(|h| h.name != hook_name);
                }
            }
            _ => {
                tracing::warn!(
                    plugin = %plugin_id,
                    hook = %hook_name,
                    "unregister of unknown hook ignored"
                );
            }
        }
    }

    /// Removes every hook registered by `plugin_id`, or all hooks when no
    /// plugin is given.
    pub fn clear_hooks(&self, plugin_id: Option<&str>) {
        let mut buckets = lock_unpoisoned(&self.buckets);
        match plugin_id {
            Some(plugin) => {
                buckets.owners.retain(|_, owner| owner != plugin);
                for bucket in buckets.by_phase.values_mut() {
                    bucket.retain(|h| h.plugin_id != plugin);
                }
            }
            None => {
                buckets.owners.clear();
                buckets.by_phase.clear();
            }
        }
    }

    /// Hooks registered for one phase, in execution order.
    pub fn hooks_for_phase(&self, phase: WorkflowPhase) -> Vec<HookRegistration> {
        let buckets = lock_unpoisoned(&self.buckets);
        buckets.by_phase.get(&phase).cloned().unwrap_or_default()
    }

    /// Fires every hook registered for `phase`, sequentially in priority
    /// order, threading the data payload between handlers.
    pub async fn execute(
        &self,
        phase: WorkflowPhase,
        data: Value,
        metadata: Value,
        cancel: &CancellationToken,
    ) -> HookResult {
        // Clone registrations out of the lock; handlers are awaited without
        // holding it so hooks may register/unregister concurrently.
        let chain = self.hooks_for_phase(phase);

        let started = Instant::now();
        let mut data = data;
        let mut errors = Vec::new();
        let mut executed = 0usize;
        let mut cancelled = false;
        let mut stopped_by = None;

        for hook in &chain {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            if !hook.conditions.iter().all(|c| c.matches(&data)) {
                tracing::debug!(
                    hook = %hook.name,
                    phase = %phase,
                    "hook skipped, condition not met"
                );
                continue;
            }

            let outcome = hook.handler.run(&data, &metadata, cancel).await;
            executed += 1;

            if let Some(new_data) = outcome.data {
                data = new_data;
            }

            if !outcome.success {
                let message = outcome
                    .error
                    .unwrap_or_else(|| "hook reported failure".to_string());
                tracing::error!(
                    plugin = %hook.plugin_id,
                    hook = %hook.name,
                    error = %message,
                    "hook execution failed"
                );
                errors.push(HookError {
                    plugin_id: hook.plugin_id.clone(),
                    hook_name: hook.name.clone(),
                    message,
                });
                if hook.hook_type.short_circuits() {
                    break;
                }
            }

            if outcome.stop_propagation {
                stopped_by = Some(hook.name.clone());
                break;
            }
        }

        let error_count = errors.len();
        HookResult {
            success: errors.is_empty() && !cancelled,
            data,
            errors,
            hooks_executed: executed,
            error_count,
            execution_time_ms: started.elapsed().as_millis(),
            cancelled,
            stopped_by,
        }
    }
}

fn lock_unpoisoned(lock: &Mutex<HookBuckets>) -> std::sync::MutexGuard<'_, HookBuckets> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
