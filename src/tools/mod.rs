//! Namespaced catalog of callable operations contributed by plugins.
//!
//! Tool names are globally unique across plugins. Execution runs a fixed
//! pipeline: lookup, input-schema validation, security screening, permission
//! check, then the handler itself. Everything past the lookup is returned as
//! a structured result; only an unknown tool name is an `Err`, since that is
//! a caller bug rather than an execution outcome.

pub mod schema;
mod security;

pub use security::SecurityScreen;

use crate::error::RegistryError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A callable capability contributed by a plugin.
///
/// Handler failures are execution outcomes, not control flow: the registry
/// wraps the error message into a failed [`ToolResult`].
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, input: &Value, context: &ToolExecutionContext) -> Result<Value, String>;
}

/// Resource-scoped grant declared by a tool, e.g. file writes limited to a
/// path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPermission {
    pub resource: String,
    pub path_prefix: String,
}

/// A registered tool, keyed globally by `name`.
#[derive(Clone)]
pub struct ToolRegistration {
    pub plugin_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub handler: Arc<dyn ToolHandler>,
    pub input_schema: Value,
    pub output_schema: Value,
    pub permissions: Vec<ToolPermission>,
}

impl std::fmt::Debug for ToolRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistration")
            .field("plugin_id", &self.plugin_id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("category", &self.category)
            .field("permissions", &self.permissions)
            .finish()
    }
}

/// Ephemeral invocation metadata supplied by the caller. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    pub plugin_id: Option<String>,
    pub project_path: Option<String>,
    pub current_file: Option<String>,
    pub metadata: Value,
}

/// Outcome of one tool execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub execution_time_ms: u128,
}

impl ToolResult {
    fn ok(output: Value, elapsed_ms: u128) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
            execution_time_ms: elapsed_ms,
        }
    }

    fn fail(error: String, elapsed_ms: u128) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error),
            execution_time_ms: elapsed_ms,
        }
    }
}

/// Per-tool running statistics, updated after every execution.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ToolStats {
    pub executions: u64,
    pub successes: u64,
    pub errors: u64,
    pub total_time_ms: u128,
}

impl ToolStats {
    pub fn success_rate(&self) -> f64 {
        if self.executions == 0 {
            0.0
        } else {
            self.successes as f64 / self.executions as f64
        }
    }

    pub fn average_time_ms(&self) -> f64 {
        if self.executions == 0 {
            0.0
        } else {
            self.total_time_ms as f64 / self.executions as f64
        }
    }
}

struct ToolStore {
    tools: HashMap<String, ToolRegistration>,
    stats: HashMap<String, ToolStats>,
}

/// The tool registry.
pub struct ToolRegistry {
    store: Mutex<ToolStore>,
    screen: SecurityScreen,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(ToolStore {
                tools: HashMap::new(),
                stats: HashMap::new(),
            }),
            screen: SecurityScreen::new(),
        }
    }

    /// Registers a tool under its globally unique name.
    ///
    /// The same plugin re-registering a name replaces the previous entry
    /// (logged as a warning); another plugin claiming the name is a hard
    /// failure.
    pub fn register(&self, tool: ToolRegistration) -> Result<(), RegistryError> {
        if tool.name.is_empty() {
            return Err(RegistryError::InvalidRegistration {
                message: "tool name must be non-empty".to_string(),
            });
        }
        schema::validate_schema_shape(&tool.input_schema).map_err(|e| {
            RegistryError::InvalidRegistration {
                message: format!("input schema: {e}"),
            }
        })?;
        schema::validate_schema_shape(&tool.output_schema).map_err(|e| {
            RegistryError::InvalidRegistration {
                message: format!("output schema: {e}"),
            }
        })?;

        let mut store = lock_unpoisoned(&self.store);
        if let Some(existing) = store.tools.get(&tool.name) {
            if existing.plugin_id != tool.plugin_id {
                return Err(RegistryError::NameConflict {
                    name: tool.name.clone(),
                    owner: existing.plugin_id.clone(),
                });
            }
            tracing::warn!(
                plugin = %tool.plugin_id,
                tool = %tool.name,
                "tool re-registered, replacing previous registration"
            );
        }
        store.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Removes a tool owned by `plugin_id`. Unknown removals are a warning.
    pub fn unregister(&self, plugin_id: &str, tool_name: &str) {
        let mut store = lock_unpoisoned(&self.store);
        let owned = store
            .tools
            .get(tool_name)
            .is_some_and(|t| t.plugin_id == plugin_id);
        if owned {
            store.tools.remove(tool_name);
        } else {
            tracing::warn!(
                plugin = %plugin_id,
                tool = %tool_name,
                "unregister of unknown tool ignored"
            );
        }
    }

    /// Removes every tool registered by `plugin_id`, or all tools when no
    /// plugin is given. Statistics for removed tools are dropped too.
    pub fn clear_tools(&self, plugin_id: Option<&str>) {
        let mut store = lock_unpoisoned(&self.store);
        match plugin_id {
            Some(plugin) => {
                store.tools.retain(|_, t| t.plugin_id != plugin);
                let remaining: Vec<String> = store.tools.keys().cloned().collect();
                store.stats.retain(|name, _| remaining.contains(name));
            }
            None => {
                store.tools.clear();
                store.stats.clear();
            }
        }
    }

    /// Runs the execution pipeline for `tool_name`.
    ///
    /// An unknown name is the one `Err` on this path. Validation failures,
    /// security rejections, permission denials, and handler errors all come
    /// back as failed results, and every attempt past the lookup updates the
    /// tool's statistics.
    pub async fn execute(
        &self,
        tool_name: &str,
        input: Value,
        context: &ToolExecutionContext,
    ) -> Result<ToolResult, RegistryError> {
        // Clone the registration out of the lock so the handler is awaited
        // without holding it.
        let tool = {
            let store = lock_unpoisoned(&self.store);
            store.tools.get(tool_name).cloned()
        };
        let Some(tool) = tool else {
            return Err(RegistryError::ToolNotFound {
                name: tool_name.to_string(),
            });
        };

        let started = Instant::now();

        let violations = schema::validate_input(&input, &tool.input_schema);
        if !violations.is_empty() {
            return Ok(self.finish(
                &tool,
                ToolResult::fail(
                    format!("Input validation failed: {}", violations.join("; ")),
                    started.elapsed().as_millis(),
                ),
            ));
        }

        if let Some(label) = self.screen.screen(&input) {
            tracing::warn!(
                plugin = %tool.plugin_id,
                tool = %tool.name,
                pattern = %label,
                "tool input rejected by security screening"
            );
            return Ok(self.finish(
                &tool,
                ToolResult::fail(
                    format!("Security violation detected: {label}"),
                    started.elapsed().as_millis(),
                ),
            ));
        }

        if let Some(denied) = check_permissions(&tool, &input) {
            return Ok(self.finish(
                &tool,
                ToolResult::fail(denied, started.elapsed().as_millis()),
            ));
        }

        let result = match tool.handler.call(&input, context).await {
            Ok(output) => ToolResult::ok(output, started.elapsed().as_millis()),
            Err(error) => {
                tracing::error!(
                    plugin = %tool.plugin_id,
                    tool = %tool.name,
                    error = %error,
                    "tool handler failed"
                );
                ToolResult::fail(error, started.elapsed().as_millis())
            }
        };

        Ok(self.finish(&tool, result))
    }

    /// Tools in one category, in no particular order.
    pub fn tools_by_category(&self, category: &str) -> Vec<ToolRegistration> {
        let store = lock_unpoisoned(&self.store);
        store
            .tools
            .values()
            .filter(|t| t.category == category)
            .cloned()
            .collect()
    }

    pub fn all_tools(&self) -> Vec<ToolRegistration> {
        let store = lock_unpoisoned(&self.store);
        store.tools.values().cloned().collect()
    }

    pub fn get_tool(&self, tool_name: &str) -> Option<ToolRegistration> {
        let store = lock_unpoisoned(&self.store);
        store.tools.get(tool_name).cloned()
    }

    /// Running statistics for one tool, if it has ever been executed.
    pub fn stats(&self, tool_name: &str) -> Option<ToolStats> {
        let store = lock_unpoisoned(&self.store);
        store.stats.get(tool_name).copied()
    }

    fn finish(&self, tool: &ToolRegistration, result: ToolResult) -> ToolResult {
        let mut store = lock_unpoisoned(&self.store);
        let stats = store.stats.entry(tool.name.clone()).or_default();
        stats.executions += 1;
        if result.success {
            stats.successes += 1;
        } else {
            stats.errors += 1;
        }
        stats.total_time_ms += result.execution_time_ms;
        result
    }
}

/// Verifies a path-scoped input against the tool's declared permissions.
/// Tools without permissions, and inputs without a `path`, pass unchecked.
fn check_permissions(tool: &ToolRegistration, input: &Value) -> Option<String> {
    if tool.permissions.is_empty() {
        return None;
    }
    let path = input.get("path").and_then(Value::as_str)?;
    let allowed = tool
        .permissions
        .iter()
        .any(|p| path.starts_with(&p.path_prefix));
    if allowed {
        None
    } else {
        Some(format!("Permission denied: path '{path}' is outside the allowed prefixes"))
    }
}

fn lock_unpoisoned(lock: &Mutex<ToolStore>) -> std::sync::MutexGuard<'_, ToolStore> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
