//! Catalog of contextual guidance documents contributed by plugins.
//!
//! Each document declares an inclusion mode: always applicable, conditional
//! on the current file matching a pattern, or manual-only. Resolution renders
//! every applicable document's template against caller-supplied variables; a
//! document that fails to render is dropped from that one result set and
//! logged, never aborting the others.

mod template;

pub use template::{PlaceholderRenderer, TemplateError, TemplateRenderer};

use crate::error::RegistryError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Mutex;

/// Valid priority range for steering documents.
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i32> = 0..=1000;

/// When a steering document applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InclusionMode {
    Always,
    Conditional,
    Manual,
}

/// A steering document as declared by a plugin, keyed by `(plugin_id, name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteeringDeclaration {
    pub plugin_id: String,
    pub name: String,
    pub doc_type: String,
    pub mode: InclusionMode,
    /// Higher priority sorts first in resolution results.
    pub priority: i32,
    /// Regex patterns matched against the current file for `Conditional`.
    pub patterns: Vec<String>,
    pub template: String,
    /// Variable names the template expects, advisory for loaders.
    pub variables: Vec<String>,
}

/// Caller-supplied resolution context. Ephemeral, never persisted.
#[derive(Debug, Clone, Default)]
pub struct SteeringContext {
    pub current_file: Option<String>,
    pub project_path: Option<String>,
    /// Bindings substituted into document templates.
    pub variables: Value,
}

/// One resolved, rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteeringResult {
    pub plugin_id: String,
    pub name: String,
    pub doc_type: String,
    pub mode: InclusionMode,
    pub priority: i32,
    pub content: String,
}

/// Catalog counts, grouped three ways.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SteeringStatistics {
    pub total: usize,
    pub by_mode: HashMap<InclusionMode, usize>,
    pub by_type: HashMap<String, usize>,
    pub by_plugin: HashMap<String, usize>,
}

struct StoredDocument {
    declaration: SteeringDeclaration,
    compiled: Vec<Regex>,
}

/// The steering-document resolver.
///
/// Documents are kept in registration order; re-registration under the same
/// key replaces in place, so priority ties keep resolving in the order the
/// documents first appeared.
pub struct SteeringResolver {
    documents: Mutex<Vec<StoredDocument>>,
    renderer: Box<dyn TemplateRenderer>,
}

impl Default for SteeringResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SteeringResolver {
    pub fn new() -> Self {
        Self::with_renderer(Box::new(PlaceholderRenderer::new()))
    }

    pub fn with_renderer(renderer: Box<dyn TemplateRenderer>) -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
            renderer,
        }
    }

    /// Registers a steering document, validating the declaration first.
    pub fn register(&self, declaration: SteeringDeclaration) -> Result<(), RegistryError> {
        if declaration.name.is_empty() {
            return Err(RegistryError::InvalidRegistration {
                message: "steering document name must be non-empty".to_string(),
            });
        }
        if !PRIORITY_RANGE.contains(&declaration.priority) {
            return Err(RegistryError::InvalidRegistration {
                message: format!(
                    "priority {} is outside {}..={}",
                    declaration.priority,
                    PRIORITY_RANGE.start(),
                    PRIORITY_RANGE.end()
                ),
            });
        }
        if declaration.mode == InclusionMode::Conditional && declaration.patterns.is_empty() {
            return Err(RegistryError::InvalidRegistration {
                message: "conditional documents must declare at least one pattern".to_string(),
            });
        }

        let mut compiled = Vec::with_capacity(declaration.patterns.len());
        for pattern in &declaration.patterns {
            match Regex::new(pattern) {
                Ok(regex) => compiled.push(regex),
                Err(e) => {
                    return Err(RegistryError::InvalidRegistration {
                        message: format!("pattern '{pattern}' does not compile: {e}"),
                    });
                }
            }
        }

        let stored = StoredDocument {
            declaration,
            compiled,
        };

        let mut documents = lock_unpoisoned(&self.documents);
        let existing = documents.iter_mut().find(|d| {
            d.declaration.plugin_id == stored.declaration.plugin_id
                && d.declaration.name == stored.declaration.name
        });
        match existing {
            Some(slot) => {
                tracing::warn!(
                    plugin = %stored.declaration.plugin_id,
                    document = %stored.declaration.name,
                    "steering document re-registered, replacing previous declaration"
                );
                *slot = stored;
            }
            None => documents.push(stored),
        }
        Ok(())
    }

    /// Removes one document. Unknown removals are a warning, not an error.
    pub fn unregister(&self, plugin_id: &str, name: &str) {
        let mut documents = lock_unpoisoned(&self.documents);
        let before = documents.len();
        documents.retain(|d| !(d.declaration.plugin_id == plugin_id && d.declaration.name == name));
        if documents.len() == before {
            tracing::warn!(
                plugin = %plugin_id,
                document = %name,
                "unregister of unknown steering document ignored"
            );
        }
    }

    /// Removes every document registered by `plugin_id`, or all documents
    /// when no plugin is given.
    pub fn clear(&self, plugin_id: Option<&str>) {
        let mut documents = lock_unpoisoned(&self.documents);
        match plugin_id {
            Some(plugin) => documents.retain(|d| d.declaration.plugin_id != plugin),
            None => documents.clear(),
        }
    }

    /// Resolves and renders every document applicable in `context`, sorted
    /// descending by priority. Ties keep registration order.
    ///
    /// `Manual` documents are never returned here; a render failure excludes
    /// only the offending document.
    pub fn applicable_documents(&self, context: &SteeringContext) -> Vec<SteeringResult> {
        let documents = lock_unpoisoned(&self.documents);
        let mut results = Vec::new();

        for stored in documents.iter() {
            let applicable = match stored.declaration.mode {
                InclusionMode::Always => true,
                InclusionMode::Conditional => context
                    .current_file
                    .as_deref()
                    .is_some_and(|file| stored.compiled.iter().any(|p| p.is_match(file))),
                InclusionMode::Manual => false,
            };
            if !applicable {
                continue;
            }
            if let Some(result) = self.render_stored(stored, context) {
                results.push(result);
            }
        }

        results.sort_by_key(|r| Reverse(r.priority));
        results
    }

    /// Renders one document by key, regardless of mode. This is the only way
    /// to obtain a `Manual` document.
    pub fn render_document(
        &self,
        plugin_id: &str,
        name: &str,
        context: &SteeringContext,
    ) -> Option<SteeringResult> {
        let documents = lock_unpoisoned(&self.documents);
        documents
            .iter()
            .find(|d| d.declaration.plugin_id == plugin_id && d.declaration.name == name)
            .and_then(|stored| self.render_stored(stored, context))
    }

    /// Declarations registered under one inclusion mode, in registration
    /// order.
    pub fn documents_by_mode(&self, mode: InclusionMode) -> Vec<SteeringDeclaration> {
        let documents = lock_unpoisoned(&self.documents);
        documents
            .iter()
            .filter(|d| d.declaration.mode == mode)
            .map(|d| d.declaration.clone())
            .collect()
    }

    /// Catalog counts by mode, document type, and contributing plugin.
    pub fn statistics(&self) -> SteeringStatistics {
        let documents = lock_unpoisoned(&self.documents);
        let mut stats = SteeringStatistics {
            total: documents.len(),
            ..Default::default()
        };
        for stored in documents.iter() {
            *stats.by_mode.entry(stored.declaration.mode).or_default() += 1;
            *stats
                .by_type
                .entry(stored.declaration.doc_type.clone())
                .or_default() += 1;
            *stats
                .by_plugin
                .entry(stored.declaration.plugin_id.clone())
                .or_default() += 1;
        }
        stats
    }

    fn render_stored(
        &self,
        stored: &StoredDocument,
        context: &SteeringContext,
    ) -> Option<SteeringResult> {
        match self
            .renderer
            .render(&stored.declaration.template, &context.variables)
        {
            Ok(content) => Some(SteeringResult {
                plugin_id: stored.declaration.plugin_id.clone(),
                name: stored.declaration.name.clone(),
                doc_type: stored.declaration.doc_type.clone(),
                mode: stored.declaration.mode,
                priority: stored.declaration.priority,
                content,
            }),
            Err(e) => {
                tracing::warn!(
                    plugin = %stored.declaration.plugin_id,
                    document = %stored.declaration.name,
                    error = %e,
                    "steering document excluded, template failed to render"
                );
                None
            }
        }
    }
}

fn lock_unpoisoned(lock: &Mutex<Vec<StoredDocument>>) -> std::sync::MutexGuard<'_, Vec<StoredDocument>> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
