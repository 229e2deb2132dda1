//! Placeholder substitution for steering-document templates.
//!
//! The resolver only depends on the [`TemplateRenderer`] trait, so the
//! templating syntax can be swapped without touching registry logic.

use regex::Regex;
use serde_json::Value;

/// Failure to render a template against a set of variable bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A placeholder referenced a variable path with no binding.
    UndefinedReference { path: String },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::UndefinedReference { path } => {
                write!(f, "undefined template reference '{path}'")
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Renders a template against JSON variable bindings.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, variables: &Value) -> Result<String, TemplateError>;
}

/// The default renderer: substitutes `${dot.path}` placeholders with values
/// looked up in the bindings object. Non-string values are serialized as
/// compact JSON.
pub struct PlaceholderRenderer {
    placeholder: Regex,
}

impl Default for PlaceholderRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderRenderer {
    pub fn new() -> Self {
        Self {
            placeholder: Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern compiles"),
        }
    }
}

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, variables: &Value) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for captures in self.placeholder.captures_iter(template) {
            let whole = captures.get(0).map(|m| (m.start(), m.end()));
            let path = captures.get(1).map(|m| m.as_str());
            let (Some((start, end)), Some(path)) = (whole, path) else {
                continue;
            };

            let Some(value) = lookup_path(variables, path) else {
                return Err(TemplateError::UndefinedReference {
                    path: path.to_string(),
                });
            };

            out.push_str(&template[last..start]);
            match value {
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
            last = end;
        }

        out.push_str(&template[last..]);
        Ok(out)
    }
}

fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}
