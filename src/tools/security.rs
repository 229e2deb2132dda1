//! Heuristic input screening for tool execution.
//!
//! A best-effort pattern filter over string-valued inputs, not a sandbox.
//! Any match rejects the call before the handler runs.

use regex::Regex;
use serde_json::Value;

/// A compiled table of dangerous-input patterns.
pub struct SecurityScreen {
    patterns: Vec<(&'static str, Regex)>,
}

/// `(label, pattern)` pairs the screen compiles at construction.
const PATTERN_TABLE: [(&str, &str); 4] = [
    ("code evaluation call", r"\beval\s*\("),
    ("inline script tag", r"(?i)<\s*script"),
    ("parent directory traversal", r"\.\./"),
    (
        "destructive SQL statement",
        r"(?i)\b(drop\s+table|drop\s+database|delete\s+from|truncate\s+table)\b",
    ),
];

impl Default for SecurityScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityScreen {
    pub fn new() -> Self {
        let mut patterns = Vec::with_capacity(PATTERN_TABLE.len());
        for (label, pattern) in PATTERN_TABLE {
            if let Ok(regex) = Regex::new(pattern) {
                patterns.push((label, regex));
            }
        }
        Self { patterns }
    }

    /// Scans every string reachable from `input`, recursing through objects
    /// and arrays. Returns the label of the first pattern that matches.
    pub fn screen(&self, input: &Value) -> Option<&'static str> {
        match input {
            Value::String(s) => self
                .patterns
                .iter()
                .find(|(_, regex)| regex.is_match(s))
                .map(|(label, _)| *label),
            Value::Array(items) => items.iter().find_map(|item| self.screen(item)),
            Value::Object(map) => map.values().find_map(|value| self.screen(value)),
            _ => None,
        }
    }
}
