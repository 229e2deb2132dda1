//! Error types for the plugin registries.
//!
//! Expected denials (illegal transitions, validation failures, security
//! rejections, permission mismatches) are returned as structured result
//! data, not as errors. Only conditions the caller must fix before
//! continuing surface as `RegistryError`: a cross-plugin name collision and
//! a lookup of a tool that was never registered.

use std::fmt::{Display, Formatter};

/// Errors raised at the registry boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Another plugin already owns this name.
    NameConflict {
        name: String,
        /// Plugin that holds the existing registration.
        owner: String,
    },
    /// Tool lookup by a name nobody registered.
    ToolNotFound { name: String },
    /// A declaration failed validation at registration time.
    InvalidRegistration { message: String },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameConflict { name, owner } => {
                write!(f, "'{}' is already registered by plugin {}", name, owner)
            }
            Self::ToolNotFound { name } => write!(f, "tool '{}' not found", name),
            Self::InvalidRegistration { message } => {
                write!(f, "invalid registration: {}", message)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_conflict_names_the_owner() {
        let err = RegistryError::NameConflict {
            name: "generate-docs".to_string(),
            owner: "plugin-a".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("generate-docs"));
        assert!(message.contains("plugin-a"));
    }
}
