use crate::registry::types::VsStatus;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// A single failed validation check, tied to the field that failed it.
///
/// Field names use the wire spelling (`maxConn`, `timeouts.connect`) so the
/// console can attach the message to the matching form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// Failures produced by the registry, the lifecycle controller and the renderer.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input; carries every violated field, not just the first.
    #[error("Validation failed: {}", format_violations(.violations))]
    Validation { violations: Vec<Violation> },

    #[error("Virtual server not found: {0}")]
    NotFound(Uuid),

    /// The requested status change is not permitted from the current state.
    #[error("Cannot {requested} while status is {from}")]
    InvalidTransition { from: VsStatus, requested: &'static str },

    /// The balancer rejected or never acknowledged a configuration push.
    #[error("Activation failed: {0}")]
    ActivationFailed(String),

    /// A record that bypassed registry validation reached the renderer.
    #[error("Render failed: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Stable machine-readable discriminator for API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ActivationFailed(_) => "activation_failed",
            Self::Render(_) => "render",
            Self::Storage(_) => "storage",
        }
    }

    /// Shorthand for a single-field validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { violations: vec![Violation::new(field, message)] }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn format_violations(violations: &[Violation]) -> String {
    violations.iter().map(|v| format!("{}: {}", v.field, v.message)).collect::<Vec<_>>().join("; ")
}
