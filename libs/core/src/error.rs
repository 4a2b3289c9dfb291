use thiserror::Error;

/// Failures raised while planning changes to a collection.
///
/// Every variant is detected before any remote write is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("missing required value: {field}")]
    Validation { field: String },
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("collection holds {count} items keyed '{key}'")]
    DataIntegrity { key: String, count: usize },
    #[error("{count} existing resources already named '{name}'")]
    Duplicate { name: String, count: usize },
}

impl ReconcileError {
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}
