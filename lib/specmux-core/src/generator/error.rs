//! Generation errors.

/// Errors that can fail a generation pass or a single document.
///
/// Only [`GenerationError::Disabled`] concerns the whole pass; every other
/// variant fails exactly one document, leaving its siblings untouched.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum GenerationError {
    /// Generation is switched off by configuration.
    #[display("document generation is disabled by configuration")]
    Disabled,

    /// The requested document name is not part of this pass.
    #[display("unknown document '{name}'")]
    UnknownDocument {
        /// The requested document name.
        name: String,
    },

    /// The module metadata backing a document is malformed.
    #[display("cannot produce document '{name}': {reason}")]
    Registration {
        /// The affected document name.
        name: String,
        /// Why the metadata is unusable.
        reason: String,
    },
}

/// A filter-pipeline failure.
///
/// Dropping the affected operation from the current document is the only
/// consequence; the failure is logged and generation continues.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
#[display("filter '{filter}' failed: {reason}")]
pub struct FilterError {
    /// Name of the failing filter stage.
    pub filter: &'static str,
    /// Failure detail.
    pub reason: String,
}

impl FilterError {
    /// Creates a filter failure.
    pub fn new(filter: &'static str, reason: impl Into<String>) -> Self {
        Self {
            filter,
            reason: reason.into(),
        }
    }
}
