//! Error types for the template engine
//!
//! Validation failures are deliberately *not* represented here: they are
//! advisory data (`ValidationResult`) returned to the caller, never raised.
//! Everything that does fail propagates with a kind tag and the original
//! cause preserved.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the template service.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template {0} not found")]
    NotFound(Uuid),

    #[error("template {0} is inactive")]
    Inactive(Uuid),

    #[error("default promotion conflict: {0}")]
    TransactionConflict(String),

    #[error("persistence failure: {0}")]
    Persistence(#[source] StoreError),
}

impl TemplateError {
    /// HTTP status code the REST layer should map this error to.
    pub fn http_status(&self) -> u16 {
        match self {
            TemplateError::NotFound(_) => 404,
            TemplateError::Inactive(_) => 410,
            TemplateError::TransactionConflict(_) => 409,
            TemplateError::Persistence(_) => 500,
        }
    }
}

impl From<StoreError> for TemplateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => TemplateError::TransactionConflict(msg),
            other => TemplateError::Persistence(other),
        }
    }
}

/// Errors raised by the persistence collaborators behind the port traits.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A concurrent writer touched a row this transaction depends on.
    #[error("write conflict: {0}")]
    Conflict(String),

    /// A storage-level constraint (e.g. referential integrity) was violated.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_transaction_conflict() {
        let err: TemplateError = StoreError::Conflict("bucket race".into()).into();
        assert!(matches!(err, TemplateError::TransactionConflict(_)));
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn constraint_maps_to_persistence() {
        let err: TemplateError = StoreError::Constraint("fk violation".into()).into();
        assert!(matches!(err, TemplateError::Persistence(_)));
        assert_eq!(err.http_status(), 500);
    }
}
