use sip_db::StoreError;
use sip_reconcile::ReconcileError;
use sip_schemas::BeverageId;

/// Typed failures of catalog operations. Request handlers map each variant to
/// one HTTP status.
#[derive(Debug)]
pub enum CatalogError {
    /// Another beverage already uses this name.
    DuplicateName { name: String },
    NotFound { what: &'static str, id: i64 },
    /// Unusable input; `field` is the wire path of the offending value.
    Validation { field: String, message: String },
    /// The store failed; nothing from the operation was persisted.
    PersistenceFailure(StoreError),
    /// The beverage changed between read and save.
    ConcurrentModification { id: BeverageId },
}

impl CatalogError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn beverage_not_found(id: BeverageId) -> Self {
        CatalogError::NotFound {
            what: "beverage",
            id: id.0,
        }
    }

    /// Map a failed `save_atomic` for a beverage named `name`.
    pub(crate) fn from_save(err: StoreError, name: &str) -> Self {
        match err {
            e if e.is_unique_violation(sip_db::UQ_BEVERAGE_NAME) => CatalogError::DuplicateName {
                name: name.to_string(),
            },
            StoreError::StaleVersion { beverage_id, .. } => {
                CatalogError::ConcurrentModification { id: beverage_id }
            }
            // The beverage was deleted after it was read.
            StoreError::MissingRow { what: "beverage", id } => {
                CatalogError::NotFound { what: "beverage", id }
            }
            other => CatalogError::PersistenceFailure(other),
        }
    }
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::DuplicateName { name } => {
                write!(f, "a beverage named '{name}' already exists")
            }
            CatalogError::NotFound { what, id } => write!(f, "{what} {id} not found"),
            CatalogError::Validation { field, message } => write!(f, "invalid {field}: {message}"),
            CatalogError::PersistenceFailure(e) => write!(f, "persistence failure: {e}"),
            CatalogError::ConcurrentModification { id } => {
                write!(f, "beverage {id} was modified concurrently; re-read and retry")
            }
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::PersistenceFailure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(e: StoreError) -> Self {
        CatalogError::PersistenceFailure(e)
    }
}

impl From<ReconcileError> for CatalogError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Validation { field, message } => {
                CatalogError::Validation { field, message }
            }
            ReconcileError::NotLocal { name } => CatalogError::Validation {
                field: "beverage_id".to_string(),
                message: format!("beverage '{name}' is not stored locally"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_name_violation_becomes_duplicate_name() {
        let e = CatalogError::from_save(
            StoreError::UniqueViolation {
                constraint: sip_db::UQ_BEVERAGE_NAME.to_string(),
            },
            "Mojito",
        );
        assert!(matches!(e, CatalogError::DuplicateName { ref name } if name == "Mojito"));
    }

    #[test]
    fn other_unique_violation_stays_persistence_failure() {
        let e = CatalogError::from_save(
            StoreError::UniqueViolation {
                constraint: sip_db::UQ_BEVERAGE_INGREDIENT.to_string(),
            },
            "Mojito",
        );
        assert!(matches!(e, CatalogError::PersistenceFailure(_)));
    }

    #[test]
    fn stale_version_becomes_concurrent_modification() {
        let e = CatalogError::from_save(
            StoreError::StaleVersion {
                beverage_id: BeverageId(3),
                expected: 1,
                found: 2,
            },
            "x",
        );
        assert!(matches!(e, CatalogError::ConcurrentModification { id } if id == BeverageId(3)));
    }

    #[test]
    fn persistence_failure_keeps_cause() {
        use std::error::Error;
        let e = CatalogError::from(StoreError::Rejected("bad".to_string()));
        assert!(e.source().is_some());
    }
}
