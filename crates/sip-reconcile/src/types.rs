use std::collections::BTreeMap;

use serde::Serialize;
use sip_schemas::{Beverage, ChangeSet, Ingredient, IngredientId};

/// Ingredients the caller looked up by key before reconciling.
///
/// Only entries present here count as "existing"; a payload key missing from
/// this set is treated as unresolvable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KnownIngredients {
    by_id: BTreeMap<IngredientId, Ingredient>,
}

impl KnownIngredients {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Ingredient>) -> Self {
        let by_id = rows
            .into_iter()
            .filter_map(|i| i.id.map(|id| (id, i)))
            .collect();
        Self { by_id }
    }

    pub fn get(&self, id: IngredientId) -> Option<&Ingredient> {
        self.by_id.get(&id)
    }

    pub fn contains(&self, id: IngredientId) -> bool {
        self.by_id.contains_key(&id)
    }
}

/// Output of [`crate::reconcile`]: the change set to persist and the beverage
/// as it will read back once the change set commits (new keys left unset).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciled {
    pub beverage: Beverage,
    pub changes: ChangeSet,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ReconcileError {
    /// The payload is unusable; `field` is the wire path of the offending value.
    Validation { field: String, message: String },
    /// The beverage handed in as `existing` has no local key.
    NotLocal { name: String },
}

impl ReconcileError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ReconcileError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::Validation { field, message } => {
                write!(f, "invalid {field}: {message}")
            }
            ReconcileError::NotLocal { name } => {
                write!(f, "beverage '{name}' is not stored locally")
            }
        }
    }
}

impl std::error::Error for ReconcileError {}
