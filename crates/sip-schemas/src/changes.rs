//! Storage change set: the minimal list of mutations a write needs.
//!
//! Produced by reconciliation, consumed by `EntityStore::save_atomic`, which
//! must apply all of it or none of it.

use serde::{Deserialize, Serialize};

use crate::{BeverageFields, BeverageId, IngredientId, LinkId, NewIngredient};

/// What happens to the beverage row itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeverageWrite {
    Insert(BeverageFields),
    /// Overwrite scalar fields. Rejected by the store if the row's version
    /// moved past `expected_version` since it was read.
    Update {
        id: BeverageId,
        expected_version: i64,
        fields: BeverageFields,
    },
}

/// Ingredient side of a staged link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngredientRef {
    Existing(IngredientId),
    /// Index into `ChangeSet::new_ingredients`.
    Staged(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLink {
    pub ingredient: IngredientRef,
    pub measurement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkUpdate {
    pub link_id: LinkId,
    pub measurement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub beverage: BeverageWrite,
    pub new_ingredients: Vec<NewIngredient>,
    pub new_links: Vec<NewLink>,
    pub link_updates: Vec<LinkUpdate>,
}

impl ChangeSet {
    pub fn new(beverage: BeverageWrite) -> Self {
        Self {
            beverage,
            new_ingredients: Vec::new(),
            new_links: Vec::new(),
            link_updates: Vec::new(),
        }
    }

    /// Beverage being updated; `None` for an insert.
    pub fn target(&self) -> Option<BeverageId> {
        match &self.beverage {
            BeverageWrite::Insert(_) => None,
            BeverageWrite::Update { id, .. } => Some(*id),
        }
    }

    pub fn fields(&self) -> &BeverageFields {
        match &self.beverage {
            BeverageWrite::Insert(f) => f,
            BeverageWrite::Update { fields, .. } => fields,
        }
    }

    /// Row-level mutations, counting the beverage write itself.
    pub fn mutation_count(&self) -> usize {
        1 + self.new_ingredients.len() + self.new_links.len() + self.link_updates.len()
    }

    /// Every `Staged` index must point into `new_ingredients`.
    pub fn staged_refs_in_bounds(&self) -> bool {
        self.new_links.iter().all(|l| match l.ingredient {
            IngredientRef::Staged(i) => i < self.new_ingredients.len(),
            IngredientRef::Existing(_) => true,
        })
    }
}
