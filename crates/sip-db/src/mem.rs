//! In-process [`EntityStore`] backend.
//!
//! Rows live in an [`Arena`] of ordered maps behind a single `RwLock`. A save
//! is applied to a copy of the arena and swapped in only if every step
//! succeeds, so a failed save leaves no trace.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use sip_schemas::{
    Beverage, BeverageFields, BeverageId, BeverageIngredient, BeverageWrite, ChangeSet,
    Ingredient, IngredientId, IngredientRef, LinkId, NewIngredient, Provenance, User, UserId,
};
use tokio::sync::RwLock;

use crate::{
    name_matches, EntityStore, FavoriteOutcome, SeedData, StoreError, FK_LINK_INGREDIENT,
    UQ_BEVERAGE_INGREDIENT, UQ_BEVERAGE_NAME,
};

#[derive(Debug, Clone)]
struct BeverageRow {
    fields: BeverageFields,
    version: i64,
}

#[derive(Debug, Clone)]
struct LinkRow {
    beverage_id: i64,
    ingredient_id: i64,
    measurement: String,
}

#[derive(Debug, Clone)]
struct Arena {
    beverages: BTreeMap<i64, BeverageRow>,
    ingredients: BTreeMap<i64, NewIngredient>,
    links: BTreeMap<i64, LinkRow>,
    users: BTreeMap<i64, User>,
    favorites: BTreeSet<(i64, i64)>,
    next_beverage: i64,
    next_ingredient: i64,
    next_link: i64,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            beverages: BTreeMap::new(),
            ingredients: BTreeMap::new(),
            links: BTreeMap::new(),
            users: BTreeMap::new(),
            favorites: BTreeSet::new(),
            next_beverage: 1,
            next_ingredient: 1,
            next_link: 1,
        }
    }
}

/// Row counts, for assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub beverages: usize,
    pub ingredients: usize,
    pub links: usize,
    pub users: usize,
    pub favorites: usize,
}

impl Arena {
    fn name_taken_by_other(&self, name: &str, except: Option<i64>) -> bool {
        self.beverages
            .iter()
            .any(|(id, row)| row.fields.name == name && Some(*id) != except)
    }

    fn assemble(&self, id: i64) -> Option<Beverage> {
        let row = self.beverages.get(&id)?;
        let ingredients = self
            .links
            .iter()
            .filter(|(_, l)| l.beverage_id == id)
            .filter_map(|(link_id, l)| {
                let ing = self.ingredients.get(&l.ingredient_id)?;
                Some(BeverageIngredient {
                    id: Some(LinkId(*link_id)),
                    ingredient: Ingredient {
                        id: Some(IngredientId(l.ingredient_id)),
                        name: ing.name.clone(),
                        description: ing.description.clone(),
                        image: ing.image.clone(),
                    },
                    measurement: l.measurement.clone(),
                })
            })
            .collect();

        let f = &row.fields;
        Some(Beverage {
            id: Some(BeverageId(id)),
            external_id: None,
            name: f.name.clone(),
            tag: f.tag.clone(),
            alcohol: f.alcohol,
            glass: Some(f.glass),
            instruction: f.instruction.clone(),
            image: f.image.clone(),
            video: f.video.clone(),
            image_attribution: f.image_attribution.clone(),
            creative_commons_confirmed: f.creative_commons_confirmed,
            provenance: Provenance::Local,
            version: row.version,
            ingredients,
        })
    }

    fn apply(&mut self, changes: &ChangeSet) -> Result<BeverageId, StoreError> {
        if !changes.staged_refs_in_bounds() {
            return Err(StoreError::Rejected(
                "staged ingredient reference out of bounds".to_string(),
            ));
        }

        let beverage_id = match &changes.beverage {
            BeverageWrite::Insert(fields) => {
                if self.name_taken_by_other(&fields.name, None) {
                    return Err(StoreError::UniqueViolation {
                        constraint: UQ_BEVERAGE_NAME.to_string(),
                    });
                }
                let id = self.next_beverage;
                self.next_beverage += 1;
                self.beverages.insert(
                    id,
                    BeverageRow {
                        fields: fields.clone(),
                        version: 1,
                    },
                );
                id
            }
            BeverageWrite::Update {
                id,
                expected_version,
                fields,
            } => {
                let found = match self.beverages.get(&id.0) {
                    Some(row) => row.version,
                    None => {
                        return Err(StoreError::MissingRow {
                            what: "beverage",
                            id: id.0,
                        })
                    }
                };
                if found != *expected_version {
                    return Err(StoreError::StaleVersion {
                        beverage_id: *id,
                        expected: *expected_version,
                        found,
                    });
                }
                if self.name_taken_by_other(&fields.name, Some(id.0)) {
                    return Err(StoreError::UniqueViolation {
                        constraint: UQ_BEVERAGE_NAME.to_string(),
                    });
                }
                self.beverages.insert(
                    id.0,
                    BeverageRow {
                        fields: fields.clone(),
                        version: found + 1,
                    },
                );
                id.0
            }
        };

        let mut staged_ids = Vec::with_capacity(changes.new_ingredients.len());
        for ing in &changes.new_ingredients {
            let id = self.next_ingredient;
            self.next_ingredient += 1;
            self.ingredients.insert(id, ing.clone());
            staged_ids.push(id);
        }

        for link in &changes.new_links {
            let ingredient_id = match link.ingredient {
                IngredientRef::Existing(i) => i.0,
                IngredientRef::Staged(idx) => staged_ids[idx],
            };
            if !self.ingredients.contains_key(&ingredient_id) {
                return Err(StoreError::ForeignKeyViolation {
                    constraint: FK_LINK_INGREDIENT.to_string(),
                });
            }
            let duplicate = self
                .links
                .values()
                .any(|l| l.beverage_id == beverage_id && l.ingredient_id == ingredient_id);
            if duplicate {
                return Err(StoreError::UniqueViolation {
                    constraint: UQ_BEVERAGE_INGREDIENT.to_string(),
                });
            }
            let id = self.next_link;
            self.next_link += 1;
            self.links.insert(
                id,
                LinkRow {
                    beverage_id,
                    ingredient_id,
                    measurement: link.measurement.clone(),
                },
            );
        }

        for upd in &changes.link_updates {
            match self.links.get_mut(&upd.link_id.0) {
                Some(l) if l.beverage_id == beverage_id => {
                    l.measurement = upd.measurement.clone();
                }
                _ => {
                    return Err(StoreError::MissingRow {
                        what: "beverage ingredient",
                        id: upd.link_id.0,
                    })
                }
            }
        }

        Ok(BeverageId(beverage_id))
    }

    fn load_seed(&mut self, seed: &SeedData) {
        for u in &seed.users {
            self.users.insert(u.id.0, u.clone());
        }
        for b in &seed.beverages {
            self.beverages.insert(
                b.id.0,
                BeverageRow {
                    fields: b.fields.clone(),
                    version: 1,
                },
            );
        }
        for i in &seed.ingredients {
            self.ingredients.insert(i.id.0, i.ingredient.clone());
        }
        for l in &seed.links {
            self.links.insert(
                l.id.0,
                LinkRow {
                    beverage_id: l.beverage_id.0,
                    ingredient_id: l.ingredient_id.0,
                    measurement: l.measurement.clone(),
                },
            );
        }
        for (u, b) in &seed.favorites {
            self.favorites.insert((u.0, b.0));
        }
        self.next_beverage = next_key(&self.beverages);
        self.next_ingredient = next_key(&self.ingredients);
        self.next_link = next_key(&self.links);
    }
}

fn next_key<V>(rows: &BTreeMap<i64, V>) -> i64 {
    rows.keys().next_back().map_or(1, |k| k + 1)
}

#[derive(Debug, Default)]
pub struct MemStore {
    arena: RwLock<Arena>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn counts(&self) -> StoreCounts {
        let a = self.arena.read().await;
        StoreCounts {
            beverages: a.beverages.len(),
            ingredients: a.ingredients.len(),
            links: a.links.len(),
            users: a.users.len(),
            favorites: a.favorites.len(),
        }
    }
}

#[async_trait]
impl EntityStore for MemStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find_beverage(&self, id: BeverageId) -> Result<Option<Beverage>, StoreError> {
        Ok(self.arena.read().await.assemble(id.0))
    }

    async fn find_beverage_id_by_name(
        &self,
        name: &str,
    ) -> Result<Option<BeverageId>, StoreError> {
        let a = self.arena.read().await;
        Ok(a.beverages
            .iter()
            .find(|(_, row)| row.fields.name == name)
            .map(|(id, _)| BeverageId(*id)))
    }

    async fn search_beverages(&self, term: &str) -> Result<Vec<Beverage>, StoreError> {
        let a = self.arena.read().await;
        Ok(a.beverages
            .iter()
            .filter(|(_, row)| name_matches(&row.fields.name, term))
            .filter_map(|(id, _)| a.assemble(*id))
            .collect())
    }

    async fn find_ingredients(&self, ids: &[IngredientId]) -> Result<Vec<Ingredient>, StoreError> {
        let a = self.arena.read().await;
        let mut wanted: Vec<i64> = ids.iter().map(|i| i.0).collect();
        wanted.sort_unstable();
        wanted.dedup();
        Ok(wanted
            .into_iter()
            .filter_map(|id| {
                a.ingredients.get(&id).map(|ing| Ingredient {
                    id: Some(IngredientId(id)),
                    name: ing.name.clone(),
                    description: ing.description.clone(),
                    image: ing.image.clone(),
                })
            })
            .collect())
    }

    async fn save_atomic(&self, changes: &ChangeSet) -> Result<BeverageId, StoreError> {
        let mut guard = self.arena.write().await;
        let mut staged = guard.clone();
        let id = staged.apply(changes)?;
        *guard = staged;
        Ok(id)
    }

    async fn delete_beverage(&self, id: BeverageId) -> Result<bool, StoreError> {
        let mut a = self.arena.write().await;
        if a.beverages.remove(&id.0).is_none() {
            return Ok(false);
        }
        a.links.retain(|_, l| l.beverage_id != id.0);
        a.favorites.retain(|(_, b)| *b != id.0);
        Ok(true)
    }

    async fn favorites_for_user(
        &self,
        user: UserId,
    ) -> Result<Option<Vec<Beverage>>, StoreError> {
        let a = self.arena.read().await;
        if !a.users.contains_key(&user.0) {
            return Ok(None);
        }
        let list = a
            .favorites
            .range((user.0, i64::MIN)..=(user.0, i64::MAX))
            .filter_map(|(_, b)| a.assemble(*b))
            .collect();
        Ok(Some(list))
    }

    async fn add_favorite(
        &self,
        user: UserId,
        beverage: BeverageId,
    ) -> Result<FavoriteOutcome, StoreError> {
        let mut a = self.arena.write().await;
        if !a.users.contains_key(&user.0) {
            return Ok(FavoriteOutcome::UnknownUser);
        }
        if !a.beverages.contains_key(&beverage.0) {
            return Ok(FavoriteOutcome::UnknownBeverage);
        }
        if a.favorites.contains(&(user.0, beverage.0)) {
            return Ok(FavoriteOutcome::AlreadyPresent);
        }
        a.favorites.insert((user.0, beverage.0));
        Ok(FavoriteOutcome::Added)
    }

    async fn bootstrap(&self, seed: &SeedData) -> Result<bool, StoreError> {
        seed.validate()?;
        let mut a = self.arena.write().await;
        if !a.beverages.is_empty() || !a.ingredients.is_empty() || !a.users.is_empty() {
            return Ok(false);
        }
        a.load_seed(seed);
        Ok(true)
    }
}
