//! Bootstrap data loaded into empty storage.
//!
//! Seed rows carry explicit keys so the initial catalog is identical on every
//! backend. Postgres advances its identity sequences past the seeded keys.

use std::collections::BTreeSet;

use sip_schemas::{
    BeverageFields, BeverageId, GlassType, IngredientId, LinkId, NewIngredient, User, UserId,
};

use crate::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedBeverage {
    pub id: BeverageId,
    pub fields: BeverageFields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedIngredient {
    pub id: IngredientId,
    pub ingredient: NewIngredient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedLink {
    pub id: LinkId,
    pub beverage_id: BeverageId,
    pub ingredient_id: IngredientId,
    pub measurement: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedData {
    pub users: Vec<User>,
    pub beverages: Vec<SeedBeverage>,
    pub ingredients: Vec<SeedIngredient>,
    pub links: Vec<SeedLink>,
    pub favorites: Vec<(UserId, BeverageId)>,
}

impl SeedData {
    /// Reject seeds that would violate a storage constraint, before any write.
    pub fn validate(&self) -> Result<(), StoreError> {
        let user_ids = unique_keys(self.users.iter().map(|u| u.id.0), "user")?;
        let bev_ids = unique_keys(self.beverages.iter().map(|b| b.id.0), "beverage")?;
        let ing_ids = unique_keys(self.ingredients.iter().map(|i| i.id.0), "ingredient")?;
        unique_keys(self.links.iter().map(|l| l.id.0), "link")?;

        let mut names = BTreeSet::new();
        for b in &self.beverages {
            if !names.insert(b.fields.name.as_str()) {
                return Err(StoreError::Rejected(format!(
                    "seed beverage name '{}' is not unique",
                    b.fields.name
                )));
            }
        }

        let mut pairs = BTreeSet::new();
        for l in &self.links {
            if !bev_ids.contains(&l.beverage_id.0) {
                return Err(StoreError::Rejected(format!(
                    "seed link {} references unknown beverage {}",
                    l.id, l.beverage_id
                )));
            }
            if !ing_ids.contains(&l.ingredient_id.0) {
                return Err(StoreError::Rejected(format!(
                    "seed link {} references unknown ingredient {}",
                    l.id, l.ingredient_id
                )));
            }
            if !pairs.insert((l.beverage_id, l.ingredient_id)) {
                return Err(StoreError::Rejected(format!(
                    "seed links beverage {} to ingredient {} twice",
                    l.beverage_id, l.ingredient_id
                )));
            }
        }

        for (u, b) in &self.favorites {
            if !user_ids.contains(&u.0) || !bev_ids.contains(&b.0) {
                return Err(StoreError::Rejected(format!(
                    "seed favorite ({u}, {b}) references an unknown row"
                )));
            }
        }
        Ok(())
    }
}

fn unique_keys(
    keys: impl Iterator<Item = i64>,
    what: &'static str,
) -> Result<BTreeSet<i64>, StoreError> {
    let mut seen = BTreeSet::new();
    for k in keys {
        if k < 1 {
            return Err(StoreError::Rejected(format!("seed {what} key {k} must be positive")));
        }
        if !seen.insert(k) {
            return Err(StoreError::Rejected(format!("seed {what} key {k} is duplicated")));
        }
    }
    Ok(seen)
}

fn bev(
    id: i64,
    name: &str,
    tag: &str,
    alcohol: bool,
    glass: GlassType,
    instruction: &str,
    image: &str,
) -> SeedBeverage {
    SeedBeverage {
        id: BeverageId(id),
        fields: BeverageFields {
            name: name.to_string(),
            tag: Some(tag.to_string()),
            alcohol,
            glass,
            instruction: Some(instruction.to_string()),
            image: Some(image.to_string()),
            video: None,
            image_attribution: None,
            creative_commons_confirmed: false,
        },
    }
}

fn ing(id: i64, name: &str, description: &str, image: &str) -> SeedIngredient {
    SeedIngredient {
        id: IngredientId(id),
        ingredient: NewIngredient {
            name: name.to_string(),
            description: Some(description.to_string()),
            image: Some(image.to_string()),
        },
    }
}

fn link(id: i64, beverage: i64, ingredient: i64, measurement: &str) -> SeedLink {
    SeedLink {
        id: LinkId(id),
        beverage_id: BeverageId(beverage),
        ingredient_id: IngredientId(ingredient),
        measurement: measurement.to_string(),
    }
}

/// The initial catalog shipped with the service.
pub fn default_seed() -> SeedData {
    SeedData {
        users: vec![
            User {
                id: UserId(1),
                user_name: "ChuckNorris".to_string(),
                email: "kickass@gmail.com".to_string(),
            },
            User {
                id: UserId(2),
                user_name: "BruceLee".to_string(),
                email: "iiiiiijjjaaa@hotmail.com".to_string(),
            },
        ],
        beverages: vec![
            bev(
                1,
                "Potato Margarita",
                "ordinary",
                true,
                GlassType::Martini,
                "Shake it like a polaroid picture",
                "http://potatomargarita.com",
            ),
            bev(
                2,
                "Tomato Martini",
                "cocktail",
                true,
                GlassType::Tumbler,
                "Stir it up",
                "http://tomatomartini.com",
            ),
            bev(
                3,
                "Brocoli Old Fashioned",
                "ordinary",
                false,
                GlassType::LongGlass,
                "On the grind",
                "http://brocolioldfashined.com",
            ),
        ],
        ingredients: vec![
            ing(1, "Brocoli Liqueur", "Great vegetable, quite bitter", "http://brocoli.com"),
            ing(2, "Potato", "Saved nations from famine", "http://potato.com"),
            ing(3, "Tomato extract", "The italian berry", "http://tomato.com"),
        ],
        links: vec![
            link(1, 1, 1, "60ml"),
            link(2, 1, 2, "One Slice"),
            link(3, 1, 3, "35ml"),
        ],
        favorites: vec![(UserId(1), BeverageId(1)), (UserId(2), BeverageId(2))],
    }
}
