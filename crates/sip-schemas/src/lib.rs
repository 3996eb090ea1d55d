//! sip-schemas
//!
//! Domain types shared by every crate in the workspace: beverages, ingredients,
//! the join links between them and users, plus the validated write
//! payload and the storage change set produced by reconciliation.
//!
//! No IO. No business rules beyond parsing enumerated fields.

mod changes;

pub use changes::*;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Surrogate keys
// ---------------------------------------------------------------------------

macro_rules! surrogate_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }
    };
}

surrogate_key!(
    /// Local key of a beverage row.
    BeverageId
);
surrogate_key!(
    /// Local key of an ingredient row.
    IngredientId
);
surrogate_key!(
    /// Local key of a beverage/ingredient join row.
    LinkId
);
surrogate_key!(UserId);

// ---------------------------------------------------------------------------
// GlassType
// ---------------------------------------------------------------------------

/// Serving glass. Closed set; anything else is rejected at the boundary.
///
/// Numeric codes are the legacy wire encoding (0..=5, in declaration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GlassType {
    Martini,
    Tumbler,
    LongGlass,
    Highball,
    Margarita,
    TallGlass,
}

impl GlassType {
    pub const ALL: [GlassType; 6] = [
        GlassType::Martini,
        GlassType::Tumbler,
        GlassType::LongGlass,
        GlassType::Highball,
        GlassType::Margarita,
        GlassType::TallGlass,
    ];

    pub fn code(&self) -> i64 {
        match self {
            GlassType::Martini => 0,
            GlassType::Tumbler => 1,
            GlassType::LongGlass => 2,
            GlassType::Highball => 3,
            GlassType::Margarita => 4,
            GlassType::TallGlass => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.code() == code)
    }

    /// Canonical label, also the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            GlassType::Martini => "Martini glass",
            GlassType::Tumbler => "Tumbler",
            GlassType::LongGlass => "Long glass",
            GlassType::Highball => "Highball glass",
            GlassType::Margarita => "Margarita glass",
            GlassType::TallGlass => "Tall glass",
        }
    }

    /// Case-insensitive label parse. Accepts the canonical label, the bare
    /// kind without "glass", and the legacy seed spelling "Thumbler".
    pub fn parse_label(s: &str) -> Option<Self> {
        let norm = s.trim().to_ascii_lowercase();
        let kind = norm.strip_suffix(" glass").unwrap_or(&norm).trim();
        match kind {
            "martini" => Some(GlassType::Martini),
            "tumbler" | "thumbler" => Some(GlassType::Tumbler),
            "long" => Some(GlassType::LongGlass),
            "highball" => Some(GlassType::Highball),
            "margarita" | "margarita/coupette" => Some(GlassType::Margarita),
            "tall" => Some(GlassType::TallGlass),
            _ => None,
        }
    }
}

impl fmt::Display for GlassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GlassType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GlassType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        GlassType::parse_label(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown glass type '{raw}'")))
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Where a beverage record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Local,
    ExternalCatalog,
}

// ---------------------------------------------------------------------------
// Read model
// ---------------------------------------------------------------------------

/// Shared ingredient. `id` is `None` for records that only exist in an
/// external catalog response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Option<IngredientId>,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Join record: one beverage, one ingredient, one measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeverageIngredient {
    pub id: Option<LinkId>,
    pub ingredient: Ingredient,
    pub measurement: String,
}

impl BeverageIngredient {
    pub fn ingredient_id(&self) -> Option<IngredientId> {
        self.ingredient.id
    }
}

/// A recipe as served to callers, local or external.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beverage {
    /// Local surrogate key; always set for `Provenance::Local`.
    pub id: Option<BeverageId>,
    /// Id assigned by the external catalog (e.g. TheCocktailDB `idDrink`).
    pub external_id: Option<String>,
    pub name: String,
    pub tag: Option<String>,
    pub alcohol: bool,
    /// `None` only for external records whose glass is outside the known set.
    pub glass: Option<GlassType>,
    pub instruction: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub image_attribution: Option<String>,
    pub creative_commons_confirmed: bool,
    pub provenance: Provenance,
    /// Optimistic-concurrency counter; bumped by every committed save.
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub ingredients: Vec<BeverageIngredient>,
}

impl Beverage {
    pub fn is_local(&self) -> bool {
        self.provenance == Provenance::Local
    }

    /// Link for `ingredient`, if this beverage already has one.
    pub fn link_for(&self, ingredient: IngredientId) -> Option<&BeverageIngredient> {
        self.ingredients
            .iter()
            .find(|l| l.ingredient_id() == Some(ingredient))
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Catalog user. Credentials live with the identity provider and never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub user_name: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Write model
// ---------------------------------------------------------------------------

/// Scalar beverage fields carried by every full-payload write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeverageFields {
    pub name: String,
    pub tag: Option<String>,
    pub alcohol: bool,
    pub glass: GlassType,
    pub instruction: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub image_attribution: Option<String>,
    pub creative_commons_confirmed: bool,
}

/// Inline ingredient creation fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// One ingredient mentioned by a write payload: an existing key, inline
/// creation fields, or both (the key wins when it resolves).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientReference {
    pub ingredient_id: Option<IngredientId>,
    pub inline: Option<NewIngredient>,
    pub measurement: String,
}

/// Validated create/update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeveragePayload {
    pub fields: BeverageFields,
    pub ingredients: Vec<IngredientReference>,
}

impl BeveragePayload {
    /// Existing-ingredient keys referenced by this payload, sorted and unique.
    pub fn referenced_ingredient_ids(&self) -> Vec<IngredientId> {
        let mut ids: Vec<IngredientId> = self
            .ingredients
            .iter()
            .filter_map(|r| r.ingredient_id)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
