//! Request and response types for all sip-daemon HTTP endpoints.
//!
//! Wire shapes only. The one piece of logic here is turning a
//! [`BeverageRequest`] into the validated [`BeveragePayload`] the catalog
//! service accepts.

use serde::{Deserialize, Serialize};
use sip_runtime::CatalogError;
use sip_schemas::{
    Beverage, BeverageFields, BeverageId, BeveragePayload, GlassType, IngredientId,
    IngredientReference, NewIngredient,
};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    /// Store backend in use ("memory" | "postgres").
    pub store: &'static str,
    /// External catalog source ("thecocktaildb" | "disabled" | ...).
    pub catalog: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine code, e.g. "DUPLICATE_NAME".
    pub error: String,
    pub message: String,
    /// Offending request field for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

// ---------------------------------------------------------------------------
// /v1/beverages/search/:term
// ---------------------------------------------------------------------------

pub use sip_runtime::SearchResponse;

// ---------------------------------------------------------------------------
// POST /v1/beverages, PUT /v1/beverages/:id
// ---------------------------------------------------------------------------

/// Glass as sent by clients: the legacy numeric code or a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GlassValue {
    Code(i64),
    Label(String),
}

impl GlassValue {
    pub fn resolve(&self) -> Option<GlassType> {
        match self {
            GlassValue::Code(c) => GlassType::from_code(*c),
            GlassValue::Label(s) => GlassType::parse_label(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineIngredientRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeverageIngredientRequest {
    #[serde(default)]
    pub ingredient_id: Option<i64>,
    #[serde(default)]
    pub ingredient: Option<InlineIngredientRequest>,
    pub measurement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeverageRequest {
    /// Must equal the path id on update when present.
    #[serde(default)]
    pub beverage_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub alcohol: bool,
    #[serde(default)]
    pub glass: Option<GlassValue>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub image_attribution: Option<String>,
    #[serde(default)]
    pub creative_commons_confirmed: bool,
    #[serde(default)]
    pub beverage_ingredients: Vec<BeverageIngredientRequest>,
}

impl BeverageRequest {
    /// Body id, if the client sent one.
    pub fn body_id(&self) -> Option<BeverageId> {
        self.beverage_id.map(BeverageId)
    }

    /// Validate the glass and convert to the service payload. Name and
    /// ingredient checks happen in the service.
    pub fn into_payload(self) -> Result<BeveragePayload, CatalogError> {
        let glass = match &self.glass {
            None => return Err(CatalogError::validation("glass", "glass is required")),
            Some(v) => v.resolve().ok_or_else(|| {
                CatalogError::validation("glass", format!("unknown glass type {}", describe(v)))
            })?,
        };

        let ingredients = self
            .beverage_ingredients
            .into_iter()
            .map(|r| IngredientReference {
                ingredient_id: r.ingredient_id.map(IngredientId),
                inline: r.ingredient.map(|i| NewIngredient {
                    name: i.name,
                    description: i.description,
                    image: i.image,
                }),
                measurement: r.measurement,
            })
            .collect();

        Ok(BeveragePayload {
            fields: BeverageFields {
                name: self.name,
                tag: self.tag,
                alcohol: self.alcohol,
                glass,
                instruction: self.instruction,
                image: self.image,
                video: self.video,
                image_attribution: self.image_attribution,
                creative_commons_confirmed: self.creative_commons_confirmed,
            },
            ingredients,
        })
    }
}

fn describe(v: &GlassValue) -> String {
    match v {
        GlassValue::Code(c) => format!("code {c} (expected 0..=5)"),
        GlassValue::Label(s) => format!("'{s}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(glass: serde_json::Value) -> BeverageRequest {
        serde_json::from_value(serde_json::json!({
            "name": "Mojito",
            "glass": glass,
            "beverage_ingredients": [
                { "ingredient_id": 3, "measurement": "2 oz" },
                { "ingredient": { "name": "Mint" }, "measurement": "10 leaves" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn glass_accepts_code_and_label() {
        let by_code = request(serde_json::json!(3)).into_payload().unwrap();
        let by_label = request(serde_json::json!("highball")).into_payload().unwrap();
        assert_eq!(by_code.fields.glass, GlassType::Highball);
        assert_eq!(by_label.fields.glass, GlassType::Highball);
    }

    #[test]
    fn unknown_glass_names_the_field() {
        for bad in [serde_json::json!(6), serde_json::json!("goblet")] {
            match request(bad).into_payload() {
                Err(CatalogError::Validation { field, .. }) => assert_eq!(field, "glass"),
                other => panic!("expected glass validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn ingredient_references_keep_order_and_shape() {
        let p = request(serde_json::json!(1)).into_payload().unwrap();
        assert_eq!(p.ingredients.len(), 2);
        assert_eq!(p.ingredients[0].ingredient_id, Some(IngredientId(3)));
        assert!(p.ingredients[0].inline.is_none());
        assert_eq!(p.ingredients[1].inline.as_ref().unwrap().name, "Mint");
        assert_eq!(p.ingredients[1].measurement, "10 leaves");
    }
}
