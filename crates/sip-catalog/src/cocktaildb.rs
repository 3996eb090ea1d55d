//! TheCocktailDB-backed [`CatalogSource`].
//!
//! API key is resolved by the caller and passed in; do not log it.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use sip_schemas::{Beverage, BeverageIngredient, GlassType, Ingredient, Provenance};
use tracing::debug;

use crate::{CatalogSource, SourceUnavailable};

pub const DEFAULT_BASE_URL: &str = "https://www.thecocktaildb.com/api/json/v1";

/// TheCocktailDB numbers ingredient/measure pairs 1 through 15.
const MAX_INGREDIENT_SLOTS: usize = 15;

#[derive(Debug, Clone)]
pub struct CocktailDbSource {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl CocktailDbSource {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, SourceUnavailable> {
        Self::new_with_base_url(api_key, DEFAULT_BASE_URL.to_string(), timeout)
    }

    pub fn new_with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, SourceUnavailable> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceUnavailable::Transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            api_key,
            http,
            base_url,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    fn build_search_url(&self) -> String {
        format!(
            "{}/{}/search.php",
            self.base_url.trim_end_matches('/'),
            self.api_key
        )
    }
}

#[async_trait::async_trait]
impl CatalogSource for CocktailDbSource {
    fn source_name(&self) -> &'static str {
        "thecocktaildb"
    }

    async fn search_by_name(&self, term: &str) -> Result<Vec<Beverage>, SourceUnavailable> {
        let resp = self
            .http
            .get(self.build_search_url())
            .query(&[("s", term)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceUnavailable::Timeout {
                        after_ms: self.timeout_ms,
                    }
                } else {
                    SourceUnavailable::Transport(e.without_url().to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceUnavailable::Status {
                code: status.as_u16(),
            });
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| SourceUnavailable::Decode(e.without_url().to_string()))?;

        let drinks = body.drinks.unwrap_or_default();
        debug!(term, count = drinks.len(), "cocktaildb search answered");
        Ok(drinks.into_iter().map(DrinkRecord::into_beverage).collect())
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// `null` when nothing matched.
    drinks: Option<Vec<DrinkRecord>>,
}

#[derive(Debug, Deserialize)]
struct DrinkRecord {
    #[serde(rename = "idDrink")]
    id_drink: Option<String>,
    #[serde(rename = "strDrink")]
    name: Option<String>,
    #[serde(rename = "strCategory")]
    category: Option<String>,
    #[serde(rename = "strAlcoholic")]
    alcoholic: Option<String>,
    #[serde(rename = "strGlass")]
    glass: Option<String>,
    #[serde(rename = "strInstructions")]
    instructions: Option<String>,
    #[serde(rename = "strDrinkThumb")]
    thumb: Option<String>,
    #[serde(rename = "strVideo")]
    video: Option<String>,
    #[serde(rename = "strImageAttribution")]
    image_attribution: Option<String>,
    #[serde(rename = "strCreativeCommonsConfirmed")]
    creative_commons_confirmed: Option<String>,
    /// strIngredientN / strMeasureN and every field we do not map.
    #[serde(flatten)]
    rest: HashMap<String, Value>,
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl DrinkRecord {
    fn slot(&self, prefix: &str, n: usize) -> Option<String> {
        match self.rest.get(&format!("{prefix}{n}")) {
            Some(Value::String(s)) => non_blank(Some(s.clone())),
            _ => None,
        }
    }

    fn links(&self) -> Vec<BeverageIngredient> {
        (1..=MAX_INGREDIENT_SLOTS)
            .filter_map(|n| {
                let name = self.slot("strIngredient", n)?;
                Some(BeverageIngredient {
                    id: None,
                    ingredient: Ingredient {
                        id: None,
                        name,
                        description: None,
                        image: None,
                    },
                    measurement: self.slot("strMeasure", n).unwrap_or_default(),
                })
            })
            .collect()
    }

    fn into_beverage(self) -> Beverage {
        let ingredients = self.links();
        Beverage {
            id: None,
            external_id: non_blank(self.id_drink),
            name: non_blank(self.name).unwrap_or_default(),
            tag: non_blank(self.category),
            alcohol: self.alcoholic.as_deref() == Some("Alcoholic"),
            glass: self.glass.as_deref().and_then(GlassType::parse_label),
            instruction: non_blank(self.instructions),
            image: non_blank(self.thumb),
            video: non_blank(self.video),
            image_attribution: non_blank(self.image_attribution),
            creative_commons_confirmed: self.creative_commons_confirmed.as_deref() == Some("Yes"),
            provenance: Provenance::ExternalCatalog,
            version: 0,
            ingredients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(v: Value) -> Vec<Beverage> {
        let body: SearchResponse = serde_json::from_value(v).unwrap();
        body.drinks
            .unwrap_or_default()
            .into_iter()
            .map(DrinkRecord::into_beverage)
            .collect()
    }

    #[test]
    fn maps_drink_fields_and_ingredient_slots() {
        let out = decode(json!({
            "drinks": [{
                "idDrink": "11000",
                "strDrink": "Mojito",
                "strCategory": "Cocktail",
                "strAlcoholic": "Alcoholic",
                "strGlass": "Highball glass",
                "strInstructions": "Muddle mint leaves with sugar and lime juice.",
                "strDrinkThumb": "https://example.test/mojito.jpg",
                "strVideo": null,
                "strImageAttribution": null,
                "strCreativeCommonsConfirmed": "No",
                "strIngredient1": "Light rum",
                "strMeasure1": "2-3 oz ",
                "strIngredient2": "Mint",
                "strMeasure2": null,
                "strIngredient3": "",
                "strIngredient4": null
            }]
        }));
        assert_eq!(out.len(), 1);
        let b = &out[0];
        assert_eq!(b.external_id.as_deref(), Some("11000"));
        assert_eq!(b.name, "Mojito");
        assert_eq!(b.tag.as_deref(), Some("Cocktail"));
        assert!(b.alcohol);
        assert_eq!(b.glass, Some(GlassType::Highball));
        assert_eq!(b.provenance, Provenance::ExternalCatalog);
        assert!(b.id.is_none());
        assert!(!b.creative_commons_confirmed);
        assert_eq!(b.ingredients.len(), 2);
        assert_eq!(b.ingredients[0].ingredient.name, "Light rum");
        assert_eq!(b.ingredients[0].measurement, "2-3 oz");
        assert_eq!(b.ingredients[1].measurement, "");
        assert!(b.ingredients.iter().all(|l| l.id.is_none() && l.ingredient.id.is_none()));
    }

    #[test]
    fn unknown_glass_maps_to_none() {
        let out = decode(json!({
            "drinks": [{ "idDrink": "1", "strDrink": "Shot", "strGlass": "Shot glass",
                         "strAlcoholic": "Non alcoholic" }]
        }));
        assert_eq!(out[0].glass, None);
        assert!(!out[0].alcohol);
    }

    #[test]
    fn null_drinks_is_empty() {
        assert!(decode(json!({ "drinks": null })).is_empty());
    }

    #[test]
    fn search_url_embeds_key() {
        let src = CocktailDbSource::new_with_base_url(
            "1".to_string(),
            "http://localhost:1/api/json/v1/".to_string(),
            Duration::from_millis(100),
        )
        .unwrap();
        assert_eq!(
            src.build_search_url(),
            "http://localhost:1/api/json/v1/1/search.php"
        );
    }
}
