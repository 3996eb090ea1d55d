//! Recipe fixtures: a small local catalog and a canned external answer.

use sip_db::seed::{SeedBeverage, SeedIngredient, SeedLink};
use sip_db::SeedData;
use sip_schemas::{
    Beverage, BeverageFields, BeverageId, BeverageIngredient, BeveragePayload, GlassType,
    Ingredient, IngredientId, IngredientReference, LinkId, NewIngredient, Provenance, User, UserId,
};

/// Scalar fields with harmless defaults; tests override what they care about.
pub fn fields(name: &str) -> BeverageFields {
    BeverageFields {
        name: name.to_string(),
        tag: Some("test".to_string()),
        alcohol: false,
        glass: GlassType::Tumbler,
        instruction: None,
        image: None,
        video: None,
        image_attribution: None,
        creative_commons_confirmed: false,
    }
}

pub fn existing_ref(id: i64, measurement: &str) -> IngredientReference {
    IngredientReference {
        ingredient_id: Some(IngredientId(id)),
        inline: None,
        measurement: measurement.to_string(),
    }
}

pub fn inline_ref(name: &str, measurement: &str) -> IngredientReference {
    IngredientReference {
        ingredient_id: None,
        inline: Some(NewIngredient {
            name: name.to_string(),
            description: None,
            image: None,
        }),
        measurement: measurement.to_string(),
    }
}

/// Mojito with one inline ingredient: Mint, 10 leaves.
pub fn mojito_payload() -> BeveragePayload {
    BeveragePayload {
        fields: BeverageFields {
            name: "Mojito".to_string(),
            tag: Some("A refreshing rum cocktail".to_string()),
            alcohol: true,
            glass: GlassType::Highball,
            instruction: Some(
                "Muddle mint leaves and simple syrup in a glass. Add lime juice, rum, and ice. \
                 Top with club soda and stir."
                    .to_string(),
            ),
            image: Some("https://www.example.com/mojito.jpg".to_string()),
            video: None,
            image_attribution: Some("Photo by Jane Doe".to_string()),
            creative_commons_confirmed: true,
        },
        ingredients: vec![IngredientReference {
            ingredient_id: None,
            inline: Some(NewIngredient {
                name: "Mint".to_string(),
                description: Some("A herb with a refreshing, cool taste.".to_string()),
                image: Some("https://example.com/mint.jpg".to_string()),
            }),
            measurement: "10 leaves".to_string(),
        }],
    }
}

fn local_bev(
    id: i64,
    name: &str,
    tag: &str,
    alcohol: bool,
    glass: GlassType,
    attribution: &str,
) -> SeedBeverage {
    SeedBeverage {
        id: BeverageId(id),
        fields: BeverageFields {
            name: name.to_string(),
            tag: Some(tag.to_string()),
            alcohol,
            glass,
            instruction: None,
            image: None,
            video: None,
            image_attribution: Some(attribution.to_string()),
            creative_commons_confirmed: true,
        },
    }
}

fn seed_ing(id: i64, name: &str, description: &str) -> SeedIngredient {
    SeedIngredient {
        id: IngredientId(id),
        ingredient: NewIngredient {
            name: name.to_string(),
            description: Some(description.to_string()),
            image: None,
        },
    }
}

/// Local catalog: Strawberry Lemonade, Iced Tea, Margarita (ids 1..=3), each
/// with one ingredient of the same id, and one user with no favorites.
pub fn local_catalog() -> SeedData {
    SeedData {
        users: vec![User {
            id: UserId(1),
            user_name: "tester".to_string(),
            email: "tester@example.com".to_string(),
        }],
        beverages: vec![
            local_bev(1, "Strawberry Lemonade", "A refreshing drink perfect for summer", false, GlassType::TallGlass, "Photo by John Smith"),
            local_bev(2, "Iced Tea", "A refreshing summer beverage", false, GlassType::TallGlass, "Photo by John Smith"),
            local_bev(3, "Margarita", "A classic tequila cocktail", true, GlassType::Margarita, "Photo by Jane Doe"),
        ],
        ingredients: vec![
            seed_ing(1, "Lemon", "A citrus fruit with sour juice."),
            seed_ing(2, "Black Tea", "A type of tea that is more oxidized than green, white, and oolong teas."),
            seed_ing(3, "Tequila", "A distilled spirit made from the blue agave plant."),
        ],
        links: vec![
            SeedLink {
                id: LinkId(1),
                beverage_id: BeverageId(1),
                ingredient_id: IngredientId(1),
                measurement: "1/2 oz".to_string(),
            },
            SeedLink {
                id: LinkId(2),
                beverage_id: BeverageId(2),
                ingredient_id: IngredientId(2),
                measurement: "8 oz".to_string(),
            },
            SeedLink {
                id: LinkId(3),
                beverage_id: BeverageId(3),
                ingredient_id: IngredientId(3),
                measurement: "2 oz".to_string(),
            },
        ],
        favorites: vec![],
    }
}

fn external(external_id: &str, name: &str, ingredient: &str, measurement: &str, glass: GlassType) -> Beverage {
    Beverage {
        id: None,
        external_id: Some(external_id.to_string()),
        name: name.to_string(),
        tag: Some("Cocktail".to_string()),
        alcohol: true,
        glass: Some(glass),
        instruction: None,
        image: None,
        video: None,
        image_attribution: Some("Photo by Jane Doe".to_string()),
        creative_commons_confirmed: true,
        provenance: Provenance::ExternalCatalog,
        version: 0,
        ingredients: vec![BeverageIngredient {
            id: None,
            ingredient: Ingredient {
                id: None,
                name: ingredient.to_string(),
                description: None,
                image: None,
            },
            measurement: measurement.to_string(),
        }],
    }
}

/// External catalog answer: Mojito, Tomata Margarita.
pub fn external_catalog() -> Vec<Beverage> {
    vec![
        external("11000", "Mojito", "Mint", "10 leaves", GlassType::Highball),
        external("17200", "Tomata Margarita", "Tomato", "2 oz", GlassType::Margarita),
    ]
}
