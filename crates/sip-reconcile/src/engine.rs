use std::collections::BTreeMap;

use sip_schemas::{
    Beverage, BeverageIngredient, BeveragePayload, BeverageWrite, ChangeSet, Ingredient,
    IngredientId, IngredientRef, LinkId, LinkUpdate, NewIngredient, NewLink, Provenance,
};

use crate::{KnownIngredients, ReconcileError, Reconciled};

/// How one payload entry resolved.
enum Resolved {
    Existing(IngredientId),
    Staged(usize),
}

fn resolve_reference(
    index: usize,
    ingredient_id: Option<IngredientId>,
    inline: Option<&NewIngredient>,
    known: &KnownIngredients,
    new_ingredients: &mut Vec<NewIngredient>,
) -> Result<Resolved, ReconcileError> {
    if let Some(id) = ingredient_id {
        if known.contains(id) {
            return Ok(Resolved::Existing(id));
        }
    }

    match inline {
        Some(ni) if ni.name.trim().is_empty() => Err(ReconcileError::validation(
            format!("ingredients[{index}].ingredient.name"),
            "ingredient name must not be empty",
        )),
        Some(ni) => {
            new_ingredients.push(ni.clone());
            Ok(Resolved::Staged(new_ingredients.len() - 1))
        }
        None => {
            let message = match ingredient_id {
                Some(id) => format!("ingredient {id} does not exist and no inline fields were given"),
                None => "either ingredient_id or ingredient is required".to_string(),
            };
            Err(ReconcileError::validation(
                format!("ingredients[{index}].ingredient"),
                message,
            ))
        }
    }
}

/// Plan the storage mutations that turn `existing` (or nothing, for a create)
/// into the state described by `payload`.
///
/// Pure: all lookups happened before the call and arrive through `known`.
/// - An existing ingredient key is reused; otherwise the inline fields stage a
///   new ingredient.
/// - A resolved ingredient already linked to `existing` becomes an in-place
///   measurement update (dropped when unchanged); anything else a new link.
/// - A key repeated within one payload folds into one link, last measurement wins.
/// - Links the payload does not mention are left alone.
pub fn reconcile(
    existing: Option<&Beverage>,
    payload: &BeveragePayload,
    known: &KnownIngredients,
) -> Result<Reconciled, ReconcileError> {
    let fields = &payload.fields;
    if fields.name.trim().is_empty() {
        return Err(ReconcileError::validation("name", "name must not be empty"));
    }

    let write = match existing {
        None => BeverageWrite::Insert(fields.clone()),
        Some(b) => {
            let id = b.id.filter(|_| b.is_local()).ok_or_else(|| ReconcileError::NotLocal {
                name: b.name.clone(),
            })?;
            BeverageWrite::Update {
                id,
                expected_version: b.version,
                fields: fields.clone(),
            }
        }
    };

    let mut changes = ChangeSet::new(write);
    // Folding maps: existing link -> measurement, linked-once key -> new_links index.
    let mut updates: BTreeMap<LinkId, String> = BTreeMap::new();
    let mut new_link_for: BTreeMap<IngredientId, usize> = BTreeMap::new();

    for (i, r) in payload.ingredients.iter().enumerate() {
        let resolved = resolve_reference(
            i,
            r.ingredient_id,
            r.inline.as_ref(),
            known,
            &mut changes.new_ingredients,
        )?;

        match resolved {
            Resolved::Existing(id) => {
                let linked = existing.and_then(|b| b.link_for(id)).and_then(|l| l.id);
                if let Some(link_id) = linked {
                    updates.insert(link_id, r.measurement.clone());
                } else if let Some(&idx) = new_link_for.get(&id) {
                    changes.new_links[idx].measurement = r.measurement.clone();
                } else {
                    new_link_for.insert(id, changes.new_links.len());
                    changes.new_links.push(NewLink {
                        ingredient: IngredientRef::Existing(id),
                        measurement: r.measurement.clone(),
                    });
                }
            }
            Resolved::Staged(idx) => changes.new_links.push(NewLink {
                ingredient: IngredientRef::Staged(idx),
                measurement: r.measurement.clone(),
            }),
        }
    }

    let current: BTreeMap<LinkId, &str> = existing
        .map(|b| {
            b.ingredients
                .iter()
                .filter_map(|l| l.id.map(|id| (id, l.measurement.as_str())))
                .collect()
        })
        .unwrap_or_default();
    changes.link_updates = updates
        .into_iter()
        .filter(|(link_id, m)| current.get(link_id) != Some(&m.as_str()))
        .map(|(link_id, measurement)| LinkUpdate {
            link_id,
            measurement,
        })
        .collect();

    let beverage = project(existing, &changes, known);
    Ok(Reconciled { beverage, changes })
}

/// The beverage as it reads back after `changes` commit. New rows have no keys yet.
fn project(existing: Option<&Beverage>, changes: &ChangeSet, known: &KnownIngredients) -> Beverage {
    let f = changes.fields();

    let mut links: Vec<BeverageIngredient> = existing
        .map(|b| b.ingredients.clone())
        .unwrap_or_default();
    for upd in &changes.link_updates {
        if let Some(l) = links.iter_mut().find(|l| l.id == Some(upd.link_id)) {
            l.measurement = upd.measurement.clone();
        }
    }
    for nl in &changes.new_links {
        let ingredient = match nl.ingredient {
            IngredientRef::Existing(id) => known.get(id).cloned().unwrap_or(Ingredient {
                id: Some(id),
                name: String::new(),
                description: None,
                image: None,
            }),
            IngredientRef::Staged(idx) => {
                let ni = &changes.new_ingredients[idx];
                Ingredient {
                    id: None,
                    name: ni.name.clone(),
                    description: ni.description.clone(),
                    image: ni.image.clone(),
                }
            }
        };
        links.push(BeverageIngredient {
            id: None,
            ingredient,
            measurement: nl.measurement.clone(),
        });
    }

    Beverage {
        id: changes.target(),
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
        version: existing.map_or(1, |b| b.version + 1),
        ingredients: links,
    }
}
