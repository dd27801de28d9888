//! Schema adapters: version-specific raw records <-> the normalized form.
//!
//! One pure `normalize`/`denormalize` function pair per supported game
//! version, dispatched as a tagged union on [`VersionTag`]. The structural
//! differences the adapters absorb:
//!
//! - **1.20.1** -- result objects use the `item` key; furnace-family results
//!   are a bare item string; stonecutting carries its count as a top-level
//!   field; ingredients are `{"item": ..}` / `{"tag": ..}` objects.
//! - **1.21.1** -- result objects use the `id` key with an optional
//!   `components` payload; ingredients as in 1.20.1.
//! - **1.21.4** -- results as 1.21.1; ingredients are plain strings, with
//!   tags written as `"#namespace:path"`.
//!
//! Round-trip law: `denormalize(normalize(r)) == r` for any canonical raw
//! record `r` of a supported version. Single-value ingredient lists and
//! count-1 results are canonicalized to their short forms on the way out,
//! matching how the game itself writes data files.

use crate::id::ResourceId;
use crate::recipe::{
    Ingredient, IngredientValue, IntermediateRecipe, RawRecipe, RecipeKind, RecipeOutput,
    VersionTag,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from normalizing or denormalizing a single recipe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// The raw record's `type` tag has no known mapping for this version.
    /// Non-fatal: the coordinator passes such recipes through unmodified.
    #[error("unsupported recipe type: {0}")]
    UnsupportedRecipeType(String),
    /// A required field is absent or mistyped. Fatal for this one recipe.
    #[error("malformed recipe: {0}")]
    MalformedRecipe(String),
}

fn malformed(detail: impl Into<String>) -> AdapterError {
    AdapterError::MalformedRecipe(detail.into())
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Normalize a raw record into the version-independent form.
pub fn normalize(raw: &RawRecipe) -> Result<IntermediateRecipe, AdapterError> {
    let obj = raw
        .payload
        .as_object()
        .ok_or_else(|| malformed("recipe payload is not an object"))?;
    let type_id = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing 'type' tag"))?;
    let kind = RecipeKind::from_type_id(type_id)
        .ok_or_else(|| AdapterError::UnsupportedRecipeType(type_id.to_string()))?;

    let ingredients = parse_slots(kind, obj, raw.version)?;
    let output = parse_output(kind, obj, raw.version)?;
    let extra = collect_extra(kind, obj, raw.version);

    Ok(IntermediateRecipe {
        kind,
        ingredients,
        output,
        extra,
    })
}

/// Map a normalized recipe back to the raw record shape of the given
/// version. Inverse of [`normalize`] for canonical records.
///
/// Always emits the canonical short forms: single-value slots as bare
/// entries and a count of 1 omitted. A record that spelled those out
/// explicitly normalizes fine but re-emits in canonical form, which is
/// why callers keep original payload bytes for records they did not
/// modify.
pub fn denormalize(
    recipe: &IntermediateRecipe,
    version: VersionTag,
) -> Result<RawRecipe, AdapterError> {
    let mut obj = Map::new();

    // Extension-bag fields first; structural fields below override any
    // reserved key a rule may have written into the bag.
    for (k, v) in &recipe.extra {
        obj.insert(k.clone(), v.clone());
    }
    obj.insert(
        "type".to_string(),
        Value::String(recipe.kind.type_id().to_string()),
    );

    match recipe.kind {
        RecipeKind::Shapeless => {
            let slots: Vec<Value> = recipe
                .ingredients
                .iter()
                .map(|s| emit_ingredient(s, version))
                .collect();
            obj.insert("ingredients".to_string(), Value::Array(slots));
        }
        RecipeKind::Shaped => {
            let mut key_map = Map::new();
            for slot in &recipe.ingredients {
                let key = slot
                    .key
                    .ok_or_else(|| malformed("shaped slot missing pattern key"))?;
                key_map.insert(key.to_string(), emit_ingredient(slot, version));
            }
            obj.insert("key".to_string(), Value::Object(key_map));
        }
        _ => {
            // Single-input kinds: cooking family and stonecutting.
            let [slot] = recipe.ingredients.as_slice() else {
                return Err(malformed(format!(
                    "{:?} recipe must have exactly one ingredient slot",
                    recipe.kind
                )));
            };
            obj.insert("ingredient".to_string(), emit_ingredient(slot, version));
        }
    }

    emit_output(recipe.kind, &recipe.output, version, &mut obj)?;

    Ok(RawRecipe::new(version, Value::Object(obj)))
}

// ---------------------------------------------------------------------------
// Ingredient slots
// ---------------------------------------------------------------------------

fn parse_id(s: &str) -> Result<ResourceId, AdapterError> {
    s.parse()
        .map_err(|e| malformed(format!("bad identifier: {e}")))
}

/// Parse one ingredient slot value in the object form used by 1.20.1 and
/// 1.21.1: `{"item": id}` or `{"tag": id}`, or an array of those.
fn parse_values_object_form(value: &Value) -> Result<Vec<IngredientValue>, AdapterError> {
    match value {
        Value::Array(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(parse_one_object(element)?);
            }
            Ok(values)
        }
        _ => Ok(vec![parse_one_object(value)?]),
    }
}

fn parse_one_object(value: &Value) -> Result<IngredientValue, AdapterError> {
    let obj = value
        .as_object()
        .ok_or_else(|| malformed("ingredient value is not an object"))?;
    match (obj.get("item"), obj.get("tag")) {
        (Some(Value::String(s)), None) => Ok(IngredientValue::Item(parse_id(s)?)),
        (None, Some(Value::String(s))) => Ok(IngredientValue::Tag(parse_id(s)?)),
        _ => Err(malformed(
            "ingredient value must have exactly one of 'item' or 'tag'",
        )),
    }
}

/// Parse one ingredient slot value in the string form used by 1.21.4:
/// `"ns:path"`, `"#ns:path"` for tags, or an array of strings.
fn parse_values_string_form(value: &Value) -> Result<Vec<IngredientValue>, AdapterError> {
    match value {
        Value::Array(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(parse_one_string(element)?);
            }
            Ok(values)
        }
        _ => Ok(vec![parse_one_string(value)?]),
    }
}

fn parse_one_string(value: &Value) -> Result<IngredientValue, AdapterError> {
    let s = value
        .as_str()
        .ok_or_else(|| malformed("ingredient value is not a string"))?;
    match s.strip_prefix('#') {
        Some(tag) => Ok(IngredientValue::Tag(parse_id(tag)?)),
        None => Ok(IngredientValue::Item(parse_id(s)?)),
    }
}

fn parse_values(value: &Value, version: VersionTag) -> Result<Vec<IngredientValue>, AdapterError> {
    match version {
        VersionTag::V1_20_1 | VersionTag::V1_21_1 => parse_values_object_form(value),
        VersionTag::V1_21_4 => parse_values_string_form(value),
    }
}

fn parse_slots(
    kind: RecipeKind,
    obj: &Map<String, Value>,
    version: VersionTag,
) -> Result<Vec<Ingredient>, AdapterError> {
    match kind {
        RecipeKind::Shapeless => {
            let list = obj
                .get("ingredients")
                .and_then(Value::as_array)
                .ok_or_else(|| malformed("shapeless recipe missing 'ingredients' list"))?;
            let mut slots = Vec::with_capacity(list.len());
            for entry in list {
                slots.push(Ingredient::of(parse_values(entry, version)?));
            }
            Ok(slots)
        }
        RecipeKind::Shaped => {
            if !obj.contains_key("pattern") {
                return Err(malformed("shaped recipe missing 'pattern'"));
            }
            let key_map = obj
                .get("key")
                .and_then(Value::as_object)
                .ok_or_else(|| malformed("shaped recipe missing 'key' map"))?;
            // serde_json objects iterate in sorted key order, which gives
            // shaped slots a stable, deterministic ordering.
            let mut slots = Vec::with_capacity(key_map.len());
            for (key, entry) in key_map {
                let mut chars = key.chars();
                let (Some(c), None) = (chars.next(), chars.next()) else {
                    return Err(malformed(format!("pattern key '{key}' is not one character")));
                };
                let mut slot = Ingredient::of(parse_values(entry, version)?);
                slot.key = Some(c);
                slots.push(slot);
            }
            Ok(slots)
        }
        _ => {
            let entry = obj
                .get("ingredient")
                .ok_or_else(|| malformed("recipe missing 'ingredient'"))?;
            Ok(vec![Ingredient::of(parse_values(entry, version)?)])
        }
    }
}

fn emit_values(values: &[IngredientValue], version: VersionTag) -> Vec<Value> {
    values
        .iter()
        .map(|v| match version {
            VersionTag::V1_20_1 | VersionTag::V1_21_1 => {
                let (field, id) = match v {
                    IngredientValue::Item(id) => ("item", id),
                    IngredientValue::Tag(id) => ("tag", id),
                };
                let mut m = Map::new();
                m.insert(field.to_string(), Value::String(id.to_string()));
                Value::Object(m)
            }
            VersionTag::V1_21_4 => match v {
                IngredientValue::Item(id) => Value::String(id.to_string()),
                IngredientValue::Tag(id) => Value::String(format!("#{id}")),
            },
        })
        .collect()
}

fn emit_ingredient(slot: &Ingredient, version: VersionTag) -> Value {
    let mut emitted = emit_values(&slot.values, version);
    if emitted.len() == 1 {
        emitted.swap_remove(0)
    } else {
        Value::Array(emitted)
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

fn parse_count(value: Option<&Value>) -> Result<u32, AdapterError> {
    match value {
        None => Ok(1),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| malformed("result count is not a valid integer")),
    }
}

fn parse_output(
    kind: RecipeKind,
    obj: &Map<String, Value>,
    version: VersionTag,
) -> Result<RecipeOutput, AdapterError> {
    let result = obj
        .get("result")
        .ok_or_else(|| malformed("recipe missing 'result'"))?;

    match version {
        VersionTag::V1_20_1 => match result {
            // Furnace-family and stonecutting results are bare item
            // strings; stonecutting keeps its count at the top level.
            Value::String(s) => {
                let count = if kind == RecipeKind::Stonecutting {
                    parse_count(obj.get("count"))?
                } else {
                    1
                };
                Ok(RecipeOutput::new(parse_id(s)?, count))
            }
            Value::Object(result_obj) => {
                let item = result_obj
                    .get("item")
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed("result missing 'item'"))?;
                Ok(RecipeOutput {
                    item: parse_id(item)?,
                    count: parse_count(result_obj.get("count"))?,
                    data: result_obj.get("nbt").cloned(),
                })
            }
            _ => Err(malformed("result must be a string or object")),
        },
        VersionTag::V1_21_1 | VersionTag::V1_21_4 => {
            let result_obj = result
                .as_object()
                .ok_or_else(|| malformed("result must be an object"))?;
            let item = result_obj
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("result missing 'id'"))?;
            Ok(RecipeOutput {
                item: parse_id(item)?,
                count: parse_count(result_obj.get("count"))?,
                data: result_obj.get("components").cloned(),
            })
        }
    }
}

fn emit_output(
    kind: RecipeKind,
    output: &RecipeOutput,
    version: VersionTag,
    obj: &mut Map<String, Value>,
) -> Result<(), AdapterError> {
    match version {
        VersionTag::V1_20_1 => {
            if kind == RecipeKind::Stonecutting {
                if output.data.is_some() {
                    return Err(malformed(
                        "stonecutting results cannot carry data in 1.20.1",
                    ));
                }
                obj.insert("result".to_string(), Value::String(output.item.to_string()));
                obj.insert("count".to_string(), Value::from(output.count));
            } else if kind.is_cooking() && output.count == 1 && output.data.is_none() {
                obj.insert("result".to_string(), Value::String(output.item.to_string()));
            } else {
                let mut result = Map::new();
                result.insert("item".to_string(), Value::String(output.item.to_string()));
                if output.count != 1 {
                    result.insert("count".to_string(), Value::from(output.count));
                }
                if let Some(data) = &output.data {
                    result.insert("nbt".to_string(), data.clone());
                }
                obj.insert("result".to_string(), Value::Object(result));
            }
        }
        VersionTag::V1_21_1 | VersionTag::V1_21_4 => {
            let mut result = Map::new();
            result.insert("id".to_string(), Value::String(output.item.to_string()));
            if output.count != 1 {
                result.insert("count".to_string(), Value::from(output.count));
            }
            if let Some(data) = &output.data {
                result.insert("components".to_string(), data.clone());
            }
            obj.insert("result".to_string(), Value::Object(result));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Extension bag
// ---------------------------------------------------------------------------

fn consumed_keys(kind: RecipeKind, version: VersionTag) -> &'static [&'static str] {
    match kind {
        RecipeKind::Shapeless => &["type", "ingredients", "result"],
        // The shaped 'pattern' is opaque to the engine; it rides in the
        // extension bag untouched while slots are rebuilt from 'key'.
        RecipeKind::Shaped => &["type", "key", "result"],
        RecipeKind::Stonecutting if version == VersionTag::V1_20_1 => {
            &["type", "ingredient", "result", "count"]
        }
        _ => &["type", "ingredient", "result"],
    }
}

fn collect_extra(
    kind: RecipeKind,
    obj: &Map<String, Value>,
    version: VersionTag,
) -> BTreeMap<String, Value> {
    let consumed = consumed_keys(kind, version);
    obj.iter()
        .filter(|(k, _)| !consumed.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
