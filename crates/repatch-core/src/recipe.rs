//! The version-independent recipe data model.
//!
//! A [`RawRecipe`] is the opaque key-value tree captured from the host
//! registry, tagged with the game version it came from. The schema adapter
//! (see [`crate::adapter`]) turns it into an [`IntermediateRecipe`], the
//! normalized form that rules are matched and applied against. Fields the
//! engine does not interpret ride along in the `extra` bag so the mapping
//! back to a raw record is lossless.

use crate::id::ResourceId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Game version a raw recipe was captured under. Selects the schema adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionTag {
    V1_20_1,
    V1_21_1,
    V1_21_4,
}

impl VersionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionTag::V1_20_1 => "1.20.1",
            VersionTag::V1_21_1 => "1.21.1",
            VersionTag::V1_21_4 => "1.21.4",
        }
    }
}

/// A version-specific recipe record as captured from the host registry.
/// Immutable once captured; the engine never edits these in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecipe {
    pub version: VersionTag,
    pub payload: Value,
}

impl RawRecipe {
    pub fn new(version: VersionTag, payload: Value) -> Self {
        Self { version, payload }
    }
}

/// The recipe category tag of a normalized recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeKind {
    Shaped,
    Shapeless,
    Smelting,
    Blasting,
    Smoking,
    CampfireCooking,
    Stonecutting,
}

impl RecipeKind {
    /// The namespaced `type` tag this kind carries in recipe data files.
    pub fn type_id(&self) -> &'static str {
        match self {
            RecipeKind::Shaped => "minecraft:crafting_shaped",
            RecipeKind::Shapeless => "minecraft:crafting_shapeless",
            RecipeKind::Smelting => "minecraft:smelting",
            RecipeKind::Blasting => "minecraft:blasting",
            RecipeKind::Smoking => "minecraft:smoking",
            RecipeKind::CampfireCooking => "minecraft:campfire_cooking",
            RecipeKind::Stonecutting => "minecraft:stonecutting",
        }
    }

    /// Reverse lookup from a `type` tag. `None` means the type has no known
    /// mapping and the recipe passes through unmodified.
    pub fn from_type_id(type_id: &str) -> Option<Self> {
        match type_id {
            "minecraft:crafting_shaped" => Some(RecipeKind::Shaped),
            "minecraft:crafting_shapeless" => Some(RecipeKind::Shapeless),
            "minecraft:smelting" => Some(RecipeKind::Smelting),
            "minecraft:blasting" => Some(RecipeKind::Blasting),
            "minecraft:smoking" => Some(RecipeKind::Smoking),
            "minecraft:campfire_cooking" => Some(RecipeKind::CampfireCooking),
            "minecraft:stonecutting" => Some(RecipeKind::Stonecutting),
            _ => None,
        }
    }

    /// Whether the slot count is fixed by the recipe shape. Only shapeless
    /// recipes accept slot additions/removals; shaped patterns and
    /// single-input recipes (cooking, stonecutting) do not.
    pub fn fixed_slots(&self) -> bool {
        !matches!(self, RecipeKind::Shapeless)
    }

    /// Whether this is one of the furnace-family kinds whose result is a
    /// bare item string in the 1.20.1 data format.
    pub fn is_cooking(&self) -> bool {
        matches!(
            self,
            RecipeKind::Smelting
                | RecipeKind::Blasting
                | RecipeKind::Smoking
                | RecipeKind::CampfireCooking
        )
    }
}

/// A single alternative inside an ingredient slot: a concrete item, or an
/// item tag the host expands at craft time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientValue {
    Item(ResourceId),
    Tag(ResourceId),
}

/// One ingredient slot: an ordered set of acceptable values. Shaped recipes
/// additionally bind each slot to its pattern key character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub values: Vec<IngredientValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<char>,
}

impl Ingredient {
    pub fn item(id: ResourceId) -> Self {
        Self {
            values: vec![IngredientValue::Item(id)],
            key: None,
        }
    }

    pub fn tag(id: ResourceId) -> Self {
        Self {
            values: vec![IngredientValue::Tag(id)],
            key: None,
        }
    }

    pub fn of(values: Vec<IngredientValue>) -> Self {
        Self { values, key: None }
    }

    /// Whether any value of this slot is exactly the given item.
    pub fn contains_item(&self, id: &ResourceId) -> bool {
        self.values
            .iter()
            .any(|v| matches!(v, IngredientValue::Item(i) if i == id))
    }

    /// Whether any value of this slot references the given item tag.
    pub fn references_tag(&self, id: &ResourceId) -> bool {
        self.values
            .iter()
            .any(|v| matches!(v, IngredientValue::Tag(t) if t == id))
    }
}

/// The output descriptor of a normalized recipe. `data` carries the result
/// item's component/NBT payload opaquely, when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeOutput {
    pub item: ResourceId,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RecipeOutput {
    pub fn new(item: ResourceId, count: u32) -> Self {
        Self {
            item,
            count,
            data: None,
        }
    }
}

/// The normalized, version-independent recipe record that rules match and
/// edit. `extra` holds every raw field the engine does not interpret, in
/// deterministic key order, so denormalization can reproduce the original
/// record exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateRecipe {
    pub kind: RecipeKind,
    pub ingredients: Vec<Ingredient>,
    pub output: RecipeOutput,
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}
