//! Shared fixtures for unit and integration tests. Compiled into the
//! crate's own tests and exported under the `test-utils` feature so
//! downstream crates can reuse the in-memory host and recipe builders.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::host::{CommitEntry, HostError, RegistryHost};
use crate::id::{RecipeId, ResourceId};
use crate::recipe::{
    Ingredient, IntermediateRecipe, RawRecipe, RecipeKind, RecipeOutput, VersionTag,
};

/// Parse an id literal. Panics on bad input, for fixtures only.
pub fn rid(s: &str) -> ResourceId {
    s.parse().unwrap()
}

/// A one-input smelting recipe with a count-1 output.
pub fn smelting_recipe(input: &str, output: &str) -> IntermediateRecipe {
    IntermediateRecipe {
        kind: RecipeKind::Smelting,
        ingredients: vec![Ingredient::item(rid(input))],
        output: RecipeOutput::new(rid(output), 1),
        extra: BTreeMap::new(),
    }
}

/// A shapeless crafting recipe with single-item slots.
pub fn shapeless_recipe(inputs: &[&str], output: &str, count: u32) -> IntermediateRecipe {
    IntermediateRecipe {
        kind: RecipeKind::Shapeless,
        ingredients: inputs.iter().map(|i| Ingredient::item(rid(i))).collect(),
        output: RecipeOutput::new(rid(output), count),
        extra: BTreeMap::new(),
    }
}

/// Wrap a raw 1.20.1 payload.
pub fn raw_recipe_1_20_1(payload: Value) -> RawRecipe {
    RawRecipe::new(VersionTag::V1_20_1, payload)
}

/// Iron ore smelting, 1.20.1 wire form (bare-string result).
pub fn smelting_raw_1_20_1() -> RawRecipe {
    raw_recipe_1_20_1(json!({
        "type": "minecraft:smelting",
        "ingredient": { "item": "minecraft:iron_ore" },
        "result": "minecraft:iron_ingot",
        "experience": 0.7,
        "cookingtime": 200
    }))
}

/// TNT crafting, 1.20.1 wire form.
pub fn shapeless_raw_1_20_1() -> RawRecipe {
    raw_recipe_1_20_1(json!({
        "type": "minecraft:crafting_shapeless",
        "ingredients": [
            { "item": "minecraft:gunpowder" },
            { "item": "minecraft:sand" }
        ],
        "result": { "item": "minecraft:tnt" }
    }))
}

/// In-memory [`RegistryHost`]: a sorted map standing in for a loader's
/// recipe registry, with injectable snapshot and commit failures.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    recipes: BTreeMap<RecipeId, RawRecipe>,
    pub fail_snapshot: bool,
    pub fail_commit: bool,
    /// Successful commit calls observed.
    pub commits: usize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: RecipeId, raw: RawRecipe) {
        self.recipes.insert(id, raw);
    }

    pub fn recipe(&self, id: &RecipeId) -> Option<&RawRecipe> {
        self.recipes.get(id)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl RegistryHost for MemoryHost {
    fn snapshot(&self) -> Result<Vec<(RecipeId, RawRecipe)>, HostError> {
        if self.fail_snapshot {
            return Err(HostError::new("snapshot unavailable"));
        }
        Ok(self
            .recipes
            .iter()
            .map(|(id, raw)| (id.clone(), raw.clone()))
            .collect())
    }

    fn commit(&mut self, entries: Vec<(RecipeId, CommitEntry)>) -> Result<(), HostError> {
        if self.fail_commit {
            return Err(HostError::new("commit rejected"));
        }
        for (id, entry) in entries {
            match entry {
                CommitEntry::Recipe(raw) => {
                    self.recipes.insert(id, raw);
                }
                CommitEntry::Tombstone => {
                    self.recipes.remove(&id);
                }
            }
        }
        self.commits += 1;
        Ok(())
    }
}
