//! Serde structs for rule files.
//!
//! These define the on-disk rule format. A rule file holds a list of
//! rules, each with a target predicate and an edit list; files are
//! deserialized from RON, JSON, or TOML and then resolved into
//! `repatch-core` types by the loader. The older key names
//! `target_recipes` and `modifiers` are accepted as aliases.

use serde::Deserialize;
use serde_json::Value;

// ===========================================================================
// Rules
// ===========================================================================

/// One rule as written in a data file. `id` may be omitted; the loader
/// derives one from the file name and the rule's position.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(alias = "target_recipes")]
    pub matches: PredicateData,
    #[serde(alias = "modifiers")]
    pub edits: Vec<EditData>,
}

fn default_true() -> bool {
    true
}

/// Wrapper for TOML rule files, which need a top-level table:
/// rules go under `[[rules]]`.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlRules {
    pub rules: Vec<RuleData>,
}

// ===========================================================================
// Predicates
// ===========================================================================

/// A target predicate: either the shorthand bare string (an exact recipe
/// id) or a typed condition object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PredicateData {
    Id(String),
    Typed(TypedPredicate),
}

/// A typed condition, tagged with a `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedPredicate {
    AlwaysApply,
    IdEquals { id: String },
    NamespaceEquals { namespace: String },
    ResultItemIs { item: String },
    RecipeTypeIs { recipe_type: String },
    /// Item id, or a tag with the leading `#`.
    AcceptsIngredient { ingredient: String },
    UsesTag { tag: String },
    AllOf { conditions: Vec<PredicateData> },
    AnyOf { conditions: Vec<PredicateData> },
    Not { condition: Box<PredicateData> },
}

// ===========================================================================
// Ingredient slot selectors
// ===========================================================================

/// Which slots an edit touches. The string shorthand covers the common
/// cases: `"#ns:tag"` selects tag slots, a trailing `!` demands the slot's
/// sole value equal the item, a plain id selects slots containing it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SelectorData {
    Shorthand(String),
    Typed(TypedSelector),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedSelector {
    All,
    FromOrdinals { ordinals: Vec<usize> },
    MatchItem { item: String },
    MatchItemExact { item: String },
    MatchTag { tag: String },
}

/// A new ingredient slot: one value, or a list of alternatives. Each
/// value is an item id or a `#`-prefixed tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientData {
    One(String),
    Many(Vec<String>),
}

// ===========================================================================
// Edits
// ===========================================================================

/// One edit in a rule's pipeline, tagged with a `type` field. Order in the
/// file is application order.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditData {
    AddIngredient {
        ingredient: IngredientData,
    },
    RemoveIngredient {
        selector: SelectorData,
    },
    ReplaceIngredient {
        selector: SelectorData,
        with: IngredientData,
    },
    AddAlternative {
        selector: SelectorData,
        value: String,
    },
    ReplaceResult {
        item: String,
        #[serde(default = "default_count")]
        count: u32,
        #[serde(default)]
        components: Option<Value>,
    },
    SetResultCount {
        count: u32,
    },
    DeleteRecipe,
    SetField {
        key: String,
        value: Value,
    },
}

fn default_count() -> u32 {
    1
}

// ===========================================================================
// Tests
// ===========================================================================
