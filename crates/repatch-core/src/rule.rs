//! Modification rules: match predicates, edit operations, and rule sets.
//!
//! A [`ModificationRule`] pairs a composable [`Predicate`] with an ordered
//! list of [`EditOp`]s. Rules are collected into an immutable [`RuleSet`]
//! through a validating builder (unique ids), then never change for the
//! lifetime of an engine run.

use crate::id::{RecipeId, ResourceId};
use crate::recipe::{Ingredient, IngredientValue, IntermediateRecipe, RecipeKind, RecipeOutput};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// A composable boolean expression over normalized recipe fields.
/// Evaluation is pure and total: predicates over absent fields are false,
/// never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Always,
    /// Recipe type equality.
    KindIs(RecipeKind),
    /// The recipe id itself.
    IdIs(RecipeId),
    /// The namespace of the recipe id.
    NamespaceIs(String),
    /// Output item identifier equality.
    OutputIs(ResourceId),
    /// Some ingredient slot lists this item as a value.
    HasIngredientItem(ResourceId),
    /// Some ingredient slot references this item tag.
    HasIngredientTag(ResourceId),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Evaluate against a recipe. `id` is the registry id the recipe is
    /// stored under.
    pub fn matches(&self, id: &RecipeId, recipe: &IntermediateRecipe) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::KindIs(kind) => recipe.kind == *kind,
            Predicate::IdIs(wanted) => id == wanted,
            Predicate::NamespaceIs(ns) => id.namespace() == ns,
            Predicate::OutputIs(item) => recipe.output.item == *item,
            Predicate::HasIngredientItem(item) => {
                recipe.ingredients.iter().any(|slot| slot.contains_item(item))
            }
            Predicate::HasIngredientTag(tag) => {
                recipe.ingredients.iter().any(|slot| slot.references_tag(tag))
            }
            Predicate::All(preds) => preds.iter().all(|p| p.matches(id, recipe)),
            Predicate::Any(preds) => preds.iter().any(|p| p.matches(id, recipe)),
            Predicate::Not(pred) => !pred.matches(id, recipe),
        }
    }
}

// ---------------------------------------------------------------------------
// Ingredient selectors
// ---------------------------------------------------------------------------

/// Selects ingredient slots of a recipe for an edit to act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientSelector {
    /// Every slot.
    All,
    /// The slot at the given position, if it exists.
    AtIndex(usize),
    /// Slots that list the item among their values.
    ContainingItem(ResourceId),
    /// Slots whose sole value is exactly the item.
    MatchingItem(ResourceId),
    /// Slots that reference the item tag.
    MatchingTag(ResourceId),
}

impl IngredientSelector {
    /// Indices of the slots this selector picks, in slot order.
    pub fn select(&self, recipe: &IntermediateRecipe) -> Vec<usize> {
        let slots = &recipe.ingredients;
        match self {
            IngredientSelector::All => (0..slots.len()).collect(),
            IngredientSelector::AtIndex(i) => {
                if *i < slots.len() {
                    vec![*i]
                } else {
                    vec![]
                }
            }
            IngredientSelector::ContainingItem(item) => selected(slots, |s| s.contains_item(item)),
            IngredientSelector::MatchingItem(item) => selected(slots, |s| {
                matches!(s.values.as_slice(), [IngredientValue::Item(i)] if i == item)
            }),
            IngredientSelector::MatchingTag(tag) => selected(slots, |s| s.references_tag(tag)),
        }
    }
}

fn selected(slots: &[Ingredient], pred: impl Fn(&Ingredient) -> bool) -> Vec<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, s)| pred(s))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Edit operations
// ---------------------------------------------------------------------------

/// One edit in a rule's transform pipeline. Edits apply sequentially, each
/// to the output of the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOp {
    /// Append a new ingredient slot. Shapeless recipes only.
    AddIngredient(Ingredient),
    /// Drop the selected slots. Shapeless recipes only.
    RemoveIngredient(IngredientSelector),
    /// Swap the values of the selected slots (pattern keys are kept).
    ReplaceIngredient {
        selector: IngredientSelector,
        with: Ingredient,
    },
    /// Add an alternative value to the selected slots.
    AddAlternative {
        selector: IngredientSelector,
        value: IngredientValue,
    },
    /// Replace the whole output descriptor.
    ReplaceOutput(RecipeOutput),
    /// Set the output count, clamped to the host's configured bounds.
    SetCount(u32),
    /// Remove the recipe from the registry.
    DeleteRecipe,
    /// Write a field into the recipe's extension bag.
    SetExtensionField { key: String, value: Value },
}

impl EditOp {
    /// Whether two rules issuing this edit on the same recipe at the same
    /// priority are in structural conflict.
    pub fn is_exclusive(&self) -> bool {
        matches!(self, EditOp::ReplaceOutput(_) | EditOp::DeleteRecipe)
    }
}

// ---------------------------------------------------------------------------
// Rules and rule sets
// ---------------------------------------------------------------------------

/// A single modification rule. Lower priority runs first; rules at equal
/// priority run in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationRule {
    pub id: String,
    pub priority: i32,
    pub predicate: Predicate,
    pub transform: Vec<EditOp>,
    pub enabled: bool,
}

impl ModificationRule {
    pub fn new(id: &str, priority: i32, predicate: Predicate, transform: Vec<EditOp>) -> Self {
        Self {
            id: id.to_string(),
            priority,
            predicate,
            transform,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleSetError {
    #[error("duplicate rule id: '{0}'")]
    DuplicateId(String),
}

/// Builder for an immutable [`RuleSet`]. Declaration order is preserved and
/// is the tie-break for rules at equal priority.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: Vec<ModificationRule>,
    ids: HashSet<String>,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Rejects ids already present in the set.
    pub fn push(&mut self, rule: ModificationRule) -> Result<(), RuleSetError> {
        if !self.ids.insert(rule.id.clone()) {
            return Err(RuleSetError::DuplicateId(rule.id));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Freeze the set. No rule changes are possible afterwards.
    pub fn build(self) -> RuleSet {
        RuleSet { rules: self.rules }
    }
}

/// An immutable, ordered collection of rules. Frozen after build;
/// thread-safe to share across worker threads.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ModificationRule>,
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[ModificationRule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&ModificationRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
