//! Rule resolution: which rules apply to a recipe, and in what order.
//!
//! Ordering is ascending priority with declaration order as the stable
//! tie-break. Matching is recomputed fresh for every engine run; recipe
//! sets are rebuilt wholesale at each registry load, so there is nothing
//! to cache across runs.

use crate::id::RecipeId;
use crate::recipe::IntermediateRecipe;
use crate::rule::{ModificationRule, RuleSet};

/// All rules of the set in evaluation order: ascending priority, ties
/// broken by declaration order.
pub fn sorted_rules(rules: &RuleSet) -> Vec<&ModificationRule> {
    let mut ordered: Vec<&ModificationRule> = rules.rules().iter().collect();
    // Stable sort keeps declaration order within a priority.
    ordered.sort_by_key(|r| r.priority);
    ordered
}

/// Resolve the applicable rules for one recipe, in evaluation order.
/// Disabled rules never match. Pure: neither the recipe nor the rule set
/// is touched.
pub fn match_rules<'a>(
    id: &RecipeId,
    recipe: &IntermediateRecipe,
    rules: &'a RuleSet,
) -> Vec<&'a ModificationRule> {
    sorted_rules(rules)
        .into_iter()
        .filter(|r| r.enabled && r.predicate.matches(id, recipe))
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
