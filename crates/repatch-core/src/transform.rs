//! Edit application: runs matched rules' transforms over a recipe.
//!
//! Edits apply as a pipeline in rule evaluation order; each rule's
//! predicate is re-checked against the current record before its edits
//! run, so a higher-priority rule's output is visible to every later
//! rule's predicate. Per-edit failures (incompatible shape, out-of-range
//! counts) are recorded and skipped, never fatal; `delete-recipe`
//! short-circuits all later stages except the same-priority conflict
//! override described below.
//!
//! Conflict policy: when two rules at the *same* priority both land a
//! structurally exclusive edit (`replace-output` or `delete-recipe`) on
//! one recipe, the later-declared rule wins and a conflict diagnostic is
//! recorded. Rules at different priorities never conflict; the earlier
//! stage's output simply feeds the next.

use crate::diagnostics::Diagnostic;
use crate::id::RecipeId;
use crate::recipe::IntermediateRecipe;
use crate::rule::{EditOp, ModificationRule};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Valid output-count range, supplied by the host configuration. The engine
/// treats this as an opaque bound, not a game constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountBounds {
    pub min: u32,
    pub max: u32,
}

impl CountBounds {
    pub fn clamp(&self, count: u32) -> u32 {
        count.clamp(self.min, self.max)
    }
}

impl Default for CountBounds {
    /// The vanilla stack-size range. Hosts with different limits override
    /// this through the coordinator configuration.
    fn default() -> Self {
        Self { min: 1, max: 64 }
    }
}

/// Per-edit failure. Always recovered locally: the offending edit is
/// skipped with a diagnostic and the rest of the pipeline continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("edit incompatible with recipe shape: {0}")]
    IncompatibleEdit(String),
    #[error("count {0} is out of range")]
    ValueOutOfRange(u32),
}

fn transform_failure(recipe: &RecipeId, rule: &str, err: TransformError) -> Diagnostic {
    match err {
        TransformError::IncompatibleEdit(detail) => Diagnostic::IncompatibleEdit {
            recipe: recipe.clone(),
            rule: rule.to_string(),
            detail,
        },
        TransformError::ValueOutOfRange(requested) => Diagnostic::ValueOutOfRange {
            recipe: recipe.clone(),
            rule: rule.to_string(),
            requested,
        },
    }
}

/// The per-recipe outcome of the transform stage.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchResult {
    Unchanged,
    Modified {
        recipe: IntermediateRecipe,
        applied: Vec<String>,
    },
    Deleted {
        rule: String,
    },
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Run the rule pipeline over one recipe. `ordered` is the full rule list
/// in evaluation order (see [`crate::matcher::sorted_rules`]); predicates
/// are evaluated here against the evolving record. Diagnostics are
/// appended to `diagnostics` in occurrence order.
pub fn apply(
    id: &RecipeId,
    recipe: &IntermediateRecipe,
    ordered: &[&ModificationRule],
    bounds: CountBounds,
    diagnostics: &mut Vec<Diagnostic>,
) -> PatchResult {
    let mut current = recipe.clone();
    let mut applied: Vec<String> = Vec::new();
    // Set once a delete edit has taken effect: the deleting rule's
    // priority and id, plus the record state at that moment (so a
    // same-priority override resumes from it).
    let mut deleted: Option<(i32, String, IntermediateRecipe)> = None;
    // Last exclusive edit that took effect: (priority, rule id).
    let mut last_exclusive: Option<(i32, String)> = None;

    'rules: for rule in ordered {
        if !rule.enabled {
            continue;
        }

        match &deleted {
            Some((del_priority, _, at_deletion)) => {
                // A deletion short-circuits every later stage except
                // exclusive edits declared at the same priority.
                if rule.priority != *del_priority {
                    break;
                }
                if !rule.transform.iter().any(EditOp::is_exclusive) {
                    continue;
                }
                if !rule.predicate.matches(id, at_deletion) {
                    continue;
                }
            }
            None => {
                if !rule.predicate.matches(id, &current) {
                    continue;
                }
            }
        }

        if let Some((_, loser, at_deletion)) = deleted.take() {
            // Later-declared exclusive edit overrides the delete.
            diagnostics.push(Diagnostic::Conflict {
                recipe: id.clone(),
                winner: rule.id.clone(),
                loser,
            });
            current = at_deletion;
            last_exclusive = None;
        }

        let before = current.clone();
        for edit in &rule.transform {
            match edit {
                EditOp::DeleteRecipe => {
                    note_exclusive(&mut last_exclusive, rule, id, diagnostics);
                    deleted = Some((rule.priority, rule.id.clone(), current.clone()));
                    applied.push(rule.id.clone());
                    continue 'rules;
                }
                EditOp::AddIngredient(slot) => {
                    if current.kind.fixed_slots() {
                        diagnostics.push(transform_failure(
                            id,
                            &rule.id,
                            TransformError::IncompatibleEdit(format!(
                                "cannot add a slot to a {:?} recipe",
                                current.kind
                            )),
                        ));
                    } else {
                        let mut slot = slot.clone();
                        slot.key = None;
                        current.ingredients.push(slot);
                    }
                }
                EditOp::RemoveIngredient(selector) => {
                    if current.kind.fixed_slots() {
                        diagnostics.push(transform_failure(
                            id,
                            &rule.id,
                            TransformError::IncompatibleEdit(format!(
                                "cannot remove a slot from a {:?} recipe",
                                current.kind
                            )),
                        ));
                    } else {
                        for index in selector.select(&current).into_iter().rev() {
                            current.ingredients.remove(index);
                        }
                    }
                }
                EditOp::ReplaceIngredient { selector, with } => {
                    for index in selector.select(&current) {
                        current.ingredients[index].values = with.values.clone();
                    }
                }
                EditOp::AddAlternative { selector, value } => {
                    for index in selector.select(&current) {
                        let slot = &mut current.ingredients[index];
                        if !slot.values.contains(value) {
                            slot.values.push(value.clone());
                        }
                    }
                }
                EditOp::ReplaceOutput(output) => {
                    if output.count == 0 {
                        diagnostics.push(transform_failure(
                            id,
                            &rule.id,
                            TransformError::ValueOutOfRange(0),
                        ));
                        continue;
                    }
                    note_exclusive(&mut last_exclusive, rule, id, diagnostics);
                    let mut output = output.clone();
                    let clamped = bounds.clamp(output.count);
                    if clamped != output.count {
                        diagnostics.push(Diagnostic::CountClamped {
                            recipe: id.clone(),
                            rule: rule.id.clone(),
                            requested: output.count,
                            clamped,
                        });
                        output.count = clamped;
                    }
                    current.output = output;
                }
                EditOp::SetCount(count) => {
                    if *count == 0 {
                        diagnostics.push(transform_failure(
                            id,
                            &rule.id,
                            TransformError::ValueOutOfRange(0),
                        ));
                        continue;
                    }
                    let clamped = bounds.clamp(*count);
                    if clamped != *count {
                        diagnostics.push(Diagnostic::CountClamped {
                            recipe: id.clone(),
                            rule: rule.id.clone(),
                            requested: *count,
                            clamped,
                        });
                    }
                    current.output.count = clamped;
                }
                EditOp::SetExtensionField { key, value } => {
                    current.extra.insert(key.clone(), value.clone());
                }
            }
        }
        if current != before {
            applied.push(rule.id.clone());
        }
    }

    if let Some((_, rule, _)) = deleted {
        return PatchResult::Deleted { rule };
    }
    if current != *recipe {
        PatchResult::Modified {
            recipe: current,
            applied,
        }
    } else {
        PatchResult::Unchanged
    }
}

/// Record an exclusive edit taking effect; emits a conflict diagnostic when
/// it overrides another rule's exclusive edit at the same priority.
fn note_exclusive(
    last: &mut Option<(i32, String)>,
    rule: &ModificationRule,
    id: &RecipeId,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some((priority, prev)) = last {
        if *priority == rule.priority && prev.as_str() != rule.id {
            diagnostics.push(Diagnostic::Conflict {
                recipe: id.clone(),
                winner: rule.id.clone(),
                loser: prev.clone(),
            });
        }
    }
    *last = Some((rule.priority, rule.id.clone()));
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{Ingredient, IngredientValue, RecipeOutput};
    use crate::rule::{IngredientSelector, ModificationRule, Predicate};
    use crate::test_utils::*;

    fn apply_rules(
        recipe: &IntermediateRecipe,
        rules: &[ModificationRule],
    ) -> (PatchResult, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let ordered: Vec<&ModificationRule> = {
            let mut v: Vec<&ModificationRule> = rules.iter().collect();
            v.sort_by_key(|r| r.priority);
            v
        };
        let result = apply(
            &rid("test:recipe"),
            recipe,
            &ordered,
            CountBounds::default(),
            &mut diagnostics,
        );
        (result, diagnostics)
    }

    #[test]
    fn no_matching_rules_is_unchanged() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [ModificationRule::new(
            "gold_only",
            0,
            Predicate::OutputIs(rid("minecraft:gold_ingot")),
            vec![EditOp::SetCount(5)],
        )];
        let (result, diags) = apply_rules(&recipe, &rules);
        assert_eq!(result, PatchResult::Unchanged);
        assert!(diags.is_empty());
    }

    #[test]
    fn replace_output_applies() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [ModificationRule::new(
            "refine",
            0,
            Predicate::OutputIs(rid("minecraft:iron_ingot")),
            vec![EditOp::ReplaceOutput(RecipeOutput::new(
                rid("modid:refined_iron"),
                1,
            ))],
        )];
        let (result, diags) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, applied } = result else {
            panic!("expected Modified");
        };
        assert_eq!(recipe.output.item, rid("modid:refined_iron"));
        assert_eq!(applied, vec!["refine"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn earlier_stage_output_visible_to_later_predicate() {
        // Priority 0 replaces the output; priority 10 matches on the NEW
        // output and must fire.
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [
            ModificationRule::new(
                "refine",
                0,
                Predicate::OutputIs(rid("minecraft:iron_ingot")),
                vec![EditOp::ReplaceOutput(RecipeOutput::new(
                    rid("modid:refined_iron"),
                    1,
                ))],
            ),
            ModificationRule::new(
                "double_refined",
                10,
                Predicate::OutputIs(rid("modid:refined_iron")),
                vec![EditOp::SetCount(2)],
            ),
        ];
        let (result, diags) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, applied } = result else {
            panic!("expected Modified");
        };
        assert_eq!(recipe.output.item, rid("modid:refined_iron"));
        assert_eq!(recipe.output.count, 2);
        assert_eq!(applied, vec!["refine", "double_refined"]);
        // Different priorities: no conflict.
        assert!(diags.is_empty());
    }

    #[test]
    fn delete_short_circuits_later_stages() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [
            ModificationRule::new("remove", 0, Predicate::Always, vec![EditOp::DeleteRecipe]),
            ModificationRule::new("never_runs", 10, Predicate::Always, vec![EditOp::SetCount(9)]),
        ];
        let (result, diags) = apply_rules(&recipe, &rules);
        assert_eq!(
            result,
            PatchResult::Deleted {
                rule: "remove".to_string()
            }
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn delete_short_circuits_remaining_edits_of_same_rule() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [ModificationRule::new(
            "remove",
            0,
            Predicate::Always,
            vec![EditOp::DeleteRecipe, EditOp::SetCount(9)],
        )];
        let (result, _) = apply_rules(&recipe, &rules);
        assert!(matches!(result, PatchResult::Deleted { .. }));
    }

    #[test]
    fn same_priority_replace_output_conflict_later_wins() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [
            ModificationRule::new(
                "first",
                0,
                Predicate::Always,
                vec![EditOp::ReplaceOutput(RecipeOutput::new(rid("moda:x"), 1))],
            ),
            ModificationRule::new(
                "second",
                0,
                Predicate::Always,
                vec![EditOp::ReplaceOutput(RecipeOutput::new(rid("modb:y"), 1))],
            ),
        ];
        let (result, diags) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, .. } = result else {
            panic!("expected Modified");
        };
        assert_eq!(recipe.output.item, rid("modb:y"));
        assert_eq!(
            diags,
            vec![Diagnostic::Conflict {
                recipe: rid("test:recipe"),
                winner: "second".to_string(),
                loser: "first".to_string(),
            }]
        );
    }

    #[test]
    fn same_priority_replace_then_delete_conflict() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [
            ModificationRule::new(
                "replace",
                0,
                Predicate::Always,
                vec![EditOp::ReplaceOutput(RecipeOutput::new(rid("moda:x"), 1))],
            ),
            ModificationRule::new("delete", 0, Predicate::Always, vec![EditOp::DeleteRecipe]),
        ];
        let (result, diags) = apply_rules(&recipe, &rules);
        assert_eq!(
            result,
            PatchResult::Deleted {
                rule: "delete".to_string()
            }
        );
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            &diags[0],
            Diagnostic::Conflict { winner, loser, .. }
                if winner == "delete" && loser == "replace"
        ));
    }

    #[test]
    fn same_priority_delete_then_replace_conflict_undeletes() {
        // The later-declared rule wins even over a delete.
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [
            ModificationRule::new("delete", 0, Predicate::Always, vec![EditOp::DeleteRecipe]),
            ModificationRule::new(
                "replace",
                0,
                Predicate::Always,
                vec![EditOp::ReplaceOutput(RecipeOutput::new(rid("moda:x"), 1))],
            ),
        ];
        let (result, diags) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, .. } = result else {
            panic!("expected Modified, recipe should survive");
        };
        assert_eq!(recipe.output.item, rid("moda:x"));
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            &diags[0],
            Diagnostic::Conflict { winner, loser, .. }
                if winner == "replace" && loser == "delete"
        ));
    }

    #[test]
    fn different_priority_exclusive_edits_never_conflict() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [
            ModificationRule::new(
                "early",
                0,
                Predicate::Always,
                vec![EditOp::ReplaceOutput(RecipeOutput::new(rid("moda:x"), 1))],
            ),
            ModificationRule::new(
                "late",
                5,
                Predicate::Always,
                vec![EditOp::ReplaceOutput(RecipeOutput::new(rid("modb:y"), 1))],
            ),
        ];
        let (result, diags) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, .. } = result else {
            panic!("expected Modified");
        };
        assert_eq!(recipe.output.item, rid("modb:y"));
        assert!(diags.is_empty());
    }

    #[test]
    fn add_ingredient_incompatible_with_smelting() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [ModificationRule::new(
            "extend",
            0,
            Predicate::Always,
            vec![
                EditOp::AddIngredient(Ingredient::item(rid("minecraft:coal"))),
                // Pipeline continues after the skipped edit.
                EditOp::SetCount(2),
            ],
        )];
        let (result, diags) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, .. } = result else {
            panic!("expected Modified");
        };
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.output.count, 2);
        assert_eq!(diags.len(), 1);
        assert!(matches!(&diags[0], Diagnostic::IncompatibleEdit { .. }));
    }

    #[test]
    fn add_and_remove_on_shapeless() {
        let recipe = shapeless_recipe(
            &["minecraft:gunpowder", "minecraft:sand"],
            "minecraft:tnt",
            1,
        );
        let rules = [ModificationRule::new(
            "rework",
            0,
            Predicate::Always,
            vec![
                EditOp::RemoveIngredient(IngredientSelector::ContainingItem(rid(
                    "minecraft:sand",
                ))),
                EditOp::AddIngredient(Ingredient::item(rid("minecraft:red_sand"))),
            ],
        )];
        let (result, diags) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, .. } = result else {
            panic!("expected Modified");
        };
        assert_eq!(recipe.ingredients.len(), 2);
        assert!(recipe.ingredients[1].contains_item(&rid("minecraft:red_sand")));
        assert!(diags.is_empty());
    }

    #[test]
    fn replace_ingredient_keeps_pattern_key() {
        let mut recipe = shapeless_recipe(&["minecraft:stick"], "minecraft:ladder", 1);
        recipe.kind = crate::recipe::RecipeKind::Shaped;
        recipe.ingredients[0].key = Some('|');
        let rules = [ModificationRule::new(
            "swap",
            0,
            Predicate::Always,
            vec![EditOp::ReplaceIngredient {
                selector: IngredientSelector::All,
                with: Ingredient::item(rid("minecraft:bamboo")),
            }],
        )];
        let (result, _) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, .. } = result else {
            panic!("expected Modified");
        };
        assert!(recipe.ingredients[0].contains_item(&rid("minecraft:bamboo")));
        assert_eq!(recipe.ingredients[0].key, Some('|'));
    }

    #[test]
    fn add_alternative_deduplicates() {
        let recipe = shapeless_recipe(&["minecraft:stick"], "minecraft:ladder", 1);
        let alt = IngredientValue::Item(rid("minecraft:bamboo"));
        let rules = [ModificationRule::new(
            "alt",
            0,
            Predicate::Always,
            vec![
                EditOp::AddAlternative {
                    selector: IngredientSelector::All,
                    value: alt.clone(),
                },
                EditOp::AddAlternative {
                    selector: IngredientSelector::All,
                    value: alt,
                },
            ],
        )];
        let (result, _) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, .. } = result else {
            panic!("expected Modified");
        };
        assert_eq!(recipe.ingredients[0].values.len(), 2);
    }

    #[test]
    fn set_count_clamps_with_diagnostic() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [ModificationRule::new(
            "greedy",
            0,
            Predicate::Always,
            vec![EditOp::SetCount(999)],
        )];
        let (result, diags) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, .. } = result else {
            panic!("expected Modified");
        };
        assert_eq!(recipe.output.count, 64);
        assert_eq!(
            diags,
            vec![Diagnostic::CountClamped {
                recipe: rid("test:recipe"),
                rule: "greedy".to_string(),
                requested: 999,
                clamped: 64,
            }]
        );
    }

    #[test]
    fn set_count_zero_is_out_of_range() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [ModificationRule::new(
            "zero",
            0,
            Predicate::Always,
            vec![EditOp::SetCount(0)],
        )];
        let (result, diags) = apply_rules(&recipe, &rules);
        assert_eq!(result, PatchResult::Unchanged);
        assert!(matches!(&diags[0], Diagnostic::ValueOutOfRange { requested: 0, .. }));
    }

    #[test]
    fn set_extension_field() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [ModificationRule::new(
            "note",
            0,
            Predicate::Always,
            vec![EditOp::SetExtensionField {
                key: "category".to_string(),
                value: serde_json::json!("misc"),
            }],
        )];
        let (result, _) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, .. } = result else {
            panic!("expected Modified");
        };
        assert_eq!(recipe.extra.get("category"), Some(&serde_json::json!("misc")));
    }

    #[test]
    fn disabled_rule_is_skipped() {
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let mut rule =
            ModificationRule::new("off", 0, Predicate::Always, vec![EditOp::SetCount(9)]);
        rule.enabled = false;
        let (result, _) = apply_rules(&recipe, &[rule]);
        assert_eq!(result, PatchResult::Unchanged);
    }

    #[test]
    fn edits_pipeline_within_one_rule() {
        // set-count then replace-output: the replacement overrides the
        // count, because each edit operates on the previous edit's output.
        let recipe = smelting_recipe("minecraft:iron_ore", "minecraft:iron_ingot");
        let rules = [ModificationRule::new(
            "combo",
            0,
            Predicate::Always,
            vec![
                EditOp::SetCount(5),
                EditOp::ReplaceOutput(RecipeOutput::new(rid("moda:x"), 2)),
            ],
        )];
        let (result, _) = apply_rules(&recipe, &rules);
        let PatchResult::Modified { recipe, .. } = result else {
            panic!("expected Modified");
        };
        assert_eq!(recipe.output.item, rid("moda:x"));
        assert_eq!(recipe.output.count, 2);
    }
}
