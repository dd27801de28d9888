//! Structured diagnostics collected during a patch run.
//!
//! Every skipped recipe, resolved conflict, and clamped value is recorded
//! here and surfaced in the run's [`crate::coordinate::PatchReport`]. The
//! records serialize to JSON for operator inspection; how the embedding
//! application sinks them is its own concern.

use crate::id::RecipeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One diagnostic record. `recipe` is the id of the affected recipe; `rule`
/// names the rule whose edit triggered the record where one is involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The recipe could not be normalized and was excluded from the output
    /// snapshot.
    MalformedRecipe { recipe: RecipeId, detail: String },
    /// The recipe's type has no adapter mapping; it passed through
    /// unmodified.
    UnsupportedRecipeType { recipe: RecipeId, type_id: String },
    /// An edit was incompatible with the recipe's shape and was skipped.
    IncompatibleEdit {
        recipe: RecipeId,
        rule: String,
        detail: String,
    },
    /// A count edit requested a value outside any representable range and
    /// was skipped.
    ValueOutOfRange {
        recipe: RecipeId,
        rule: String,
        requested: u32,
    },
    /// A count edit was clamped to the host's configured bounds.
    CountClamped {
        recipe: RecipeId,
        rule: String,
        requested: u32,
        clamped: u32,
    },
    /// Two same-priority rules issued structurally exclusive edits on the
    /// recipe; the later-declared rule won.
    Conflict {
        recipe: RecipeId,
        winner: String,
        loser: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedRecipe { recipe, detail } => {
                write!(f, "excluded malformed recipe {recipe}: {detail}")
            }
            Diagnostic::UnsupportedRecipeType { recipe, type_id } => {
                write!(f, "passing through {recipe}: unsupported type {type_id}")
            }
            Diagnostic::IncompatibleEdit {
                recipe,
                rule,
                detail,
            } => {
                write!(f, "skipped edit from rule '{rule}' on {recipe}: {detail}")
            }
            Diagnostic::ValueOutOfRange {
                recipe,
                rule,
                requested,
            } => {
                write!(
                    f,
                    "skipped count {requested} from rule '{rule}' on {recipe}: out of range"
                )
            }
            Diagnostic::CountClamped {
                recipe,
                rule,
                requested,
                clamped,
            } => {
                write!(
                    f,
                    "clamped count {requested} -> {clamped} from rule '{rule}' on {recipe}"
                )
            }
            Diagnostic::Conflict {
                recipe,
                winner,
                loser,
            } => {
                write!(
                    f,
                    "conflict on {recipe}: rule '{winner}' overrides '{loser}'"
                )
            }
        }
    }
}
