//! Repatch Core -- a cross-version, cross-loader recipe patch engine.
//!
//! This crate provides the recipe data model, per-version schema adapters,
//! the rule model with matching and transformation, run diagnostics, and
//! the coordinator that drives a snapshot-to-commit patch run against a
//! loader's recipe registry.
//!
//! # Patch Run Pipeline
//!
//! Each call to [`coordinate::PatchCoordinator::run`] walks the registry
//! through the following stages:
//!
//! 1. **Loading** -- Snapshot every raw recipe from the [`host::RegistryHost`].
//! 2. **Normalizing** -- Lift each version-specific payload into the
//!    version-neutral [`recipe::IntermediateRecipe`].
//! 3. **Matching** -- Evaluate rule predicates, ascending priority with
//!    declaration order as the tie-break.
//! 4. **Transforming** -- Apply matched rules' edits as a pipeline, with
//!    conflict resolution and count clamping.
//! 5. **Serializing** -- Lower patched records back to their original
//!    version's wire form.
//! 6. **Commit** -- Hand the complete staged set to the host in one
//!    atomic call; any earlier failure leaves the registry untouched.
//!
//! # Key Types
//!
//! - [`coordinate::PatchCoordinator`] -- Run orchestrator: re-entrancy
//!   guard, cancellation, staging, atomic commit.
//! - [`rule::ModificationRule`] -- Priority, predicate, and edit pipeline;
//!   frozen into a [`rule::RuleSet`] before a run.
//! - [`rule::Predicate`] / [`rule::IngredientSelector`] -- What a rule
//!   matches and which slots an edit touches.
//! - [`adapter`] -- `normalize` / `denormalize` between raw payloads and
//!   the intermediate form, per [`recipe::VersionTag`].
//! - [`transform`] -- Edit application, [`transform::CountBounds`]
//!   clamping, and the per-recipe [`transform::PatchResult`].
//! - [`diagnostics::Diagnostic`] -- Serializable, non-fatal findings
//!   collected into the run's [`coordinate::PatchReport`].
//! - [`host::RegistryHost`] -- The loader shim trait: `snapshot` in,
//!   one `commit` out.

pub mod adapter;
pub mod coordinate;
pub mod diagnostics;
pub mod host;
pub mod id;
pub mod matcher;
pub mod recipe;
pub mod rule;
pub mod transform;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
