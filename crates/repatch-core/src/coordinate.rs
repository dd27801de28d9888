//! Registry patch coordinator: drives one full patch run.
//!
//! A run walks a fixed stage sequence: `Loading` (host snapshot),
//! `Normalizing`/`Matching`/`Transforming` (fused per-recipe), then
//! `Serializing` and a single atomic `commit`. The staging set is built
//! completely in memory before the host sees anything, so a failure at
//! any point leaves the live registry untouched. Re-running while a run
//! is in flight fails fast with [`CoordinationError::AlreadyRunning`];
//! a [`CancelToken`] abandons the run at the next stage boundary.
//!
//! Per-recipe problems never abort the run: unsupported recipe types
//! pass through unmodified, malformed records are left as they were and
//! marked excluded, both with diagnostics in the final report. The one
//! fatal per-recipe condition is a patched record that no longer
//! serializes for its version, which aborts before commit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::adapter::{self, AdapterError};
use crate::diagnostics::Diagnostic;
use crate::host::{CommitEntry, HostError, RegistryHost};
use crate::id::RecipeId;
use crate::matcher;
use crate::recipe::{IntermediateRecipe, RawRecipe, VersionTag};
use crate::rule::{ModificationRule, RuleSet};
use crate::transform::{self, CountBounds, PatchResult};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// ---------------------------------------------------------------------------
// Run state and errors
// ---------------------------------------------------------------------------

/// Stage a patch run is in. Reported on completion and carried by
/// [`CoordinationError::Cancelled`] to say where the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Loading,
    Normalizing,
    Matching,
    Transforming,
    Serializing,
    Committed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Loading => "loading",
            RunState::Normalizing => "normalizing",
            RunState::Matching => "matching",
            RunState::Transforming => "transforming",
            RunState::Serializing => "serializing",
            RunState::Committed => "committed",
            RunState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-run failure. Any of these leaves the host registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinationError {
    #[error("recipe registry unavailable: {0}")]
    LoaderUnavailable(#[from] HostError),
    #[error("a patch run is already in progress")]
    AlreadyRunning,
    #[error("patch run cancelled during {0}")]
    Cancelled(RunState),
    #[error("patched recipe `{recipe}` no longer serializes: {detail}")]
    Serialize { recipe: RecipeId, detail: String },
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared cancellation flag for one coordinator. Cloning hands the flag
/// to another thread; cancelling takes effect at the next stage boundary
/// of the run in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What happened to one recipe during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Unchanged,
    Modified { applied: Vec<String> },
    Deleted { rule: String },
    /// Unparseable record, committed back as it was.
    Excluded,
    /// Unknown recipe type, committed back as it was.
    PassedThrough,
}

/// Result of a completed run: final state, per-recipe outcomes in id
/// order, and every diagnostic raised along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchReport {
    pub state: RunState,
    pub outcomes: Vec<(RecipeId, Outcome)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Unchanged))
    }

    pub fn modified(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Modified { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Deleted { .. }))
    }

    pub fn excluded(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Excluded))
    }

    pub fn passed_through(&self) -> usize {
        self.count(|o| matches!(o, Outcome::PassedThrough))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Host-supplied knobs for a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatorConfig {
    pub bounds: CountBounds,
}

/// Owns a frozen rule set and drives patch runs against a host registry.
pub struct PatchCoordinator {
    rules: RuleSet,
    config: CoordinatorConfig,
    running: AtomicBool,
    cancel: CancelToken,
}

/// Clears the in-flight flag when a run ends, on every exit path.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Per-recipe result of the fused normalize/match/transform pass, held
/// in staging until the serialize stage.
enum Staged {
    PassThrough(RawRecipe),
    Excluded(RawRecipe),
    Unchanged(RawRecipe),
    Modified {
        version: VersionTag,
        recipe: IntermediateRecipe,
        applied: Vec<String>,
    },
    Deleted {
        rule: String,
    },
}

impl PatchCoordinator {
    pub fn new(rules: RuleSet) -> Self {
        Self::with_config(rules, CoordinatorConfig::default())
    }

    pub fn with_config(rules: RuleSet, config: CoordinatorConfig) -> Self {
        Self {
            rules,
            config,
            running: AtomicBool::new(false),
            cancel: CancelToken::default(),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Token for cancelling the next (or current) run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Execute one full patch run against `host`.
    pub fn run(&self, host: &mut dyn RegistryHost) -> Result<PatchReport, CoordinationError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CoordinationError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);
        self.cancel.reset();

        // Loading. Host iteration order is unspecified; re-sort by id so
        // every downstream stage and the report are deterministic.
        let mut entries = host.snapshot()?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        self.check_cancel(RunState::Loading)?;

        // Normalizing, matching and transforming are fused per recipe;
        // entries are independent, so the pass parallelizes cleanly.
        let ordered = matcher::sorted_rules(&self.rules);
        let bounds = self.config.bounds;

        #[cfg(feature = "parallel")]
        let staged: Vec<(RecipeId, Staged, Vec<Diagnostic>)> = entries
            .par_iter()
            .map(|(id, raw)| {
                let mut diags = Vec::new();
                let staged = stage_entry(id, raw, &ordered, bounds, &mut diags);
                (id.clone(), staged, diags)
            })
            .collect();

        #[cfg(not(feature = "parallel"))]
        let staged: Vec<(RecipeId, Staged, Vec<Diagnostic>)> = entries
            .iter()
            .map(|(id, raw)| {
                let mut diags = Vec::new();
                let staged = stage_entry(id, raw, &ordered, bounds, &mut diags);
                (id.clone(), staged, diags)
            })
            .collect();

        self.check_cancel(RunState::Transforming)?;

        // Serializing: build the complete commit set before touching the
        // host. Unchanged and untouched records keep their original
        // payload bytes rather than being re-encoded.
        let mut commits = Vec::with_capacity(staged.len());
        let mut outcomes = Vec::with_capacity(staged.len());
        let mut diagnostics = Vec::new();
        for (id, entry, diags) in staged {
            diagnostics.extend(diags);
            match entry {
                Staged::PassThrough(raw) => {
                    commits.push((id.clone(), CommitEntry::Recipe(raw)));
                    outcomes.push((id, Outcome::PassedThrough));
                }
                Staged::Excluded(raw) => {
                    commits.push((id.clone(), CommitEntry::Recipe(raw)));
                    outcomes.push((id, Outcome::Excluded));
                }
                Staged::Unchanged(raw) => {
                    commits.push((id.clone(), CommitEntry::Recipe(raw)));
                    outcomes.push((id, Outcome::Unchanged));
                }
                Staged::Modified {
                    version,
                    recipe,
                    applied,
                } => {
                    let raw = adapter::denormalize(&recipe, version).map_err(|err| {
                        CoordinationError::Serialize {
                            recipe: id.clone(),
                            detail: err.to_string(),
                        }
                    })?;
                    commits.push((id.clone(), CommitEntry::Recipe(raw)));
                    outcomes.push((id, Outcome::Modified { applied }));
                }
                Staged::Deleted { rule } => {
                    commits.push((id.clone(), CommitEntry::Tombstone));
                    outcomes.push((id, Outcome::Deleted { rule }));
                }
            }
        }
        self.check_cancel(RunState::Serializing)?;

        host.commit(commits)?;
        Ok(PatchReport {
            state: RunState::Committed,
            outcomes,
            diagnostics,
        })
    }

    fn check_cancel(&self, stage: RunState) -> Result<(), CoordinationError> {
        if self.cancel.is_cancelled() {
            Err(CoordinationError::Cancelled(stage))
        } else {
            Ok(())
        }
    }
}

fn stage_entry(
    id: &RecipeId,
    raw: &RawRecipe,
    ordered: &[&ModificationRule],
    bounds: CountBounds,
    diags: &mut Vec<Diagnostic>,
) -> Staged {
    match adapter::normalize(raw) {
        Err(AdapterError::UnsupportedRecipeType(type_id)) => {
            diags.push(Diagnostic::UnsupportedRecipeType {
                recipe: id.clone(),
                type_id,
            });
            Staged::PassThrough(raw.clone())
        }
        Err(AdapterError::MalformedRecipe(detail)) => {
            diags.push(Diagnostic::MalformedRecipe {
                recipe: id.clone(),
                detail,
            });
            Staged::Excluded(raw.clone())
        }
        Ok(recipe) => match transform::apply(id, &recipe, ordered, bounds, diags) {
            PatchResult::Unchanged => Staged::Unchanged(raw.clone()),
            PatchResult::Modified { recipe, applied } => Staged::Modified {
                version: raw.version,
                recipe,
                applied,
            },
            PatchResult::Deleted { rule } => Staged::Deleted { rule },
        },
    }
}

// ===========================================================================
// Tests
// ===========================================================================
