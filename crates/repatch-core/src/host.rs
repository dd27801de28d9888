//! Loader-side registry boundary.
//!
//! The engine never touches a game registry directly. A loader shim
//! implements [`RegistryHost`]: it hands the coordinator a snapshot of
//! raw recipes and later receives the full patched set in one commit
//! call, so the registry is swapped atomically or not at all.

use crate::id::RecipeId;
use crate::recipe::RawRecipe;

/// Opaque loader failure. The coordinator does not interpret the
/// message, it only carries it up in the run report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("registry host error: {0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One committed registry entry: a (possibly patched) recipe, or a
/// tombstone marking a deleted id the host must unregister.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitEntry {
    Recipe(RawRecipe),
    Tombstone,
}

/// The contract a loader shim implements to plug the engine into a
/// concrete game loader.
pub trait RegistryHost {
    /// A point-in-time copy of every registered recipe. The host decides
    /// iteration order; the engine re-sorts by id for determinism.
    fn snapshot(&self) -> Result<Vec<(RecipeId, RawRecipe)>, HostError>;

    /// Replace the registry contents with `entries`. Must be all-or-nothing:
    /// on error the previous registry state stays live.
    fn commit(&mut self, entries: Vec<(RecipeId, CommitEntry)>) -> Result<(), HostError>;
}
