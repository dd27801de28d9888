use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The namespace assumed when an identifier string has no `namespace:` part.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// A namespaced identifier of the form `namespace:path`, e.g.
/// `minecraft:iron_ingot`. Used for recipes, items, and item tags.
///
/// Serializes as the joined string, which is also the on-disk form in
/// recipe data and rule files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    namespace: String,
    path: String,
}

/// Identifies a recipe within a snapshot. Unique per snapshot.
pub type RecipeId = ResourceId;

impl ResourceId {
    /// Build an identifier from explicit parts. Fails on empty or
    /// whitespace-bearing parts.
    pub fn new(namespace: &str, path: &str) -> Result<Self, InvalidResourceId> {
        if !is_valid_part(namespace) || !is_valid_part(path) {
            return Err(InvalidResourceId(format!("{namespace}:{path}")));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_-./".contains(c))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid resource identifier: '{0}'")]
pub struct InvalidResourceId(pub String);

impl FromStr for ResourceId {
    type Err = InvalidResourceId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((ns, path)) => Self::new(ns, path),
            None => Self::new(DEFAULT_NAMESPACE, s),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
