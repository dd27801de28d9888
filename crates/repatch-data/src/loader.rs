//! Rule file loading: format detection, deserialization, and resolution
//! of the on-disk schema into `repatch-core` rule types.
//!
//! A rule directory is scanned for `.ron`, `.toml`, and `.json` files in
//! file-name order, so declaration order (the priority tie-break) is
//! stable across platforms and runs.

use std::path::{Path, PathBuf};

use repatch_core::id::ResourceId;
use repatch_core::recipe::{Ingredient, IngredientValue, RecipeKind, RecipeOutput};
use repatch_core::rule::{
    EditOp, IngredientSelector, ModificationRule, Predicate, RuleSet, RuleSetBuilder,
};

use crate::schema::{
    EditData, IngredientData, PredicateData, RuleData, SelectorData, TomlRules, TypedPredicate,
    TypedSelector,
};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading rule files.
#[derive(Debug, thiserror::Error)]
pub enum RuleLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A rule deserialized but does not resolve to a valid rule.
    #[error("invalid rule '{rule}' in {file}: {detail}")]
    InvalidRule {
        file: PathBuf,
        rule: String,
        detail: String,
    },

    /// Two rules share an id.
    #[error("duplicate rule id '{id}' in {file}")]
    DuplicateId { file: PathBuf, id: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported rule file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, RuleLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(RuleLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Parse a rule list from file content. RON and JSON files hold a list at
/// the top level; TOML files hold a `[[rules]]` table array.
pub fn parse_rules(content: &str, format: Format, file: &Path) -> Result<Vec<RuleData>, RuleLoadError> {
    let parse_err = |detail: String| RuleLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => {
            let wrapper: TomlRules =
                toml::from_str(content).map_err(|e| parse_err(e.to_string()))?;
            Ok(wrapper.rules)
        }
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

fn parse_resource_id(s: &str) -> Result<ResourceId, String> {
    s.parse().map_err(|e: repatch_core::id::InvalidResourceId| e.to_string())
}

/// An item id, or a tag with the `#` prefix.
fn parse_value(s: &str) -> Result<IngredientValue, String> {
    match s.strip_prefix('#') {
        Some(tag) => Ok(IngredientValue::Tag(parse_resource_id(tag)?)),
        None => Ok(IngredientValue::Item(parse_resource_id(s)?)),
    }
}

fn resolve_ingredient(data: &IngredientData) -> Result<Ingredient, String> {
    let values = match data {
        IngredientData::One(s) => vec![parse_value(s)?],
        IngredientData::Many(list) => {
            if list.is_empty() {
                return Err("ingredient has no values".to_string());
            }
            list.iter().map(|s| parse_value(s)).collect::<Result<_, _>>()?
        }
    };
    Ok(Ingredient::of(values))
}

/// Resolve a selector. `from_ordinals` expands into one selector per slot
/// position; everything else resolves to a single selector.
fn resolve_selector(data: &SelectorData) -> Result<Vec<IngredientSelector>, String> {
    match data {
        SelectorData::Shorthand(s) => {
            let sel = if let Some(tag) = s.strip_prefix('#') {
                IngredientSelector::MatchingTag(parse_resource_id(tag)?)
            } else if let Some(item) = s.strip_suffix('!') {
                IngredientSelector::MatchingItem(parse_resource_id(item)?)
            } else {
                IngredientSelector::ContainingItem(parse_resource_id(s)?)
            };
            Ok(vec![sel])
        }
        SelectorData::Typed(TypedSelector::All) => Ok(vec![IngredientSelector::All]),
        SelectorData::Typed(TypedSelector::FromOrdinals { ordinals }) => {
            if ordinals.is_empty() {
                return Err("from_ordinals selector has no ordinals".to_string());
            }
            Ok(ordinals.iter().map(|&i| IngredientSelector::AtIndex(i)).collect())
        }
        SelectorData::Typed(TypedSelector::MatchItem { item }) => {
            Ok(vec![IngredientSelector::ContainingItem(parse_resource_id(item)?)])
        }
        SelectorData::Typed(TypedSelector::MatchItemExact { item }) => {
            Ok(vec![IngredientSelector::MatchingItem(parse_resource_id(item)?)])
        }
        SelectorData::Typed(TypedSelector::MatchTag { tag }) => {
            let tag = tag.strip_prefix('#').unwrap_or(tag);
            Ok(vec![IngredientSelector::MatchingTag(parse_resource_id(tag)?)])
        }
    }
}

/// Resolve a recipe type name. Accepts the full `minecraft:...` type id or
/// its bare path (`"smelting"`).
fn resolve_kind(name: &str) -> Result<RecipeKind, String> {
    RecipeKind::from_type_id(name)
        .or_else(|| RecipeKind::from_type_id(&format!("minecraft:{name}")))
        .ok_or_else(|| format!("unknown recipe type '{name}'"))
}

fn resolve_predicate(data: &PredicateData) -> Result<Predicate, String> {
    let typed = match data {
        PredicateData::Id(id) => return Ok(Predicate::IdIs(parse_resource_id(id)?)),
        PredicateData::Typed(typed) => typed,
    };
    Ok(match typed {
        TypedPredicate::AlwaysApply => Predicate::Always,
        TypedPredicate::IdEquals { id } => Predicate::IdIs(parse_resource_id(id)?),
        TypedPredicate::NamespaceEquals { namespace } => Predicate::NamespaceIs(namespace.clone()),
        TypedPredicate::ResultItemIs { item } => Predicate::OutputIs(parse_resource_id(item)?),
        TypedPredicate::RecipeTypeIs { recipe_type } => Predicate::KindIs(resolve_kind(recipe_type)?),
        TypedPredicate::AcceptsIngredient { ingredient } => match parse_value(ingredient)? {
            IngredientValue::Item(item) => Predicate::HasIngredientItem(item),
            IngredientValue::Tag(tag) => Predicate::HasIngredientTag(tag),
        },
        TypedPredicate::UsesTag { tag } => {
            let tag = tag.strip_prefix('#').unwrap_or(tag);
            Predicate::HasIngredientTag(parse_resource_id(tag)?)
        }
        TypedPredicate::AllOf { conditions } => Predicate::All(
            conditions.iter().map(resolve_predicate).collect::<Result<_, _>>()?,
        ),
        TypedPredicate::AnyOf { conditions } => Predicate::Any(
            conditions.iter().map(resolve_predicate).collect::<Result<_, _>>()?,
        ),
        TypedPredicate::Not { condition } => {
            Predicate::Not(Box::new(resolve_predicate(condition)?))
        }
    })
}

fn resolve_edit(data: &EditData, out: &mut Vec<EditOp>) -> Result<(), String> {
    match data {
        EditData::AddIngredient { ingredient } => {
            out.push(EditOp::AddIngredient(resolve_ingredient(ingredient)?));
        }
        EditData::RemoveIngredient { selector } => {
            // Descending order: each removal is its own pipeline step, so
            // later positions must go first to keep earlier ones valid.
            let mut selectors = resolve_selector(selector)?;
            selectors.sort_by_key(|s| match s {
                IngredientSelector::AtIndex(i) => std::cmp::Reverse(*i),
                _ => std::cmp::Reverse(0),
            });
            out.extend(selectors.into_iter().map(EditOp::RemoveIngredient));
        }
        EditData::ReplaceIngredient { selector, with } => {
            let with = resolve_ingredient(with)?;
            for sel in resolve_selector(selector)? {
                out.push(EditOp::ReplaceIngredient {
                    selector: sel,
                    with: with.clone(),
                });
            }
        }
        EditData::AddAlternative { selector, value } => {
            let value = parse_value(value)?;
            for sel in resolve_selector(selector)? {
                out.push(EditOp::AddAlternative {
                    selector: sel,
                    value: value.clone(),
                });
            }
        }
        EditData::ReplaceResult {
            item,
            count,
            components,
        } => {
            let mut output = RecipeOutput::new(parse_resource_id(item)?, *count);
            output.data = components.clone();
            out.push(EditOp::ReplaceOutput(output));
        }
        EditData::SetResultCount { count } => out.push(EditOp::SetCount(*count)),
        EditData::DeleteRecipe => out.push(EditOp::DeleteRecipe),
        EditData::SetField { key, value } => out.push(EditOp::SetExtensionField {
            key: key.clone(),
            value: value.clone(),
        }),
    }
    Ok(())
}

/// Resolve one deserialized rule. `fallback_id` names the rule when the
/// file does not.
pub fn resolve_rule(data: &RuleData, fallback_id: &str) -> Result<ModificationRule, String> {
    if data.edits.is_empty() {
        return Err("rule has no edits".to_string());
    }
    let predicate = resolve_predicate(&data.matches)?;
    let mut transform = Vec::with_capacity(data.edits.len());
    for edit in &data.edits {
        resolve_edit(edit, &mut transform)?;
    }
    let id = data.id.as_deref().unwrap_or(fallback_id);
    let mut rule = ModificationRule::new(id, data.priority, predicate, transform);
    rule.enabled = data.enabled;
    Ok(rule)
}

// ===========================================================================
// File and directory loading
// ===========================================================================

/// Load and resolve every rule in one file. Rules without an explicit id
/// are named after the file stem, with a position suffix when the file
/// holds more than one.
pub fn load_rule_file(path: &Path) -> Result<Vec<ModificationRule>, RuleLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let parsed = parse_rules(&content, format, path)?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("rule")
        .to_string();
    let mut rules = Vec::with_capacity(parsed.len());
    for (index, data) in parsed.iter().enumerate() {
        let fallback = if parsed.len() == 1 {
            stem.clone()
        } else {
            format!("{stem}#{index}")
        };
        let rule = resolve_rule(data, &fallback).map_err(|detail| RuleLoadError::InvalidRule {
            file: path.to_path_buf(),
            rule: data.id.clone().unwrap_or(fallback),
            detail,
        })?;
        rules.push(rule);
    }
    Ok(rules)
}

/// Load a whole rule directory into a frozen [`RuleSet`]. Files are read
/// in name order; unrecognized extensions are skipped.
pub fn load_rule_set(dir: &Path) -> Result<RuleSet, RuleLoadError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && detect_format(p).is_ok())
        .collect();
    paths.sort();

    let mut builder = RuleSetBuilder::new();
    for path in paths {
        for rule in load_rule_file(&path)? {
            let id = rule.id.clone();
            builder.push(rule).map_err(|_| RuleLoadError::DuplicateId {
                file: path.clone(),
                id,
            })?;
        }
    }
    Ok(builder.build())
}

// ===========================================================================
// Tests
// ===========================================================================
