//! Content Loading
//!
//! Walks the item and recipe trees, reads every `.tres` record and builds the
//! [`ContentGraph`]. Directory entries are visited in file-name order so
//! recipe discovery order (and therefore recipe ids) is reproducible.
//!
//! A record that cannot be read is logged and skipped; only a missing root
//! directory fails the load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use super::ContentGraph;
use crate::config::PathsConfig;
use crate::content::{Item, Recipe};
use crate::record;

/// Files that were visited but could not be used
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub skipped: Vec<PathBuf>,
    /// Item slugs defined by more than one file; the later file won
    pub shadowed_items: Vec<String>,
}

/// Load items and recipes and build the production graph
pub fn load_content(paths: &PathsConfig) -> anyhow::Result<(ContentGraph, LoadSummary)> {
    let mut summary = LoadSummary::default();

    let items_dir = paths.items_dir();
    let items = load_items(&items_dir, &paths.root, &mut summary)
        .with_context(|| format!("loading items from {}", items_dir.display()))?;
    info!(count = items.len(), "loaded items");

    let recipes_dir = paths.recipes_dir();
    let recipes = load_recipes(&recipes_dir, &paths.root, &mut summary)
        .with_context(|| format!("loading recipes from {}", recipes_dir.display()))?;
    info!(count = recipes.len(), "loaded recipes");

    Ok((ContentGraph::new(items, recipes), summary))
}

/// Load every item record below `dir`, across category subfolders.
///
/// Paths are stored relative to `root`. A slug seen twice keeps the later
/// file's fields.
pub fn load_items(
    dir: &Path,
    root: &Path,
    summary: &mut LoadSummary,
) -> anyhow::Result<BTreeMap<String, Item>> {
    let mut items = BTreeMap::new();
    for path in record::record_files(dir, &mut summary.skipped)? {
        let Some(mut item) = Item::read(&path) else {
            summary.skipped.push(path);
            continue;
        };
        item.path = relative(&path, root);
        if let Some(previous) = items.insert(item.slug.clone(), item) {
            warn!(slug = %previous.slug, shadowed = %previous.path.display(), "duplicate item slug");
            summary.shadowed_items.push(previous.slug);
        }
    }
    Ok(items)
}

/// Load every recipe record below `dir` in discovery order
pub fn load_recipes(dir: &Path, root: &Path, summary: &mut LoadSummary) -> anyhow::Result<Vec<Recipe>> {
    let mut recipes = Vec::new();
    for path in record::record_files(dir, &mut summary.skipped)? {
        let Some(mut recipe) = Recipe::read(&path) else {
            summary.skipped.push(path);
            continue;
        };
        recipe.path = relative(&path, root);
        recipes.push(recipe);
    }
    Ok(recipes)
}

fn relative(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
