//! Seed data files
//!
//! Item creation and index rebuilds are driven by TOML files listing what to
//! add. Order in the file is the order ids are handed out.
//!
//! ```toml
//! [[item]]
//! slug = "berry_juice"
//! name = "Berry Juice"
//! description = "A sweet drink squeezed from wild berries."
//! folder = "materials"
//! tags = ["consumable", "drink", "t1"]
//! price = 8
//! ```
//!
//! ```toml
//! keep_through = 83
//!
//! [[recipe]]
//! slug = "rope_recipe"
//! class = "trapper"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ContentError, Result};

/// An item to generate from the fixed template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSeed {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Category folder under the items tree
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub price: u64,
}

/// A recipe to register during a full index rebuild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSeed {
    pub slug: String,
    /// Class folder the recipe lives in
    pub class: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ItemSeedFile {
    #[serde(default, rename = "item")]
    items: Vec<ItemSeed>,
}

/// Contents of an index rebuild seed file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSeed {
    /// Existing entries with ids up to this one survive the rebuild
    #[serde(default)]
    pub keep_through: Option<u64>,
    #[serde(default, rename = "recipe")]
    pub recipes: Vec<RecipeSeed>,
}

fn default_folder() -> String {
    "materials".to_string()
}

/// Load and check an item seed file
pub fn load_item_seeds(path: &Path) -> Result<Vec<ItemSeed>> {
    let file: ItemSeedFile = toml::from_str(&fs::read_to_string(path)?)?;
    check_slugs(path, file.items.iter().map(|s| s.slug.as_str()))?;
    if let Some(bad) = file.items.iter().find(|s| !is_path_component(&s.folder)) {
        return Err(invalid(path, format!("item {} has an invalid folder {:?}", bad.slug, bad.folder)));
    }
    info!(path = %path.display(), count = file.items.len(), "loaded item seeds");
    Ok(file.items)
}

/// Load and check an index rebuild seed file
pub fn load_index_seed(path: &Path) -> Result<IndexSeed> {
    let seed: IndexSeed = toml::from_str(&fs::read_to_string(path)?)?;
    check_slugs(path, seed.recipes.iter().map(|s| s.slug.as_str()))?;
    if let Some(bad) = seed.recipes.iter().find(|s| !is_path_component(&s.class)) {
        return Err(invalid(path, format!("recipe {} has an invalid class {:?}", bad.slug, bad.class)));
    }
    info!(path = %path.display(), count = seed.recipes.len(), keep_through = ?seed.keep_through, "loaded index seed");
    Ok(seed)
}

fn check_slugs<'a>(path: &Path, slugs: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for slug in slugs {
        if slug.is_empty() {
            return Err(invalid(path, "empty slug".to_string()));
        }
        if !is_path_component(slug) {
            return Err(invalid(path, format!("slug {slug:?} is not a plain file name")));
        }
        if !seen.insert(slug) {
            return Err(invalid(path, format!("slug {slug} listed twice")));
        }
    }
    Ok(())
}

/// Slugs, folders and classes become single path components
fn is_path_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn invalid(path: &Path, message: String) -> ContentError {
    ContentError::InvalidSeed {
        path: path.to_path_buf(),
        message,
    }
}
