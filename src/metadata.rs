//! Item metadata lookup
//!
//! A slug-keyed JSON table telling the UI where an item comes from: which
//! harvesting loot tables drop it and which recipes craft it. Derived data,
//! regenerated from scratch on every run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::content::Recipe;
use crate::error::{ContentError, Result};
use crate::graph::ContentGraph;
use crate::record;

static LOOT_TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)_t(\d+)_loot_table$").expect("static regex"));

static LOOT_ENTRIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)loot_entries = Array\[Dictionary\]\(\[(.*?)\]\)").expect("static regex")
});

static RARE_ENTRIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)rare_bonus_entries = Array\[Dictionary\]\(\[(.*?)\]\)").expect("static regex")
});

static DICT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("static regex"));

static ITEM_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""item_slug":\s*&"([^"]+)""#).expect("static regex"));

/// A loot table that drops the item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestSource {
    pub class: String,
    pub tier: u32,
    pub is_rare: bool,
}

/// A recipe that produces the item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftedBy {
    pub recipe_name: String,
    pub class: String,
    pub level: u32,
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub harvest_sources: Vec<HarvestSource>,
    pub crafted_by: Vec<CraftedBy>,
}

/// Slug -> metadata, sorted by slug
pub type MetadataTable = BTreeMap<String, ItemMetadata>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataStats {
    pub harvestable_only: usize,
    pub craftable_only: usize,
    pub both: usize,
}

/// Harvest sources from every `<class>_t<tier>_loot_table.tres` below `dir`
pub fn harvest_sources(dir: &Path) -> Result<BTreeMap<String, Vec<HarvestSource>>> {
    let mut skipped = Vec::new();
    let mut sources: BTreeMap<String, Vec<HarvestSource>> = BTreeMap::new();

    for path in record::record_files(dir, &mut skipped)? {
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let Some(caps) = LOOT_TABLE_NAME.captures(&stem) else {
            debug!(file = %path.display(), "not a loot table");
            continue;
        };
        let class = caps[1].to_string();
        let Ok(tier) = caps[2].parse::<u32>() else {
            continue;
        };
        let Some(text) = record::read_source(&path) else {
            continue;
        };

        for (slug, is_rare) in loot_slugs(&text) {
            sources.entry(slug).or_default().push(HarvestSource {
                class: class.clone(),
                tier,
                is_rare,
            });
        }
    }
    Ok(sources)
}

/// (slug, is_rare) for every drop in a loot table, common drops first
pub fn loot_slugs(text: &str) -> Vec<(String, bool)> {
    let mut slugs = Vec::new();
    for (pattern, is_rare) in [(&*LOOT_ENTRIES, false), (&*RARE_ENTRIES, true)] {
        let Some(block) = pattern.captures(text) else {
            continue;
        };
        for dict in DICT.captures_iter(&block[1]) {
            if let Some(slug) = ITEM_SLUG.captures(&dict[1]) {
                slugs.push((slug[1].to_string(), is_rare));
            }
        }
    }
    slugs
}

/// Recipes producing each slug, in recipe discovery order
pub fn crafted_by(recipes: &[Recipe]) -> BTreeMap<String, Vec<CraftedBy>> {
    let mut crafted: BTreeMap<String, Vec<CraftedBy>> = BTreeMap::new();
    for recipe in recipes {
        let entry = CraftedBy {
            recipe_name: display_name(recipe),
            class: recipe.required_class.clone(),
            level: recipe.required_level.max(1),
            slug: recipe.slug.clone(),
        };
        for output in &recipe.outputs {
            crafted.entry(output.slug.clone()).or_default().push(entry.clone());
        }
    }
    crafted
}

/// Merge harvest sources and recipes into one table
pub fn build_metadata(graph: &ContentGraph, loot_tables: &Path) -> Result<MetadataTable> {
    let harvest = harvest_sources(loot_tables)?;
    info!(items = harvest.len(), "items with harvest sources");
    let crafted = crafted_by(graph.recipes());
    info!(items = crafted.len(), "items that can be crafted");

    let mut table = MetadataTable::new();
    for (slug, sources) in harvest {
        table.entry(slug).or_default().harvest_sources = sources;
    }
    for (slug, recipes) in crafted {
        table.entry(slug).or_default().crafted_by = recipes;
    }
    Ok(table)
}

pub fn stats(table: &MetadataTable) -> MetadataStats {
    table.values().fold(MetadataStats::default(), |mut s, m| {
        match (!m.harvest_sources.is_empty(), !m.crafted_by.is_empty()) {
            (true, true) => s.both += 1,
            (true, false) => s.harvestable_only += 1,
            (false, true) => s.craftable_only += 1,
            (false, false) => {}
        }
        s
    })
}

/// Write the table as pretty-printed JSON
pub fn write_metadata(path: &Path, table: &MetadataTable) -> Result<()> {
    let json = serde_json::to_string_pretty(table)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json).map_err(|source| ContentError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), items = table.len(), "wrote item metadata");
    Ok(())
}

/// Recipe name, or a title-cased file stem without the `Recipe` word
fn display_name(recipe: &Recipe) -> String {
    if !recipe.name.is_empty() {
        return recipe.name.clone();
    }
    let stem = recipe
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| recipe.slug.clone());
    stem.split('_')
        .filter(|w| !w.is_empty() && !w.eq_ignore_ascii_case("recipe"))
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LOOT: &str = r#"[resource]
loot_entries = Array[Dictionary]([{
"item_slug": &"copper_ore",
"weight": 10
}, {
"item_slug": &"stone",
"weight": 5
}])
rare_bonus_entries = Array[Dictionary]([{
"item_slug": &"raw_gem",
"weight": 1
}])
"#;

    #[test]
    fn test_loot_slugs() {
        let slugs = loot_slugs(LOOT);
        assert_eq!(
            slugs,
            vec![
                ("copper_ore".to_string(), false),
                ("stone".to_string(), false),
                ("raw_gem".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_harvest_sources_from_file_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("miner_t2_loot_table.tres"), LOOT).unwrap();
        fs::write(dir.path().join("notes.tres"), LOOT).unwrap();

        let sources = harvest_sources(dir.path()).unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(
            sources["raw_gem"],
            vec![HarvestSource {
                class: "miner".to_string(),
                tier: 2,
                is_rare: true
            }]
        );
    }

    #[test]
    fn test_crafted_by_and_stats() {
        let text = "slug = &\"ingot_recipe\"\nrequired_class = \"miner\"\nrequired_level = 3\noutput_1_slug = &\"copper_ingot\"\noutput_2_slug = &\"stone\"\n";
        let recipe = Recipe::from_text(text, Path::new("recipes/miner/copper_ingot_recipe.tres"));
        let crafted = crafted_by(&[recipe]);
        assert_eq!(crafted["copper_ingot"][0].recipe_name, "Copper Ingot");
        assert_eq!(crafted["stone"][0].level, 3);

        let mut table = MetadataTable::new();
        for (slug, recipes) in crafted {
            table.entry(slug).or_default().crafted_by = recipes;
        }
        for (slug, is_rare) in loot_slugs(LOOT) {
            table.entry(slug).or_default().harvest_sources.push(HarvestSource {
                class: "miner".to_string(),
                tier: 1,
                is_rare,
            });
        }
        assert_eq!(
            stats(&table),
            MetadataStats {
                harvestable_only: 2,
                craftable_only: 1,
                both: 1
            }
        );
    }
}
