//! Item creation from seed data
//!
//! Renders the fixed `MaterialItem` template for every seed whose file does
//! not exist yet and registers the new files in the items registry.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::backup::BackupScope;
use crate::config::ContentConfig;
use crate::error::{ContentError, Result};
use crate::registry::{self, ContentRegistry};
use crate::seed::ItemSeed;

/// Tags that make an item unstackable
const EQUIPMENT_TAGS: [&str; 2] = ["weapon", "armor"];

const STACK_SINGLE: u32 = 1;
const STACK_DEFAULT: u32 = 99;

/// Length of the generated uid suffix
const UID_LEN: usize = 12;

/// `uid://auto<suffix>` suffix: the slug without underscores, truncated
pub fn generate_uid(slug: &str) -> String {
    slug.chars().filter(|&c| c != '_').take(UID_LEN).collect()
}

pub fn stack_limit(tags: &[String]) -> u32 {
    if tags.iter().any(|t| EQUIPMENT_TAGS.contains(&t.as_str())) {
        STACK_SINGLE
    } else {
        STACK_DEFAULT
    }
}

/// `["a", "b"]`
pub fn render_tags(tags: &[String]) -> String {
    let quoted: Vec<String> = tags.iter().map(|t| format!("\"{t}\"")).collect();
    format!("[{}]", quoted.join(", "))
}

/// Item record text for a seed
pub fn render_item(seed: &ItemSeed) -> String {
    format!(
        r#"[gd_resource type="Resource" script_class="MaterialItem" load_steps=3 format=3 uid="uid://auto{uid}"]

[ext_resource type="Texture2D" uid="uid://budvautc5sw4b" path="res://assets/Raven Fantasy Icons/Separated Files/32x32/fb202.png" id="1_icon"]
[ext_resource type="Script" uid="uid://nsr1timk430j" path="res://source/common/gameplay/items/material_item.gd" id="2_material"]

[resource]
script = ExtResource("2_material")
item_name = &"{name}"
item_icon = ExtResource("1_icon")
description = "{description}"
can_trade = true
can_sell = true
minimum_price = {price}
stack_limit = {stack_limit}
tags = {tags}
metadata/_custom_type_script = "uid://nsr1timk430j"
"#,
        uid = generate_uid(&seed.slug),
        name = seed.name,
        description = seed.description,
        price = seed.price,
        stack_limit = stack_limit(&seed.tags),
        tags = render_tags(&seed.tags),
    )
}

/// Outcome of an item creation run
#[derive(Debug, Clone, Default)]
pub struct CreateSummary {
    /// (slug, file) for every file written
    pub created: Vec<(String, PathBuf)>,
    /// Seeds whose file already existed
    pub skipped: Vec<String>,
    /// Registry ids handed to the created items
    pub registered: Vec<u64>,
    /// Unified diff of the registry, filled on dry runs
    pub registry_diff: Option<String>,
    pub backup_dir: Option<PathBuf>,
}

/// Create every missing item and register it.
///
/// If the registry cannot be updated the created files are removed again.
pub fn create_items(config: &ContentConfig, seeds: &[ItemSeed], dry_run: bool) -> Result<CreateSummary> {
    let items_dir = config.paths.items_dir();
    let index_path = config.items_index_path();
    let mut summary = CreateSummary::default();

    let mut planned = Vec::new();
    for seed in seeds {
        let file = items_dir.join(&seed.folder).join(format!("{}.tres", seed.slug));
        if file.exists() {
            info!(slug = %seed.slug, "SKIP: already exists");
            summary.skipped.push(seed.slug.clone());
            continue;
        }
        planned.push((seed, file));
    }

    let mut registry = ContentRegistry::load(&index_path)?;
    let before = registry.render();
    let additions: Vec<(String, String)> = planned
        .iter()
        .filter(|(seed, _)| {
            let known = registry.contains_slug(&seed.slug);
            if known {
                warn!(slug = %seed.slug, "already registered, not appending");
            }
            !known
        })
        .map(|(seed, file)| (seed.slug.clone(), config.paths.virtual_path(file)))
        .collect();

    if dry_run {
        summary.registered = registry.append_all(additions)?;
        summary.created = planned.into_iter().map(|(s, f)| (s.slug.clone(), f)).collect();
        summary.registry_diff = Some(registry::diff_text(&before, &registry.render(), &index_path));
        return Ok(summary);
    }

    if planned.is_empty() {
        return Ok(summary);
    }

    let mut scope = BackupScope::begin(&config.paths.backup_dir(), &config.paths.root, "create_items")?;
    let result = write_items(&planned, &mut scope, &mut summary).and_then(|()| {
        if additions.is_empty() {
            return Ok(Vec::new());
        }
        scope.snapshot(&index_path)?;
        let ids = registry.append_all(additions)?;
        registry.save(&index_path)?;
        Ok(ids)
    });

    match result {
        Ok(ids) => {
            summary.registered = ids;
            summary.backup_dir = Some(scope.dir().to_path_buf());
            info!(created = summary.created.len(), registered = summary.registered.len(), "created items");
            Ok(summary)
        }
        Err(e) => {
            warn!(error = %e, "item creation failed, rolling back");
            Err(scope.abort(e))
        }
    }
}

fn write_items(
    planned: &[(&ItemSeed, PathBuf)],
    scope: &mut BackupScope,
    summary: &mut CreateSummary,
) -> Result<()> {
    for (seed, file) in planned {
        write_new(file, &render_item(seed))?;
        scope.track_created(file);
        info!(slug = %seed.slug, folder = %seed.folder, "created item");
        summary.created.push((seed.slug.clone(), file.clone()));
    }
    Ok(())
}

fn write_new(file: &Path, text: &str) -> Result<()> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(file, text).map_err(|source| ContentError::Write {
        path: file.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Item;

    fn seed(slug: &str, tags: &[&str]) -> ItemSeed {
        ItemSeed {
            slug: slug.to_string(),
            name: "Legendary Weapon".to_string(),
            description: "Masterwork weapon of incredible power.".to_string(),
            folder: "combat".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            price: 2000,
        }
    }

    #[test]
    fn test_uid_strips_underscores_and_truncates() {
        assert_eq!(generate_uid("legendary_weapon"), "legendarywea");
        assert_eq!(generate_uid("crown"), "crown");
    }

    #[test]
    fn test_stack_limit_from_tags() {
        assert_eq!(stack_limit(&["armor".to_string()]), 1);
        assert_eq!(stack_limit(&["weapon".to_string(), "t6".to_string()]), 1);
        assert_eq!(stack_limit(&["drink".to_string()]), 99);
        assert_eq!(stack_limit(&[]), 99);
    }

    #[test]
    fn test_rendered_item_fields() {
        let text = render_item(&seed("legendary_weapon", &["weapon", "legendary"]));
        assert!(text.starts_with(
            "[gd_resource type=\"Resource\" script_class=\"MaterialItem\" load_steps=3 format=3 uid=\"uid://autolegendarywea\"]\n\n"
        ));
        assert!(text.contains("\nitem_name = &\"Legendary Weapon\"\n"));
        assert!(text.contains("\ntags = [\"weapon\", \"legendary\"]\n"));
        assert!(text.ends_with("metadata/_custom_type_script = \"uid://nsr1timk430j\"\n"));

        let item = Item::from_text(&text, Path::new("items/combat/legendary_weapon.tres"));
        assert_eq!(item.name, "Legendary Weapon");
        assert_eq!(item.price, 2000);
        assert_eq!(item.stack_limit, 1);
        assert_eq!(item.tags, vec!["weapon", "legendary"]);
        assert!(item.can_sell && item.can_trade);
    }
}
