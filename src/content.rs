//! Item and recipe types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::record::{self, Record, INPUT_SLOTS, ITEM_FIELDS, OUTPUT_SLOTS, RECIPE_FIELDS};

/// Kind of content tracked by a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Items,
    Recipes,
}

impl ContentKind {
    /// Value of the registry's `content_name` header
    pub fn content_name(&self) -> &'static str {
        match self {
            ContentKind::Items => "items",
            ContentKind::Recipes => "recipes",
        }
    }
}

/// A craftable or gatherable item, keyed by slug (the file stem)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub slug: String,
    pub name: String,
    pub description: String,
    /// Free-text tags; order carries no meaning
    pub tags: Vec<String>,
    pub price: u64,
    pub can_sell: bool,
    pub can_trade: bool,
    pub stack_limit: u32,
    /// Folder the item lives in (`materials`, `tools`, ...)
    pub category: String,
    /// Project-relative path of the record
    pub path: PathBuf,
}

impl Item {
    /// Build an item from record text. `file` supplies the slug and category.
    pub fn from_text(text: &str, file: &Path) -> Self {
        let record = Record::scan(text, ITEM_FIELDS);
        Self {
            slug: file_stem(file),
            name: record.text("item_name").to_string(),
            description: record.text("description").to_string(),
            tags: record.list("tags").to_vec(),
            price: record.int("minimum_price").max(0) as u64,
            can_sell: record.flag("can_sell"),
            can_trade: record.flag("can_trade"),
            stack_limit: record.int("stack_limit").max(0) as u32,
            category: parent_name(file),
            path: file.to_path_buf(),
        }
    }

    /// Read an item record; `None` if the file cannot be read
    pub fn read(file: &Path) -> Option<Self> {
        record::read_source(file).map(|text| Self::from_text(&text, file))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// One input or output slot of a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// 1-based slot number from the record (`input_2_slug` is slot 2)
    pub slot: usize,
    pub slug: String,
    pub quantity: u32,
}

/// A crafting recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub required_class: String,
    pub required_level: u32,
    pub gold_cost: u64,
    pub energy_cost: f64,
    /// Slots with a slug set, in slot order. Quantities may be zero.
    pub inputs: Vec<Ingredient>,
    pub outputs: Vec<Ingredient>,
    /// Name of the folder holding the record (usually the class)
    pub folder: String,
    pub path: PathBuf,
}

impl Recipe {
    /// Build a recipe from record text. A blank `slug` field falls back to
    /// the file stem.
    pub fn from_text(text: &str, file: &Path) -> Self {
        let record = Record::scan(text, RECIPE_FIELDS);
        let slug = match record.text("slug") {
            "" => file_stem(file),
            s => s.to_string(),
        };
        Self {
            slug,
            name: record.text("recipe_name").to_string(),
            description: record.text("description").to_string(),
            required_class: record.text("required_class").to_string(),
            required_level: record.int("required_level").max(0) as u32,
            gold_cost: record.int("gold_cost").max(0) as u64,
            energy_cost: record.float("energy_cost"),
            inputs: slots(&record, "input", INPUT_SLOTS),
            outputs: slots(&record, "output", OUTPUT_SLOTS),
            folder: parent_name(file),
            path: file.to_path_buf(),
        }
    }

    pub fn read(file: &Path) -> Option<Self> {
        record::read_source(file).map(|text| Self::from_text(&text, file))
    }

    /// Inputs that actually consume something
    pub fn effective_inputs(&self) -> impl Iterator<Item = &Ingredient> {
        self.inputs.iter().filter(|i| i.quantity > 0)
    }

    /// Outputs the recipe yields. The primary output counts whenever its
    /// slug is set; secondary outputs need a positive quantity.
    pub fn effective_outputs(&self) -> impl Iterator<Item = &Ingredient> {
        self.outputs
            .iter()
            .filter(|o| o.slot == 1 || o.quantity > 0)
    }

    /// Slug in `output_1_slug`, if set
    pub fn primary_output(&self) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.slot == 1)
            .map(|o| o.slug.as_str())
    }

    /// Sum of all effective input quantities
    pub fn total_input_quantity(&self) -> u32 {
        self.effective_inputs().map(|i| i.quantity).sum()
    }
}

fn slots(record: &Record, prefix: &str, count: usize) -> Vec<Ingredient> {
    (1..=count)
        .filter_map(|slot| {
            let slug = record.text(&format!("{prefix}_{slot}_slug"));
            if slug.is_empty() {
                return None;
            }
            Some(Ingredient {
                slot,
                slug: slug.to_string(),
                quantity: record.int(&format!("{prefix}_{slot}_quantity")).max(0) as u32,
            })
        })
        .collect()
}

fn file_stem(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parent_name(file: &Path) -> String {
    file.parent()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_slug_comes_from_file() {
        let text = "item_name = &\"Iron Ore\"\nminimum_price = 4\ncan_sell = true\ntags = [\"ore\"]\n";
        let item = Item::from_text(text, Path::new("items/materials/iron_ore.tres"));
        assert_eq!(item.slug, "iron_ore");
        assert_eq!(item.category, "materials");
        assert_eq!(item.price, 4);
        assert!(item.can_sell);
        assert!(item.has_tag("ore"));
    }

    #[test]
    fn test_recipe_slots() {
        let text = "\
slug = &\"bread_recipe\"
input_1_slug = &\"flour\"
input_1_quantity = 2
input_2_slug = &\"water\"
input_2_quantity = 0
input_3_slug = &\"\"
output_1_slug = &\"bread\"
output_2_slug = &\"crumbs\"
output_2_quantity = 0
";
        let recipe = Recipe::from_text(text, Path::new("recipes/forager/bread_recipe.tres"));
        assert_eq!(recipe.inputs.len(), 2);
        assert_eq!(recipe.effective_inputs().count(), 1);
        assert_eq!(recipe.total_input_quantity(), 2);
        let outputs: Vec<_> = recipe.effective_outputs().map(|o| o.slug.as_str()).collect();
        assert_eq!(outputs, ["bread"]);
        assert_eq!(recipe.primary_output(), Some("bread"));
        assert_eq!(recipe.folder, "forager");
    }

    #[test]
    fn test_recipe_slug_falls_back_to_stem() {
        let recipe = Recipe::from_text("recipe_name = &\"Rope\"\n", Path::new("r/trapper/rope_recipe.tres"));
        assert_eq!(recipe.slug, "rope_recipe");
        assert!(recipe.primary_output().is_none());
    }
}
