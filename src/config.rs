//! Configuration management for the content tools
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (content.toml)
//! - Environment variables (CONTENT__*)
//!
//! ## Example config file (content.toml):
//! ```toml
//! [paths]
//! root = "."
//! items = "source/common/gameplay/items"
//! recipes = "source/common/gameplay/crafting/recipes"
//!
//! [validation]
//! raw_material_tags = ["ore", "wood", "hide", "meat", "herb", "plant", "gathered", "raw"]
//! raw_material_suffixes = ["_ore", "_wood", "_hide", "_meat"]
//!
//! [registry]
//! id_base = 1
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the content tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Content tree layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Integrity validator settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Economy balance settings
    #[serde(default)]
    pub economy: EconomyConfig,
}

/// Where things live inside the project. Relative paths resolve against `root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_items_dir")]
    pub items: PathBuf,

    #[serde(default = "default_recipes_dir")]
    pub recipes: PathBuf,

    #[serde(default = "default_registry_dir")]
    pub registry: PathBuf,

    #[serde(default = "default_loot_tables_dir")]
    pub loot_tables: PathBuf,

    #[serde(default = "default_backup_dir")]
    pub backups: PathBuf,

    #[serde(default = "default_report_path")]
    pub report: PathBuf,

    #[serde(default = "default_metadata_path")]
    pub metadata: PathBuf,

    /// Scheme prefix used for root-relative virtual paths in registries
    #[serde(default = "default_virtual_prefix")]
    pub virtual_prefix: String,
}

/// Integrity validator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Items carrying any of these tags are raw materials
    #[serde(default = "default_raw_tags")]
    pub raw_material_tags: Vec<String>,

    /// Items whose slug ends with any of these are raw materials
    #[serde(default = "default_raw_suffixes")]
    pub raw_material_suffixes: Vec<String>,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// First id handed out by a full rebuild
    #[serde(default = "default_id_base")]
    pub id_base: u64,

    #[serde(default = "default_items_index")]
    pub items_index: String,

    #[serde(default = "default_recipes_index")]
    pub recipes_index: String,
}

/// Economy balance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Highest recipe level reported in the distribution table
    #[serde(default = "default_max_level")]
    pub max_level: u32,

    /// Levels up to this one should have exactly one recipe
    #[serde(default = "default_single_recipe_levels")]
    pub single_recipe_levels: u32,

    /// Recipe folder holding recipes that consume other classes' output
    #[serde(default = "default_interdependent_folder")]
    pub interdependent_folder: String,

    /// Interdependent recipes should start at or below this level
    #[serde(default = "default_interdependency_start")]
    pub interdependency_start: u32,

    #[serde(default = "default_price_bands")]
    pub price_bands: Vec<PriceBand>,
}

/// Inclusive price range with a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub min: u64,
    pub max: u64,
    pub label: String,
}

// Default value functions
fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_items_dir() -> PathBuf {
    PathBuf::from("source/common/gameplay/items")
}

fn default_recipes_dir() -> PathBuf {
    PathBuf::from("source/common/gameplay/crafting/recipes")
}

fn default_registry_dir() -> PathBuf {
    PathBuf::from("source/common/registry/indexes")
}

fn default_loot_tables_dir() -> PathBuf {
    PathBuf::from("source/server/world/components/harvesting/loot_tables")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("migration_backups")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("VALIDATION_REPORT.md")
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("source/common/gameplay/items/item_metadata.json")
}

fn default_virtual_prefix() -> String {
    "res://".to_string()
}

fn default_raw_tags() -> Vec<String> {
    ["ore", "wood", "hide", "meat", "herb", "plant", "gathered", "raw"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_raw_suffixes() -> Vec<String> {
    ["_ore", "_wood", "_hide", "_meat"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_id_base() -> u64 {
    1
}

fn default_items_index() -> String {
    "items_index.tres".to_string()
}

fn default_recipes_index() -> String {
    "recipes_index.tres".to_string()
}

fn default_max_level() -> u32 {
    30
}

fn default_single_recipe_levels() -> u32 {
    10
}

fn default_interdependent_folder() -> String {
    "interdependent".to_string()
}

fn default_interdependency_start() -> u32 {
    3
}

fn default_price_bands() -> Vec<PriceBand> {
    [
        (0, 5, "Very Low"),
        (6, 15, "Low"),
        (16, 50, "Medium"),
        (51, 150, "High"),
        (151, 500, "Very High"),
        (501, 10000, "Legendary"),
    ]
    .into_iter()
    .map(|(min, max, label)| PriceBand {
        min,
        max,
        label: label.to_string(),
    })
    .collect()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            items: default_items_dir(),
            recipes: default_recipes_dir(),
            registry: default_registry_dir(),
            loot_tables: default_loot_tables_dir(),
            backups: default_backup_dir(),
            report: default_report_path(),
            metadata: default_metadata_path(),
            virtual_prefix: default_virtual_prefix(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            raw_material_tags: default_raw_tags(),
            raw_material_suffixes: default_raw_suffixes(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            id_base: default_id_base(),
            items_index: default_items_index(),
            recipes_index: default_recipes_index(),
        }
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            max_level: default_max_level(),
            single_recipe_levels: default_single_recipe_levels(),
            interdependent_folder: default_interdependent_folder(),
            interdependency_start: default_interdependency_start(),
            price_bands: default_price_bands(),
        }
    }
}

impl PathsConfig {
    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn items_dir(&self) -> PathBuf {
        self.resolve(&self.items)
    }

    pub fn recipes_dir(&self) -> PathBuf {
        self.resolve(&self.recipes)
    }

    pub fn registry_dir(&self) -> PathBuf {
        self.resolve(&self.registry)
    }

    pub fn loot_tables_dir(&self) -> PathBuf {
        self.resolve(&self.loot_tables)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.resolve(&self.backups)
    }

    pub fn report_path(&self) -> PathBuf {
        self.resolve(&self.report)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.resolve(&self.metadata)
    }

    /// Virtual path (`res://...`) for a file inside the project root
    pub fn virtual_path(&self, file: &Path) -> String {
        let relative = file.strip_prefix(&self.root).unwrap_or(file);
        let relative = relative.to_string_lossy().replace('\\', "/");
        format!("{}{}", self.virtual_prefix, relative)
    }
}

impl ContentConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["content.toml", ".content.toml", "config/content.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "krakovia", "content-forge") {
            let xdg_config = config_dir.config_dir().join("content.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CONTENT__PATHS__ROOT=... etc.
        builder = builder.add_source(
            Environment::with_prefix("CONTENT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Replace the project root (used by the `--root` CLI flag)
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.paths.root = root.into();
        self
    }

    pub fn items_index_path(&self) -> PathBuf {
        self.paths.registry_dir().join(&self.registry.items_index)
    }

    pub fn recipes_index_path(&self) -> PathBuf {
        self.paths.registry_dir().join(&self.registry.recipes_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ContentConfig::default();
        assert_eq!(config.validation.raw_material_tags.len(), 8);
        assert_eq!(config.registry.id_base, 1);
        assert_eq!(config.economy.price_bands.len(), 6);
    }

    #[test]
    fn test_serialize_config() {
        let config = ContentConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[paths]"));
        assert!(toml_str.contains("[validation]"));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.toml");

        let mut config = ContentConfig::default().with_root("/project");
        config.registry.id_base = 100;
        config.validation.raw_material_tags = vec!["ore".to_string()];
        config.economy.price_bands.truncate(2);
        config.save(path.to_str().unwrap()).unwrap();

        let loaded: ContentConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.paths.root, PathBuf::from("/project"));
        assert_eq!(loaded.paths.items, config.paths.items);
        assert_eq!(loaded.paths.virtual_prefix, "res://");
        assert_eq!(loaded.registry.id_base, 100);
        assert_eq!(loaded.registry.recipes_index, config.registry.recipes_index);
        assert_eq!(loaded.validation.raw_material_tags, vec!["ore"]);
        assert_eq!(loaded.economy.price_bands, config.economy.price_bands);
        assert_eq!(loaded.economy.max_level, config.economy.max_level);
    }

    #[test]
    fn test_virtual_path() {
        let config = ContentConfig::default().with_root("/project");
        let file = Path::new("/project/source/common/gameplay/items/tools/axe.tres");
        assert_eq!(
            config.paths.virtual_path(file),
            "res://source/common/gameplay/items/tools/axe.tres"
        );
    }

    #[test]
    fn test_index_paths_follow_root() {
        let config = ContentConfig::default().with_root("/project");
        assert_eq!(
            config.recipes_index_path(),
            PathBuf::from("/project/source/common/registry/indexes/recipes_index.tres")
        );
    }
}
