//! Content Forge
//!
//! Maintenance tooling for a game content database stored as Godot-style
//! `.tres` resource files: items, crafting recipes, and the id registries
//! that index them.
//!
//! ## Features
//!
//! - **Tolerant Record Reading**: Line-oriented field scanner with defaults
//! - **Content Graph**: Items and recipes joined into a production graph
//! - **Integrity Validation**: Five checks from broken references down to dead ends
//! - **Registry Maintenance**: Append, rebuild, rename and prune id registries
//! - **Backups**: Every destructive write is snapshotted first and rolled back on failure
//!
//! ## Layout
//!
//! ```text
//! source/common/
//! ├── gameplay/
//! │   ├── items/<category>/<slug>.tres
//! │   └── crafting/recipes/<class>/<slug>.tres
//! └── registry/indexes/
//!     ├── items_index.tres
//!     └── recipes_index.tres
//! ```

pub mod backup;
pub mod checksum;
pub mod config;
pub mod content;
pub mod create;
pub mod economy;
pub mod error;
pub mod graph;
pub mod index;
pub mod metadata;
pub mod migrate;
pub mod record;
pub mod registry;
pub mod report;
pub mod seed;
pub mod validate;
pub mod version;

pub use backup::BackupScope;
pub use checksum::ContentHash;
pub use config::ContentConfig;
pub use content::{ContentKind, Ingredient, Item, Recipe};
pub use error::{ContentError, Result};
pub use graph::loader::{load_content, LoadSummary};
pub use graph::ContentGraph;
pub use registry::{ContentRegistry, RegistryEntry};
pub use validate::{Issue, IssueKind, Severity, ValidationReport, Validator};
pub use version::VersionStamp;
