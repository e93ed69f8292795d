//! Recipe index maintenance
//!
//! Full rebuilds of the recipes registry from seed data, and retirement of a
//! whole recipe folder (files plus registry entries).

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::backup::BackupScope;
use crate::config::ContentConfig;
use crate::error::{ContentError, Result};
use crate::record;
use crate::registry::{self, ContentRegistry, RegistryEntry};
use crate::seed::IndexSeed;

/// Outcome of a registry-writing command
#[derive(Debug, Clone, Default)]
pub struct IndexSummary {
    pub kept: usize,
    pub added: usize,
    pub removed: Vec<RegistryEntry>,
    pub deleted_files: Vec<PathBuf>,
    pub next_id: u64,
    /// Unified diff of the registry, filled on dry runs
    pub registry_diff: Option<String>,
    pub backup_dir: Option<PathBuf>,
}

/// Regenerate the recipes registry: keep entries up to the seed's cutoff,
/// then register every seeded recipe under `<recipes>/<class>/<slug>.tres`.
pub fn rebuild_recipe_index(config: &ContentConfig, seed: &IndexSeed, dry_run: bool) -> Result<IndexSummary> {
    let index_path = config.recipes_index_path();
    let recipes_dir = config.paths.recipes_dir();

    let mut registry = ContentRegistry::load(&index_path)?;
    let before = registry.render();

    let seeds: Vec<(String, String)> = seed
        .recipes
        .iter()
        .map(|r| {
            let file = recipes_dir.join(&r.class).join(format!("{}.tres", r.slug));
            if !file.exists() {
                warn!(slug = %r.slug, file = %file.display(), "seeded recipe has no file");
            }
            (r.slug.clone(), config.paths.virtual_path(&file))
        })
        .collect();

    registry.rebuild(seed.keep_through, &seeds, config.registry.id_base)?;
    let mut summary = IndexSummary {
        kept: registry.len() - seeds.len(),
        added: seeds.len(),
        next_id: registry.next_id(),
        ..Default::default()
    };

    if dry_run {
        summary.registry_diff = Some(registry::diff_text(&before, &registry.render(), &index_path));
        return Ok(summary);
    }

    let mut scope = BackupScope::begin(&config.paths.backup_dir(), &config.paths.root, "rebuild_index")?;
    scope.snapshot(&index_path)?;
    registry.save(&index_path)?;
    summary.backup_dir = Some(scope.dir().to_path_buf());
    info!(kept = summary.kept, added = summary.added, next_id = summary.next_id, "recipes index rebuilt");
    Ok(summary)
}

/// Delete every recipe in `<recipes>/<folder>` and drop registry entries
/// whose path runs through a `folder` directory
pub fn remove_recipe_folder(config: &ContentConfig, folder: &str, dry_run: bool) -> Result<IndexSummary> {
    if folder.is_empty() || folder.contains(['/', '\\']) || folder == ".." {
        return Err(ContentError::InvalidFolder(folder.to_string()));
    }
    let index_path = config.recipes_index_path();
    let dir = config.paths.recipes_dir().join(folder);

    let mut skipped = Vec::new();
    let files = record::record_files(&dir, &mut skipped)?;
    info!(folder, count = files.len(), "found recipes to remove");

    let mut registry = ContentRegistry::load(&index_path)?;
    let before = registry.render();
    let removed = registry.remove_by_path_segment(folder);

    let mut summary = IndexSummary {
        kept: registry.len(),
        removed,
        next_id: registry.next_id(),
        ..Default::default()
    };

    if dry_run {
        summary.deleted_files = files;
        summary.registry_diff = Some(registry::diff_text(&before, &registry.render(), &index_path));
        return Ok(summary);
    }

    let mut scope = BackupScope::begin(&config.paths.backup_dir(), &config.paths.root, &format!("remove_{folder}"))?;
    for file in &files {
        scope.snapshot(file)?;
    }
    scope.snapshot(&index_path)?;

    let result = (|| -> Result<()> {
        for file in &files {
            fs::remove_file(file)?;
            info!(file = %file.display(), "removed");
        }
        registry.save(&index_path)
    })();
    if let Err(e) = result {
        warn!(error = %e, "folder removal failed, restoring backups");
        return Err(scope.abort(e));
    }

    match fs::read_dir(&dir).map(|mut entries| entries.next().is_none()) {
        Ok(true) => match fs::remove_dir(&dir) {
            Ok(()) => info!(dir = %dir.display(), "removed empty folder"),
            Err(e) => warn!(dir = %dir.display(), error = %e, "could not remove folder"),
        },
        Ok(false) => {}
        Err(e) => warn!(dir = %dir.display(), error = %e, "could not inspect folder"),
    }

    summary.deleted_files = files;
    summary.backup_dir = Some(scope.dir().to_path_buf());
    Ok(summary)
}
