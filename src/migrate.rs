//! Slug renames and `_new` item migration
//!
//! A rename touches two places that must stay in step: the items registry
//! (slug field plus the file name in `path`) and every recipe's
//! `input_N_slug` / `output_N_slug` fields. [`RenamePlan`] computes all new
//! file contents in memory first; [`RenamePlan::commit`] then snapshots every
//! affected file, writes, and rolls everything back if any write fails.
//!
//! Matching is on whole quoted values only: renaming `grapes_new` leaves
//! `grapes_new_wine` alone.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{info, warn};

use crate::backup::BackupScope;
use crate::config::ContentConfig;
use crate::error::{ContentError, Result};
use crate::record;
use crate::registry::{self, ContentRegistry};

/// Suffix marking a replacement item file
pub const NEW_SUFFIX: &str = "_new";

/// One slug change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugRename {
    pub old: String,
    pub new: String,
    /// Drop an existing registry entry for `new` instead of failing. Used when
    /// the file that entry points at is being replaced.
    pub replace_existing: bool,
}

impl SlugRename {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
            replace_existing: false,
        }
    }
}

/// File-system change carried out alongside a rename
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileMove {
    Delete(PathBuf),
    Rename { from: PathBuf, to: PathBuf },
}

/// Pending rewrite of one recipe file
#[derive(Debug, Clone)]
pub struct RecipeEdit {
    pub path: PathBuf,
    pub before: String,
    pub after: String,
    pub replacements: usize,
}

/// All changes of a rename batch, computed but not yet written
#[derive(Debug)]
pub struct RenamePlan {
    pub renames: Vec<SlugRename>,
    pub index_path: PathBuf,
    original_index: String,
    pub registry: ContentRegistry,
    /// Registry entries whose slug or path changed
    pub registry_entries: usize,
    pub recipe_edits: Vec<RecipeEdit>,
    pub moves: Vec<FileMove>,
}

/// What a committed rename changed
#[derive(Debug, Clone, Default)]
pub struct RenameOutcome {
    pub registry_entries: usize,
    pub recipes: Vec<PathBuf>,
    pub moved: usize,
    pub backup_dir: PathBuf,
}

/// Regex matching an exact slug value in any input/output slot
pub fn slot_pattern(slug: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"(?m)^(\s*(?:input|output)_\d+_slug\s*=\s*&?"){}(")"#,
        regex::escape(slug)
    ))
}

/// Rewrite every slot holding exactly `old`. Returns the new text and the
/// number of replacements.
pub fn rename_in_recipe(text: &str, pattern: &Regex, new: &str) -> (String, usize) {
    let count = pattern.find_iter(text).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    let replaced = pattern.replace_all(text, |caps: &regex::Captures| format!("{}{new}{}", &caps[1], &caps[2]));
    (replaced.into_owned(), count)
}

impl RenamePlan {
    /// Compute the registry and recipe rewrites for `renames`
    pub fn build(index_path: &Path, recipes_dir: &Path, renames: Vec<SlugRename>) -> Result<Self> {
        let original_index = fs::read_to_string(index_path)?;
        let mut registry = ContentRegistry::parse(&original_index, index_path)?;

        let mut registry_entries = 0;
        for rename in &renames {
            if rename.replace_existing {
                // An unregistered `_new` file leaves the clean entry in place
                if !registry.references(&rename.old) {
                    warn!(slug = %rename.old, "slug not in registry, updating recipes only");
                    continue;
                }
                if let Some(stale) = registry.remove_slug(&rename.new) {
                    info!(slug = %stale.slug, id = stale.id, "dropping entry for replaced file");
                }
            }
            match registry.rename(&rename.old, &rename.new) {
                Ok(n) => registry_entries += n,
                Err(ContentError::EntryNotFound(slug)) => {
                    warn!(slug = %slug, "slug not in registry, updating recipes only");
                }
                Err(e) => return Err(failed(&renames, e.to_string())),
            }
        }

        let mut patterns: Vec<(Regex, &str)> = Vec::with_capacity(renames.len());
        for r in &renames {
            let pattern = slot_pattern(&r.old).map_err(|e| failed(&renames, e.to_string()))?;
            patterns.push((pattern, r.new.as_str()));
        }

        let mut skipped = Vec::new();
        let mut recipe_edits = Vec::new();
        for path in record::record_files(recipes_dir, &mut skipped)? {
            let before = fs::read_to_string(&path)
                .map_err(|e| failed(&renames, format!("reading {}: {e}", path.display())))?;
            let mut after = before.clone();
            let mut replacements = 0;
            for (pattern, new) in &patterns {
                let (text, n) = rename_in_recipe(&after, pattern, new);
                after = text;
                replacements += n;
            }
            if replacements > 0 {
                recipe_edits.push(RecipeEdit {
                    path,
                    before,
                    after,
                    replacements,
                });
            }
        }
        if !skipped.is_empty() {
            return Err(failed(&renames, format!("{} unreadable entries in the recipe tree", skipped.len())));
        }

        Ok(Self {
            renames,
            index_path: index_path.to_path_buf(),
            original_index,
            registry,
            registry_entries,
            recipe_edits,
            moves: Vec::new(),
        })
    }

    /// Attach file moves to perform in the same commit
    pub fn with_moves(mut self, moves: Vec<FileMove>) -> Self {
        self.moves = moves;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.registry_entries == 0 && self.recipe_edits.is_empty() && self.moves.is_empty()
    }

    /// Unified diffs of every file the commit would rewrite
    pub fn preview(&self) -> String {
        let mut out = String::new();
        let rendered = self.registry.render();
        if rendered != self.original_index {
            out.push_str(&registry::diff_text(&self.original_index, &rendered, &self.index_path));
        }
        for edit in &self.recipe_edits {
            out.push_str(&registry::diff_text(&edit.before, &edit.after, &edit.path));
        }
        for mv in &self.moves {
            match mv {
                FileMove::Delete(path) => out.push_str(&format!("delete {}\n", path.display())),
                FileMove::Rename { from, to } => {
                    out.push_str(&format!("rename {} -> {}\n", from.display(), to.display()))
                }
            }
        }
        out
    }

    /// Snapshot, then write everything. On any failure the snapshots are
    /// restored and [`ContentError::RenameFailed`] is returned.
    pub fn commit(self, scope: &mut BackupScope) -> Result<RenameOutcome> {
        self.snapshot_all(scope)?;

        match self.write_all(scope) {
            Ok(()) => {
                info!(
                    registry_entries = self.registry_entries,
                    recipes = self.recipe_edits.len(),
                    moved = self.moves.len(),
                    "rename committed"
                );
                Ok(RenameOutcome {
                    registry_entries: self.registry_entries,
                    recipes: self.recipe_edits.into_iter().map(|e| e.path).collect(),
                    moved: self.moves.len(),
                    backup_dir: scope.dir().to_path_buf(),
                })
            }
            Err(e) => {
                warn!(error = %e, "rename failed, restoring backups");
                let e = scope.abort(e);
                Err(failed(&self.renames, e.to_string()))
            }
        }
    }

    fn snapshot_all(&self, scope: &mut BackupScope) -> Result<()> {
        scope.snapshot(&self.index_path)?;
        for edit in &self.recipe_edits {
            scope.snapshot(&edit.path)?;
        }
        for mv in &self.moves {
            match mv {
                FileMove::Delete(path) => scope.snapshot(path)?,
                FileMove::Rename { from, .. } => scope.snapshot(from)?,
            };
        }
        Ok(())
    }

    fn write_all(&self, scope: &mut BackupScope) -> Result<()> {
        for mv in &self.moves {
            match mv {
                FileMove::Delete(path) => {
                    fs::remove_file(path)?;
                    info!(file = %path.display(), "deleted");
                }
                FileMove::Rename { from, to } => {
                    scope.track_created(to);
                    fs::rename(from, to)?;
                    info!(from = %from.display(), to = %to.display(), "renamed");
                }
            }
        }
        for edit in &self.recipe_edits {
            fs::write(&edit.path, &edit.after).map_err(|source| ContentError::Write {
                path: edit.path.clone(),
                source,
            })?;
        }
        self.registry.save(&self.index_path)
    }
}

fn failed(renames: &[SlugRename], reason: String) -> ContentError {
    ContentError::RenameFailed {
        old: renames.iter().map(|r| r.old.as_str()).collect::<Vec<_>>().join(", "),
        new: renames.iter().map(|r| r.new.as_str()).collect::<Vec<_>>().join(", "),
        reason,
    }
}

/// A `<stem>_new.tres` file and what it replaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub new_file: PathBuf,
    /// The `<stem>.tres` sibling, if it exists
    pub old_file: Option<PathBuf>,
    pub new_stem: String,
    pub clean_name: String,
}

impl Migration {
    pub fn target(&self) -> PathBuf {
        self.new_file.with_file_name(format!("{}.tres", self.clean_name))
    }
}

/// `grapes_new` -> `grapes`. Only a trailing suffix counts.
pub fn clean_name(stem: &str) -> Option<&str> {
    stem.strip_suffix(NEW_SUFFIX).filter(|s| !s.is_empty())
}

/// Find every `_new` item below `items_dir`
pub fn find_migrations(items_dir: &Path) -> Result<Vec<Migration>> {
    let mut skipped = Vec::new();
    let migrations: Vec<Migration> = record::record_files(items_dir, &mut skipped)?
        .into_iter()
        .filter_map(|new_file| {
            let new_stem = new_file.file_stem()?.to_string_lossy().into_owned();
            let clean = clean_name(&new_stem)?.to_string();
            let old = new_file.with_file_name(format!("{clean}.tres"));
            Some(Migration {
                old_file: old.exists().then_some(old),
                new_file,
                new_stem,
                clean_name: clean,
            })
        })
        .collect();
    info!(count = migrations.len(), "found items with _new suffix");
    Ok(migrations)
}

/// Summary of a migration run
#[derive(Debug, Clone, Default)]
pub struct MigrationSummary {
    pub migrations: Vec<Migration>,
    pub outcome: Option<RenameOutcome>,
    /// Filled on dry runs
    pub preview: Option<String>,
}

/// Replace every old item with its `_new` version and rename the slug
/// everywhere
pub fn migrate_items(config: &ContentConfig, dry_run: bool) -> Result<MigrationSummary> {
    let migrations = find_migrations(&config.paths.items_dir())?;
    let mut summary = MigrationSummary {
        migrations,
        ..Default::default()
    };
    if summary.migrations.is_empty() {
        return Ok(summary);
    }

    let mut renames = Vec::new();
    let mut moves = Vec::new();
    for m in &summary.migrations {
        renames.push(SlugRename {
            old: m.new_stem.clone(),
            new: m.clean_name.clone(),
            replace_existing: m.old_file.is_some(),
        });
        if let Some(old) = &m.old_file {
            moves.push(FileMove::Delete(old.clone()));
        }
        moves.push(FileMove::Rename {
            from: m.new_file.clone(),
            to: m.target(),
        });
    }

    let plan = RenamePlan::build(&config.items_index_path(), &config.paths.recipes_dir(), renames)?
        .with_moves(moves);

    if dry_run {
        summary.preview = Some(plan.preview());
        return Ok(summary);
    }

    let mut scope = BackupScope::begin(&config.paths.backup_dir(), &config.paths.root, "migrate_items")?;
    summary.outcome = Some(plan.commit(&mut scope)?);
    Ok(summary)
}

/// Result of a single-slug rename
#[derive(Debug, Clone, Default)]
pub struct RenameSummary {
    pub registry_entries: usize,
    pub recipes: Vec<PathBuf>,
    /// Filled on dry runs
    pub preview: Option<String>,
    pub outcome: Option<RenameOutcome>,
}

/// Rename one slug in the items registry and across the recipe tree
pub fn rename_slug(config: &ContentConfig, old: &str, new: &str, dry_run: bool) -> Result<RenameSummary> {
    let plan = RenamePlan::build(
        &config.items_index_path(),
        &config.paths.recipes_dir(),
        vec![SlugRename::new(old, new)],
    )?;
    let mut summary = RenameSummary {
        registry_entries: plan.registry_entries,
        recipes: plan.recipe_edits.iter().map(|e| e.path.clone()).collect(),
        ..Default::default()
    };
    if dry_run {
        summary.preview = Some(plan.preview());
        return Ok(summary);
    }
    if plan.is_empty() {
        info!(old, "nothing references this slug");
        return Ok(summary);
    }

    let mut scope = BackupScope::begin(&config.paths.backup_dir(), &config.paths.root, "rename_slug")?;
    summary.outcome = Some(plan.commit(&mut scope)?);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name_strips_trailing_suffix_only() {
        assert_eq!(clean_name("grapes_new"), Some("grapes"));
        assert_eq!(clean_name("new_grapes_new"), Some("new_grapes"));
        assert_eq!(clean_name("grapes_newer"), None);
        assert_eq!(clean_name("_new"), None);
    }

    #[test]
    fn test_rename_in_recipe_exact_token() {
        let text = "\
input_1_slug = &\"grapes_new\"
input_1_quantity = 2
input_2_slug = &\"grapes_new_wine\"
output_1_slug = &\"grapes_new\"
description = \"made from grapes_new\"
";
        let (out, n) = rename_in_recipe(text, &slot_pattern("grapes_new").unwrap(), "grapes");
        assert_eq!(n, 2);
        assert!(out.contains("input_1_slug = &\"grapes\"\n"));
        assert!(out.contains("output_1_slug = &\"grapes\"\n"));
        assert!(out.contains("input_2_slug = &\"grapes_new_wine\"\n"));
        assert!(out.contains("description = \"made from grapes_new\"\n"));
    }

    #[test]
    fn test_slug_is_escaped() {
        let (out, n) = rename_in_recipe("input_1_slug = &\"axxb\"\n", &slot_pattern("a.b").unwrap(), "c");
        assert_eq!(n, 0);
        assert_eq!(out, "input_1_slug = &\"axxb\"\n");
    }
}
