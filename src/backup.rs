//! Backups for destructive operations
//!
//! Every command that rewrites, renames or deletes content opens a
//! [`BackupScope`] first. The scope owns one directory,
//! `<backups>/<operation>_<YYYYmmdd_HHMMSS>`, and each file is copied there
//! (keeping its project-relative path) before it is touched. The same scope
//! can roll the project back if a later step fails.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{ContentError, Result};
use crate::record;

/// A file saved before mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub original: PathBuf,
    pub backup: PathBuf,
}

/// Snapshot-then-mutate wrapper around one destructive operation
#[derive(Debug)]
pub struct BackupScope {
    dir: PathBuf,
    project_root: PathBuf,
    snapshots: Vec<Snapshot>,
    created: Vec<PathBuf>,
}

impl BackupScope {
    /// Open a scope named after `operation`, stamped with the current time
    pub fn begin(backup_root: &Path, project_root: &Path, operation: &str) -> Result<Self> {
        Self::begin_at(backup_root, project_root, operation, Utc::now())
    }

    pub fn begin_at(
        backup_root: &Path,
        project_root: &Path,
        operation: &str,
        at: DateTime<Utc>,
    ) -> Result<Self> {
        let base = format!("{operation}_{}", at.format("%Y%m%d_%H%M%S"));
        let mut dir = backup_root.join(&base);
        let mut n = 2;
        while dir.exists() {
            dir = backup_root.join(format!("{base}_{n}"));
            n += 1;
        }
        fs::create_dir_all(&dir).map_err(|source| ContentError::Backup {
            path: dir.clone(),
            source,
        })?;
        info!(dir = %dir.display(), "opened backup scope");

        Ok(Self {
            dir,
            project_root: project_root.to_path_buf(),
            snapshots: Vec::new(),
            created: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Copy `file` into the scope before it is modified. Snapshotting the
    /// same file twice keeps the first copy.
    pub fn snapshot(&mut self, file: &Path) -> Result<PathBuf> {
        if let Some(existing) = self.snapshots.iter().find(|s| s.original == file) {
            return Ok(existing.backup.clone());
        }

        let relative = file
            .strip_prefix(&self.project_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(file.file_name().unwrap_or_default()));
        let backup = self.dir.join(relative);
        let copy = || -> std::io::Result<()> {
            if let Some(parent) = backup.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(file, &backup)?;
            Ok(())
        };
        copy().map_err(|source| ContentError::Backup {
            path: file.to_path_buf(),
            source,
        })?;

        debug!(file = %file.display(), backup = %backup.display(), "backed up");
        self.snapshots.push(Snapshot {
            original: file.to_path_buf(),
            backup: backup.clone(),
        });
        Ok(backup)
    }

    /// Record a file the operation creates, so rollback can remove it
    pub fn track_created(&mut self, file: &Path) {
        self.created.push(file.to_path_buf());
    }

    /// Put every snapshotted file back and remove created files.
    ///
    /// Keeps going past individual failures and reports the first one.
    pub fn rollback(&self) -> Result<()> {
        let mut first_error = None;

        for file in &self.created {
            if file.exists() && !self.snapshots.iter().any(|s| &s.original == file) {
                if let Err(e) = fs::remove_file(file) {
                    warn!(file = %file.display(), error = %e, "rollback could not remove file");
                    first_error.get_or_insert(ContentError::Write {
                        path: file.clone(),
                        source: e,
                    });
                }
            }
        }

        for snap in &self.snapshots {
            if let Err(e) = fs::copy(&snap.backup, &snap.original) {
                warn!(file = %snap.original.display(), error = %e, "rollback could not restore file");
                first_error.get_or_insert(ContentError::Write {
                    path: snap.original.clone(),
                    source: e,
                });
            }
        }

        info!(restored = self.snapshots.len(), "rolled back");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Roll back after `error` and hand `error` back. A failed rollback is
    /// logged and never replaces the error that caused it.
    pub fn abort(&self, error: ContentError) -> ContentError {
        if let Err(rollback) = self.rollback() {
            warn!(error = %rollback, "rollback incomplete");
        }
        error
    }
}

/// Copy every `.tres` file under `backup_dir` into `target_dir`, keeping
/// relative paths. Returns the restored target paths.
pub fn restore_tree(backup_dir: &Path, target_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut skipped = Vec::new();
    let mut restored = Vec::new();
    for path in record::record_files(backup_dir, &mut skipped)? {
        let path = path.as_path();
        let Ok(relative) = path.strip_prefix(backup_dir) else {
            continue;
        };
        let target = target_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &target).map_err(|source| ContentError::Write {
            path: target.clone(),
            source,
        })?;
        restored.push(target);

        if restored.len() % 10 == 0 {
            info!(restored = restored.len(), "restoring");
        }
    }

    info!(restored = restored.len(), from = %backup_dir.display(), "restore complete");
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_scope_dir_from_operation_and_time() {
        let dir = tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2025, 10, 12, 11, 36, 8).unwrap();
        let scope = BackupScope::begin_at(&dir.path().join("backups"), dir.path(), "migrate", at).unwrap();
        assert_eq!(scope.dir(), dir.path().join("backups/migrate_20251012_113608"));

        let second = BackupScope::begin_at(&dir.path().join("backups"), dir.path(), "migrate", at).unwrap();
        assert_eq!(second.dir(), dir.path().join("backups/migrate_20251012_113608_2"));
    }

    #[test]
    fn test_snapshot_then_rollback() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("items/bread.tres");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "original").unwrap();

        let mut scope = BackupScope::begin(&dir.path().join("backups"), dir.path(), "edit").unwrap();
        let backup = scope.snapshot(&file).unwrap();
        assert!(backup.ends_with("items/bread.tres"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "original");

        fs::write(&file, "changed").unwrap();
        assert_eq!(scope.snapshot(&file).unwrap(), backup);
        assert_eq!(fs::read_to_string(&backup).unwrap(), "original");

        let created = dir.path().join("items/new.tres");
        fs::write(&created, "new").unwrap();
        scope.track_created(&created);

        scope.rollback().unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "original");
        assert!(!created.exists());
    }

    #[test]
    fn test_abort_keeps_original_error_when_rollback_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("items/bread.tres");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "original").unwrap();

        let mut scope = BackupScope::begin(&dir.path().join("backups"), dir.path(), "edit").unwrap();
        let backup = scope.snapshot(&file).unwrap();
        fs::remove_file(&backup).unwrap();
        assert!(scope.rollback().is_err());

        let err = scope.abort(ContentError::DuplicateSlug("bread".to_string()));
        assert!(matches!(err, ContentError::DuplicateSlug(ref s) if s == "bread"));
    }

    #[test]
    fn test_restore_tree_keeps_layout() {
        let dir = tempdir().unwrap();
        let backup = dir.path().join("backup/recipes");
        fs::create_dir_all(backup.join("miner")).unwrap();
        fs::write(backup.join("miner/ingot_recipe.tres"), "ingot").unwrap();
        fs::write(backup.join("notes.md"), "skip").unwrap();

        let target = dir.path().join("recipes");
        let restored = restore_tree(&backup, &target).unwrap();
        assert_eq!(restored, vec![target.join("miner/ingot_recipe.tres")]);
        assert_eq!(fs::read_to_string(target.join("miner/ingot_recipe.tres")).unwrap(), "ingot");
        assert!(!target.join("notes.md").exists());
    }

    #[test]
    fn test_restore_missing_backup_fails() {
        let dir = tempdir().unwrap();
        assert!(restore_tree(&dir.path().join("nope"), dir.path()).is_err());
    }
}
