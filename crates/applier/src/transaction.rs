//! Transactional patch application with backup/restore.
//!
//! ## Workflow
//! 1. `FixTransaction::new(project_root)` initialises the backup directory.
//! 2. `apply_patches(file, patches)` backs up the file on first touch, then
//!    applies every patch for that file in one pass (bottom-to-top, via
//!    [`common::patch::apply_all`]).
//! 3. `commit()` on success removes the backups.
//! 4. `restore_all()` on failure copies every backup back to its original path;
//!    `rollback()` does that and then drops the backups.

use crate::ApplyError;
use common::Patch;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Transactional file editor that backs up files before modifying them.
///
/// Backup layout: `{project_root}/.enforcer/backup/{ts}_{n}_{filename}.bak`
pub struct FixTransaction {
    backup_dir: PathBuf,
    /// `original_path → backup_path`
    backups: BTreeMap<PathBuf, PathBuf>,
}

impl FixTransaction {
    /// Creates (or reuses) the backup directory under `project_root/.enforcer/backup`.
    pub fn new(project_root: &Path) -> Result<Self, ApplyError> {
        let backup_dir = project_root.join(".enforcer").join("backup");
        std::fs::create_dir_all(&backup_dir)?;
        Ok(Self {
            backup_dir,
            backups: BTreeMap::new(),
        })
    }

    /// Backs up `file_path` (if not already done), then applies `patches`.
    ///
    /// All patches for one file must be passed together: each one's offsets
    /// refer to the file as it was before any of them applied. Nothing is
    /// written if any patch is rejected.
    ///
    /// Returns the new file content.
    pub fn apply_patches(&mut self, file_path: &Path, patches: &[Patch]) -> Result<String, ApplyError> {
        let content = std::fs::read_to_string(file_path)?;
        if patches.is_empty() {
            return Ok(content);
        }

        let patched =
            common::patch::apply_all(&content, patches).map_err(|source| ApplyError::Patch {
                path: file_path.display().to_string(),
                source,
            })?;

        self.ensure_backup(file_path)?;
        std::fs::write(file_path, &patched)?;
        debug!(path = %file_path.display(), patches = patches.len(), "patched");
        Ok(patched)
    }

    /// Copies all backup files back to their original paths.
    pub fn restore_all(&self) -> Result<(), ApplyError> {
        for (original, backup) in &self.backups {
            std::fs::copy(backup, original)?;
        }
        info!(files = self.backups.len(), "restored backups");
        Ok(())
    }

    /// Restores a single file from its backup. Returns `false` if the file
    /// was never touched by this transaction.
    pub fn restore(&self, file_path: &Path) -> Result<bool, ApplyError> {
        match self.backups.get(file_path) {
            Some(backup) => {
                std::fs::copy(backup, file_path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deletes all backup files after a successful transaction.
    pub fn commit(self) -> Result<(), ApplyError> {
        for backup in self.backups.values() {
            std::fs::remove_file(backup).ok();
        }
        // Only succeeds when no other run left backups behind.
        std::fs::remove_dir(&self.backup_dir).ok();
        Ok(())
    }

    /// Restores every touched file, then removes the backups.
    pub fn rollback(self) -> Result<(), ApplyError> {
        self.restore_all()?;
        self.commit()
    }

    fn ensure_backup(&mut self, file_path: &Path) -> Result<(), ApplyError> {
        if !self.backups.contains_key(file_path) {
            let bak = self.backup_file(file_path)?;
            self.backups.insert(file_path.to_path_buf(), bak);
        }
        Ok(())
    }

    fn backup_file(&self, file_path: &Path) -> Result<PathBuf, ApplyError> {
        let filename = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let bak_path = self
            .backup_dir
            .join(format!("{}_{}_{}.bak", ts, self.backups.len(), filename));
        std::fs::copy(file_path, &bak_path)?;
        Ok(bak_path)
    }
}
