// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON file store with backup-on-write.
//!
//! Every save:
//! 1. Copies the current file to `<path>.backup` (failure is logged, not fatal)
//! 2. Writes the new document to `<path>.tmp`
//! 3. Renames the temp file over the main file
//!
//! If step 2 or 3 fails, the temp file is removed and the original error is
//! returned. The main file is restored from the backup only when this save's
//! backup succeeded; otherwise the backup may be older than the main file.
//! Readers never observe a half-written file.

use crate::db::{LedgerDocument, StoreError};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-backed store for the ledger document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    backup_path: PathBuf,
    tmp_path: PathBuf,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            backup_path: sibling(&path, ".backup"),
            tmp_path: sibling(&path, ".tmp"),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    /// Create an empty document if the file does not exist yet.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        match fs::metadata(&self.path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.write_atomic(&LedgerDocument::default()).await?;
                tracing::info!(path = %self.path.display(), "Initialized ledger data file");
                Ok(())
            }
            Err(source) => Err(StoreError::Read {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }

    /// Read the whole document. A missing file reads as an empty ledger.
    pub async fn load(&self) -> Result<LedgerDocument, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LedgerDocument::default()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        let mut doc: LedgerDocument =
            serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                path: self.path.display().to_string(),
                source,
            })?;
        doc.normalize();
        Ok(doc)
    }

    /// Write the whole document, backing up the previous contents first.
    pub async fn save(&self, doc: &LedgerDocument) -> Result<(), StoreError> {
        let backed_up = self.backup().await;

        if let Err(err) = self.write_atomic(doc).await {
            tracing::error!(
                path = %self.path.display(),
                error = %err,
                backed_up,
                "Ledger write failed"
            );
            self.remove_tmp().await;
            if backed_up {
                self.restore_from_backup().await;
            }
            return Err(err);
        }
        Ok(())
    }

    /// Copy the current file to the backup path. True if a fresh backup exists.
    async fn backup(&self) -> bool {
        match fs::copy(&self.path, &self.backup_path).await {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(
                    path = %self.backup_path.display(),
                    error = %e,
                    "Failed to back up ledger before write"
                );
                false
            }
        }
    }

    async fn remove_tmp(&self) {
        match fs::remove_file(&self.tmp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.tmp_path.display(),
                error = %e,
                "Failed to remove temp file"
            ),
        }
    }

    async fn restore_from_backup(&self) {
        match fs::copy(&self.backup_path, &self.path).await {
            Ok(_) => tracing::info!(path = %self.path.display(), "Ledger restored from backup"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("No ledger backup available to restore")
            }
            Err(e) => tracing::error!(error = %e, "Failed to restore ledger from backup"),
        }
    }

    async fn write_atomic(&self, doc: &LedgerDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(doc)?;
        let write_err = |source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        };

        fs::write(&self.tmp_path, json).await.map_err(write_err)?;
        fs::rename(&self.tmp_path, &self.path)
            .await
            .map_err(write_err)?;
        Ok(())
    }
}
