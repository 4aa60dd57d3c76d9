//! Module: Export
//! But: Materialises the JSON backup as a user-visible file.
//!
//! *Signed: kryon.kas*

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, WalletError};

/// `wallet-<epoch-millis>.json`
pub fn export_file_name(epoch_millis: i64) -> String {
    format!("wallet-{epoch_millis}.json")
}

/// Destination for a named JSON document.
pub trait ExportSink {
    /// Stores `contents` under `file_name` and returns where it landed.
    fn save(&self, file_name: &str, contents: &str) -> Result<PathBuf>;
}

/// Writes backups into a directory, creating it when missing.
///
/// Existing files are never overwritten. On Unix the file is readable by
/// its owner only.
#[derive(Debug, Clone)]
pub struct DirectoryExport {
    dir: PathBuf,
}

impl DirectoryExport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for DirectoryExport {
    fn save(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            WalletError::export(format!("cannot create {}: {e}", self.dir.display()))
        })?;

        let path = self.dir.join(file_name);
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&path)
            .map_err(|e| WalletError::export(format!("cannot create {}: {e}", path.display())))?;
        let written = file
            .write_all(contents.as_bytes())
            .and_then(|()| file.sync_all());
        drop(file);
        discard_on_error(&path, written)?;

        info!(path = %path.display(), "backup written");
        Ok(path)
    }
}

/// A half-written backup still holds key material; remove it on failure.
fn discard_on_error(path: &Path, written: io::Result<()>) -> Result<()> {
    written.map_err(|e| {
        if let Err(remove) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %remove, "cannot remove partial backup");
        }
        WalletError::export(format!("cannot write {}: {e}", path.display()))
    })
}
