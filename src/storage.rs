//! Local folders for uploaded exports and generated documents.

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use sanitize_filename::sanitize;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Name the generated document is stored and served under.
pub const ARTIFACT_NAME: &str = "certificates.pdf";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    upload_dir: PathBuf,
    gen_dir: PathBuf,
}

/// An upload written to disk. The file is removed when this is dropped.
#[derive(Debug)]
pub struct StoredUpload {
    path: PathBuf,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                log::warn!("Failed to remove upload {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Files removed by [`LocalStorage::purge`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub uploads: usize,
    pub artifacts: usize,
}

impl LocalStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, gen_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            gen_dir: gen_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn gen_dir(&self) -> &Path {
        &self.gen_dir
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.upload_dir)?;
        fs::create_dir_all(&self.gen_dir)
    }

    /// Store an upload under a unique, sanitized name.
    pub fn save_upload(&self, original_name: &str, bytes: &[u8]) -> io::Result<StoredUpload> {
        fs::create_dir_all(&self.upload_dir)?;
        let name = format!("{}_{}", Uuid::new_v4(), sanitize(original_name));
        let path = self.upload_dir.join(name);
        fs::write(&path, bytes)?;
        log::debug!("Stored upload '{}' at {}", original_name, path.display());
        Ok(StoredUpload { path })
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.gen_dir.join(sanitize(name))
    }

    /// Write a generated document. Readers see either the previous file or
    /// the complete new one.
    pub fn write_artifact(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.gen_dir)?;
        let path = self.artifact_path(name);
        let mut temp = NamedTempFile::new_in(&self.gen_dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| e.error)?;
        log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Delete every file in the upload and generation folders.
    pub fn purge(&self) -> io::Result<PurgeReport> {
        Ok(PurgeReport {
            uploads: clear_dir(&self.upload_dir)?,
            artifacts: clear_dir(&self.gen_dir)?,
        })
    }
}

fn clear_dir(dir: &Path) -> io::Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    log::info!("Removed {} file(s) from {}", removed, dir.display());
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads"), dir.path().join("gens"));
        (dir, storage)
    }

    #[test]
    fn test_upload_is_removed_on_drop() {
        let (_dir, storage) = storage();
        let upload = storage.save_upload("../../MS6 export.xlsx", b"bytes").unwrap();
        let path = upload.path().to_path_buf();

        assert!(path.starts_with(storage.upload_dir()));
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("MS6 export.xlsx"));
        assert_eq!(upload.read().unwrap(), b"bytes");

        drop(upload);
        assert!(!path.exists());
    }

    #[test]
    fn test_artifact_write_replaces_previous_file() {
        let (_dir, storage) = storage();
        storage.write_artifact(ARTIFACT_NAME, b"first").unwrap();
        let path = storage.write_artifact(ARTIFACT_NAME, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(fs::read_dir(storage.gen_dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_purge_counts_removed_files() {
        let (_dir, storage) = storage();
        assert_eq!(storage.purge().unwrap(), PurgeReport::default());

        storage.ensure_dirs().unwrap();
        fs::write(storage.upload_dir().join("left-over.xlsx"), b"x").unwrap();
        storage.write_artifact(ARTIFACT_NAME, b"pdf").unwrap();

        let report = storage.purge().unwrap();
        assert_eq!(report, PurgeReport { uploads: 1, artifacts: 1 });
        assert_eq!(fs::read_dir(storage.gen_dir()).unwrap().count(), 0);
    }
}
