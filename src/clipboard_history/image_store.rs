//! File storage for captured images
//!
//! Images live as files in one directory, named by the SHA-256 of their bytes
//! (`<hash>.<ext>`), so importing the same image twice reuses the same file.
//! History entries only hold the resulting path; the store never decodes
//! image data.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::database::Store;

const DEFAULT_EXTENSION: &str = "png";

/// Compute SHA-256 hash of image bytes (hex-encoded)
pub fn compute_image_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Open the image directory, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create image directory {}", dir.display()))?;
        // Canonical so stored references compare equal however the dir was spelled
        let dir = dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve image directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `bytes` and return the file path to record as the entry's image reference.
    pub fn import_bytes(&self, bytes: &[u8], extension: &str) -> Result<PathBuf> {
        let hash = compute_image_hash(bytes);
        let extension = normalize_extension(extension);
        let path = self.dir.join(format!("{hash}.{extension}"));

        // Content-addressed: an existing file already holds these bytes
        if path.exists() {
            debug!(hash = %hash, "Image already stored, skipping write");
        } else {
            fs::write(&path, bytes)
                .with_context(|| format!("Failed to write image to {}", path.display()))?;
            debug!(hash = %hash, size = bytes.len(), "Stored new image");
        }

        Ok(path)
    }

    /// Copy an image file into the store, keeping its extension.
    pub fn import_file(&self, source: impl AsRef<Path>) -> Result<PathBuf> {
        let source = source.as_ref();
        let bytes = fs::read(source)
            .with_context(|| format!("Failed to read image file {}", source.display()))?;
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(DEFAULT_EXTENSION);
        self.import_bytes(&bytes, extension)
    }

    /// Whether `image_ref` names a file directly inside this store's directory.
    fn contains(&self, image_ref: &str) -> bool {
        let path = Path::new(image_ref);
        if path.file_name().is_none() {
            return false;
        }
        path.parent()
            .and_then(|parent| parent.canonicalize().ok())
            .is_some_and(|parent| parent == self.dir)
    }

    /// Delete a stored image once no history entry points at it.
    ///
    /// Files are shared between entries with identical bytes, so this is called
    /// after the entry itself has been deleted. Returns `true` if a file was removed.
    /// References outside the image directory are never touched.
    pub fn remove_if_unreferenced(&self, store: &Store, image_ref: &str) -> Result<bool> {
        if !self.contains(image_ref) {
            debug!(path = %image_ref, "Image not managed by this store, leaving it");
            return Ok(false);
        }

        let remaining = store
            .image_ref_count(image_ref)
            .context("Failed to count image references")?;
        if remaining > 0 {
            debug!(path = %image_ref, remaining, "Image still referenced, keeping file");
            return Ok(false);
        }

        self.remove(image_ref)
    }

    /// Delete a stored image. Returns `false` if it was already gone.
    ///
    /// # Errors
    /// Refuses paths outside the image directory.
    fn remove(&self, image_ref: &str) -> Result<bool> {
        if !self.contains(image_ref) {
            bail!(
                "Refusing to remove {image_ref}: not inside image directory {}",
                self.dir.display()
            );
        }

        match fs::remove_file(image_ref) {
            Ok(()) => {
                debug!(path = %image_ref, "Deleted image file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %image_ref, "Image file not found, nothing to delete");
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete image {image_ref}")),
        }
    }

    /// Delete every file in the image directory that no entry references.
    ///
    /// `referenced` holds image references as stored on entries.
    pub fn gc_orphans(&self, referenced: &HashSet<String>) -> Result<usize> {
        let entries = fs::read_dir(&self.dir).context("Failed to read image directory")?;
        let mut deleted = 0;

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(as_ref) = path.to_str() else {
                continue;
            };
            if referenced.contains(as_ref) {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %as_ref, "GC'd orphaned image");
                    deleted += 1;
                }
                Err(e) => warn!(path = %as_ref, error = %e, "Failed to remove orphaned image"),
            }
        }

        if deleted > 0 {
            info!(deleted, "Garbage collected orphaned images");
        }
        Ok(deleted)
    }
}

fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim_start_matches('.');
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        DEFAULT_EXTENSION.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}
