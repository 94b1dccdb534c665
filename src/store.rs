//! Artifact store: URL paths over a sharded directory tree.
//!
//! Every upload gets its own container directory (see [`address`](crate::address)).
//! Derived variants are siblings of `source.jpeg`, named by their canonical
//! recipe. A variant starts life as a zero-byte placeholder and is rendered
//! by the first read:
//!
//! ```text
//! absent ──reserve──▶ placeholder ──read──▶ materialized
//!                          ▲                     │
//!                          └───────reserve───────┘
//! ```
//!
//! ## Materialization
//!
//! A read of a zero-byte, non-reserved file takes the per-path lock, checks
//! the size again (another reader may have rendered it meanwhile), re-parses
//! the filename, loads the sibling source and renders it. The output goes to
//! a hidden sibling (`.<name>.tmp`) that is then renamed over the placeholder,
//! so a reader sees either the empty placeholder or the complete rendering.
//! Concurrent readers of one placeholder therefore render it once.
//!
//! Failures are masked as [`StoreError::NotFound`] and logged. A placeholder
//! whose name no longer parses is corrupt and is deleted; any other failure
//! leaves the placeholder in place for a later retry.
//!
//! Deleting a variant takes the same lock, so a render never resurrects a
//! file deleted while it ran. A read that races a container delete finds the
//! directory gone and reports NotFound.

use crate::address::{AddressAllocator, AllocationError};
use crate::config::{ImagesConfig, StorageConfig};
use crate::imaging::{
    BackendError, DEFAULT_MAX_PIXELS, ImageBackend, Quality, RustBackend, encode, render,
};
use crate::naming::{
    Grammar, METADATA_FILENAME, ParseError, SOURCE_FILENAME, canonical_name, is_reserved,
};
use crate::types::OutputFormat;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("is a directory: {0}")]
    Forbidden(String),
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("allocation failed: {0}")]
    Allocation(#[from] AllocationError),
    #[error("render failed: {0}")]
    Render(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A file served from the store.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    /// File mtime, or the render time for a freshly materialized variant.
    pub modified: SystemTime,
    pub content_type: &'static str,
}

/// MIME type for a stored file, chosen by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jpeg" | "jpg") => "image/jpeg",
        Some("png") => "image/png",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// On-demand advisory locks keyed by filesystem path.
#[derive(Debug, Default)]
struct PathLocks {
    map: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl PathLocks {
    fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self.map.entry(path.to_path_buf()).or_default().clone();
        let result = {
            let _guard = lock.lock();
            f()
        };
        drop(lock);
        self.map
            .remove_if(path, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map.len()
    }
}

/// The image store rooted at one directory.
pub struct Store<B: ImageBackend = RustBackend> {
    root: PathBuf,
    grammar: Grammar,
    allocator: AddressAllocator,
    source_quality: Quality,
    max_pixels: u64,
    backend: B,
    locks: PathLocks,
}

impl Store<RustBackend> {
    /// Build a store from the `[storage]` and `[images]` config tables.
    pub fn from_config(storage: &StorageConfig, images: &ImagesConfig) -> Self {
        Self::with_backend(storage.root.clone(), RustBackend::new())
            .with_allocator(storage.allocator())
            .with_source_quality(Quality::new(images.source_quality))
            .with_max_pixels(images.max_pixels)
    }
}

impl<B: ImageBackend> Store<B> {
    pub fn with_backend(root: impl Into<PathBuf>, backend: B) -> Self {
        Self {
            root: root.into(),
            grammar: Grammar::new(),
            allocator: AddressAllocator::default(),
            source_quality: Quality::new(ImagesConfig::default().source_quality),
            max_pixels: DEFAULT_MAX_PIXELS,
            backend,
            locks: PathLocks::default(),
        }
    }

    pub fn with_allocator(mut self, allocator: AddressAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_source_quality(mut self, quality: Quality) -> Self {
        self.source_quality = quality;
        self
    }

    /// Cap on the pixel area of any buffer a render allocates.
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Map a URL path onto the filesystem under the root.
    ///
    /// Only plain name components are accepted; `..` and absolute components
    /// are rejected. The empty path maps to the root itself.
    pub fn resolve(&self, url: &str) -> Result<PathBuf, StoreError> {
        let mut path = self.root.clone();
        for component in Path::new(url.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(StoreError::InvalidPath(url.to_string())),
            }
        }
        Ok(path)
    }

    /// URL path of a file under the root, with a leading `/`.
    pub fn url_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("/{}", parts.join("/"))
    }

    // -------------------------------------------------------------------------
    // Upload
    // -------------------------------------------------------------------------

    /// Store an upload as the source image of a new container.
    ///
    /// The bytes are decoded and re-encoded as JPEG before a container is
    /// claimed, so a rejected upload leaves nothing behind.
    pub fn put(&self, bytes: &[u8]) -> Result<String, StoreError> {
        if bytes.is_empty() {
            return Err(StoreError::InvalidImage("empty upload".into()));
        }
        let image = self
            .backend
            .decode(bytes)
            .map_err(|e| StoreError::InvalidImage(e.to_string()))?;

        let mut encoded = Vec::new();
        let format = OutputFormat::Jpeg {
            quality: self.source_quality,
        };
        encode(&self.backend, &image, format, &mut encoded)?;

        let mut allocation = self.allocator.allocate(&self.root).inspect_err(|e| {
            if let AllocationError::Exhausted(attempts) = e {
                tracing::error!(attempts = *attempts, "address space exhausted");
            }
        })?;
        if let Err(e) = allocation.file.write_all(&encoded) {
            let _ = fs::remove_file(&allocation.source_path);
            return Err(e.into());
        }

        let url = self.url_for(&allocation.source_path);
        tracing::info!(path = %url, bytes = encoded.len(), "stored upload");
        Ok(url)
    }

    // -------------------------------------------------------------------------
    // Reservation and metadata
    // -------------------------------------------------------------------------

    /// Reserve a placeholder for `segment` in the container of `url`.
    ///
    /// `url` names any file in the container, usually its source. The segment
    /// is parsed before anything touches the disk. An existing variant of the
    /// same recipe is reset to an empty placeholder.
    pub fn reserve(&self, url: &str, segment: &str) -> Result<String, StoreError> {
        let recipe = self.grammar.parse(segment)?;
        let name = canonical_name(&recipe);
        if is_reserved(&name) {
            return Err(StoreError::InvalidPath(name));
        }

        let container = self.container_of(url)?;
        let placeholder = container.join(name);
        self.locks
            .with_lock(&placeholder, || replace_file(&placeholder, b""))?;

        let variant_url = self.url_for(&placeholder);
        tracing::debug!(path = %variant_url, "reserved placeholder");
        Ok(variant_url)
    }

    /// Overwrite the metadata sidecar of the container of `url`.
    pub fn write_metadata(&self, url: &str, text: &str) -> Result<String, StoreError> {
        let path = self.container_of(url)?.join(METADATA_FILENAME);
        self.locks
            .with_lock(&path, || replace_file(&path, text.as_bytes()))?;
        Ok(self.url_for(&path))
    }

    /// Container directory of a URL: the parent of the named file, which
    /// must hold a source image.
    fn container_of(&self, url: &str) -> Result<PathBuf, StoreError> {
        let path = self.resolve(url)?;
        let container = match path.parent() {
            Some(parent) if path != self.root => parent.to_path_buf(),
            _ => return Err(StoreError::InvalidPath(url.to_string())),
        };
        if !container.join(SOURCE_FILENAME).is_file() {
            return Err(StoreError::NotFound(url.to_string()));
        }
        Ok(container)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Read a file, rendering it first if it is a placeholder.
    pub fn read(&self, url: &str) -> Result<Artifact, StoreError> {
        let path = self.resolve(url)?;
        let meta = fs::metadata(&path).map_err(|e| missing(e, url))?;
        if meta.is_dir() {
            return Err(StoreError::Forbidden(url.to_string()));
        }
        if meta.len() > 0 || is_reserved(file_name(&path).unwrap_or_default()) {
            return read_file(&path, url);
        }
        self.materialize(&path, url)
    }

    fn materialize(&self, path: &Path, url: &str) -> Result<Artifact, StoreError> {
        self.locks.with_lock(path, || {
            let meta = fs::metadata(path).map_err(|e| missing(e, url))?;
            if meta.len() > 0 {
                return read_file(path, url);
            }

            let bytes = match self.render_placeholder(path) {
                Ok(bytes) => bytes,
                Err(StoreError::Parse(e)) => {
                    tracing::warn!(path = %url, error = %e, "removing corrupt placeholder");
                    if let Err(e) = fs::remove_file(path)
                        && e.kind() != io::ErrorKind::NotFound
                    {
                        tracing::warn!(path = %url, error = %e, "could not remove placeholder");
                    }
                    return Err(StoreError::NotFound(url.to_string()));
                }
                Err(e) => {
                    tracing::warn!(path = %url, error = %e, "materialization failed");
                    return Err(StoreError::NotFound(url.to_string()));
                }
            };

            replace_file(path, &bytes).map_err(|e| missing(e, url))?;

            tracing::debug!(path = %url, bytes = bytes.len(), "materialized variant");
            Ok(Artifact {
                bytes,
                modified: SystemTime::now(),
                content_type: content_type_for(path),
            })
        })
    }

    fn render_placeholder(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        let name = file_name(path).ok_or_else(|| ParseError::Unparseable(String::new()))?;
        let recipe = self.grammar.parse(name)?;
        let source = self.backend.load(&path.with_file_name(SOURCE_FILENAME))?;
        Ok(render(&self.backend, &source, &recipe, self.max_pixels)?)
    }

    // -------------------------------------------------------------------------
    // Deletion
    // -------------------------------------------------------------------------

    /// Delete a file. Deleting a source removes its whole container.
    pub fn delete(&self, url: &str) -> Result<(), StoreError> {
        let path = self.resolve(url)?;
        let meta = fs::metadata(&path).map_err(|e| missing(e, url))?;
        if meta.is_dir() {
            return Err(StoreError::Forbidden(url.to_string()));
        }

        if file_name(&path) == Some(SOURCE_FILENAME)
            && let Some(container) = path.parent()
        {
            fs::remove_dir_all(container).map_err(|e| missing(e, url))?;
            tracing::info!(path = %url, "deleted container");
        } else {
            self.locks
                .with_lock(&path, || fs::remove_file(&path))
                .map_err(|e| missing(e, url))?;
            tracing::debug!(path = %url, "deleted file");
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Write `bytes` to a hidden sibling of `path` and rename it into place.
///
/// Callers hold the path lock. Fails with NotFound when the container is gone.
fn replace_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_file_name(format!(".{}.tmp", file_name(path).unwrap_or_default()));
    let result = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)
        .and_then(|mut file| file.write_all(bytes))
        .and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn read_file(path: &Path, url: &str) -> Result<Artifact, StoreError> {
    let bytes = fs::read(path).map_err(|e| missing(e, url))?;
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or_else(|_| SystemTime::now());
    Ok(Artifact {
        bytes,
        modified,
        content_type: content_type_for(path),
    })
}

/// Map an I/O "not found" onto the store's NotFound, keeping other errors.
fn missing(e: io::Error, url: &str) -> StoreError {
    if e.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(url.to_string())
    } else {
        StoreError::Io(e)
    }
}
