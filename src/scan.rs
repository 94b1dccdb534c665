//! Offline inventory of a store root.
//!
//! Walks the directory tree and groups files by container, classifying every
//! derived variant by state. Nothing is rendered or modified; this is the
//! view an operator gets from `simple-img scan`.
//!
//! ## Layout
//!
//! ```text
//! store/
//! └── q/3/Z/k9Xv0cBmLr_2N8aYtWe1H/   # Container (token sharded by fan-out)
//!     ├── source.jpeg                 # Source image
//!     ├── metadata.txt                # Sidecar (optional)
//!     ├── scale-100x50.jpeg           # Materialized variant (non-empty)
//!     ├── crop-50x50-x0y0.png         # Pending variant (zero bytes)
//!     └── banana                      # Corrupt (name does not parse)
//! ```
//!
//! Any directory holding files is reported as a container, so stray files
//! outside a proper container show up with `has_source: false`.

use crate::naming::{Grammar, METADATA_FILENAME, SOURCE_FILENAME};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Store root does not exist: {0}")]
    MissingRoot(PathBuf),
}

/// Everything found under a store root.
#[derive(Debug, Serialize)]
pub struct Inventory {
    pub root: PathBuf,
    pub containers: Vec<Container>,
}

/// One container directory and its files.
#[derive(Debug, Serialize)]
pub struct Container {
    /// URL path of the directory, e.g. `/q/3/Z/k9Xv...`.
    pub path: String,
    pub has_source: bool,
    pub has_metadata: bool,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Variant {
    pub name: String,
    pub state: VariantState,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantState {
    /// Rendered and non-empty.
    Materialized,
    /// Zero-byte placeholder awaiting its first read.
    Pending,
    /// Name does not parse; the next read deletes it.
    Corrupt,
}

impl Inventory {
    /// Number of variants in the given state, across all containers.
    pub fn count(&self, state: VariantState) -> usize {
        self.containers
            .iter()
            .flat_map(|c| &c.variants)
            .filter(|v| v.state == state)
            .count()
    }
}

/// Scan a store root. Containers and variants are sorted by path and name.
pub fn scan(root: &Path) -> Result<Inventory, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }
    let grammar = Grammar::new();
    let mut containers: BTreeMap<PathBuf, Container> = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let container = containers
            .entry(dir.to_path_buf())
            .or_insert_with(|| Container {
                path: url_path(root, dir),
                has_source: false,
                has_metadata: false,
                variants: Vec::new(),
            });

        let name = entry.file_name().to_string_lossy().into_owned();
        match name.as_str() {
            SOURCE_FILENAME => container.has_source = true,
            METADATA_FILENAME => container.has_metadata = true,
            _ => {
                let bytes = entry.metadata()?.len();
                container.variants.push(Variant {
                    state: classify(&grammar, &name, bytes),
                    name,
                    bytes,
                });
            }
        }
    }

    Ok(Inventory {
        root: root.to_path_buf(),
        containers: containers.into_values().collect(),
    })
}

fn classify(grammar: &Grammar, name: &str, bytes: u64) -> VariantState {
    match grammar.parse(name) {
        Err(_) => VariantState::Corrupt,
        Ok(_) if bytes == 0 => VariantState::Pending,
        Ok(_) => VariantState::Materialized,
    }
}

fn url_path(root: &Path, dir: &Path) -> String {
    let relative = dir.strip_prefix(root).unwrap_or(dir);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", parts.join("/"))
}
