//! Server configuration module.
//!
//! Handles loading, validating, and merging `simple-img.toml`. Stock defaults
//! are overridden by the user's file, and command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! bind = "127.0.0.1:8080"        # Listen address
//! max_upload_bytes = 33554432    # Largest accepted upload body (32 MiB)
//!
//! [storage]
//! root = "store"                 # Directory holding every container
//! fan_out = 3                    # Single-character directory levels per token
//! token_bytes = 18               # Random bytes per container token
//! create_attempts = 10           # Retries on token collision
//!
//! [images]
//! source_quality = 75            # JPEG quality for re-encoded uploads (0-100)
//! max_pixels = 67108864          # Largest buffer a render may allocate (8192x8192)
//!
//! [processing]
//! max_workers = 4                # Blocking workers for I/O and renders (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [storage]
//! root = "/var/lib/simple-img"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::address::AddressAllocator;
use crate::imaging::DEFAULT_MAX_PIXELS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "simple-img.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration loaded from `simple-img.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listener settings.
    pub server: ListenConfig,
    /// Store layout (root directory, sharding, allocation retries).
    pub storage: StorageConfig,
    /// Upload re-encoding and render limits.
    pub images: ImagesConfig,
    /// Worker pool settings.
    pub processing: ProcessingConfig,
}

impl ServerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            )));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_upload_bytes must be non-zero".into(),
            ));
        }
        if self.storage.token_bytes < 6 {
            return Err(ConfigError::Validation(
                "storage.token_bytes must be at least 6".into(),
            ));
        }
        if self.storage.fan_out >= self.storage.allocator().token_len() {
            return Err(ConfigError::Validation(
                "storage.fan_out must be shorter than the encoded token".into(),
            ));
        }
        if self.storage.create_attempts == 0 {
            return Err(ConfigError::Validation(
                "storage.create_attempts must be at least 1".into(),
            ));
        }
        if self.images.source_quality > 100 {
            return Err(ConfigError::Validation(
                "images.source_quality must be 0-100".into(),
            ));
        }
        if self.images.max_pixels == 0 {
            return Err(ConfigError::Validation(
                "images.max_pixels must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Store layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding every container.
    pub root: PathBuf,
    /// Number of single-character directory levels per token.
    pub fan_out: usize,
    /// Random bytes per container token.
    pub token_bytes: usize,
    /// Allocation attempts before giving up on token collisions.
    pub create_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let alloc = AddressAllocator::default();
        Self {
            root: PathBuf::from("store"),
            fan_out: alloc.fan_out,
            token_bytes: alloc.token_bytes,
            create_attempts: alloc.attempts,
        }
    }
}

impl StorageConfig {
    pub fn allocator(&self) -> AddressAllocator {
        AddressAllocator {
            fan_out: self.fan_out,
            token_bytes: self.token_bytes,
            attempts: self.create_attempts,
        }
    }
}

/// Upload re-encoding and render limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// JPEG quality used when storing an upload as the source image.
    pub source_quality: u32,
    /// Largest pixel area of any buffer a variant render allocates. Larger
    /// requests fail like any other render failure.
    pub max_pixels: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            source_quality: 75,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of blocking workers (file I/O and renders).
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_workers
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ServerConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ServerConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file.
///
/// An explicitly named file must exist. Without one, `simple-img.toml` in
/// the working directory is used if present, and stock defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let overlay = match path {
        Some(p) => Some(read_toml(p)?),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                Some(read_toml(default)?)
            } else {
                None
            }
        }
    };
    resolve_config(overlay)
}

fn read_toml(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Returns a fully-commented stock `simple-img.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Img Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# Command-line flags (--root, --bind) override this file.

# ---------------------------------------------------------------------------
# HTTP listener
# ---------------------------------------------------------------------------
[server]
# Socket address to listen on.
bind = "127.0.0.1:8080"

# Largest accepted request body in bytes (uploads and form posts).
max_upload_bytes = 33554432

# ---------------------------------------------------------------------------
# Storage layout
# ---------------------------------------------------------------------------
[storage]
# Directory holding every uploaded image and its variants.
root = "store"

# Each container token is split into this many single-character directory
# levels, then the remainder. Must be shorter than the encoded token.
fan_out = 3

# Random bytes per container token (base64 encoded, 18 bytes = 24 chars).
token_bytes = 18

# How many fresh tokens to try when a token is already taken.
create_attempts = 10

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# JPEG quality (0-100) used when storing an upload as source.jpeg.
source_quality = 75

# Largest pixel area (width x height) any variant render may allocate,
# including intermediate buffers. Larger variants are reported as missing.
max_pixels = 67108864

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum blocking workers for file I/O and variant renders.
# Omit to use all CPU cores; values above the core count are clamped.
# max_workers = 4
"##
}
