//! # Simple Img
//!
//! A single-node HTTP image store. Clients upload a source image, then ask
//! for derived variants (scaled, clipped, cropped, cut, re-encoded) by naming
//! them: the last path segment of a variant URL *is* its recipe.
//!
//! # Architecture: Reserve, Then Render Lazily
//!
//! ```text
//! PUT    /                         →  303 /q/3/Z/k9Xv…/source.jpeg
//! POST   …/source.jpeg  format=…   →  303 /q/3/Z/k9Xv…/crop-50x50-x0y0.jpeg   (zero bytes)
//! GET    …/crop-50x50-x0y0.jpeg    →  render into the placeholder, serve it
//! GET    …/crop-50x50-x0y0.jpeg    →  serve the stored bytes
//! DELETE …/source.jpeg             →  the whole container is gone
//! ```
//!
//! A variant costs nothing until someone reads it, and after the first read
//! it is a plain file on disk.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Variant-name grammar: segment → [`types::Recipe`] and back to the canonical filename |
//! | [`types`] | `Transformation`, `OutputFormat`, `Recipe` shared by every component |
//! | [`imaging`] | Transformation engine and format codec over an opaque resample/encode backend |
//! | [`address`] | Random, sharded container directories with exclusive creation |
//! | [`store`] | URL path mapping, upload, reservation, lazy materialization, deletion |
//! | [`server`] | axum router for `PUT`/`POST`/`GET`/`DELETE` |
//! | [`scan`] | Offline inventory of a store root |
//! | [`config`] | `simple-img.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Filename Is the Recipe
//!
//! There is no database. A placeholder named `cut-20x20-t5l10-s40x40.png`
//! carries everything needed to render it, so the grammar's canonical
//! spelling and its parser must be exact inverses. [`naming`] tests that
//! round trip for every shape.
//!
//! ## One Render per Placeholder
//!
//! Concurrent reads of the same placeholder serialize on a per-path lock and
//! re-check the file size once they hold it. The first reader renders; the
//! rest serve its bytes. Renders are deterministic, so a reset-and-rerender
//! yields the same bytes too.
//!
//! ## Failures Look Like Absence
//!
//! A variant that cannot be rendered answers 404, and the cause goes to the
//! log. A placeholder whose name no longer parses is deleted on sight.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling, JPEG
//! and PNG codecs). No system libraries, a single self-contained binary.

pub mod address;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod scan;
pub mod server;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
