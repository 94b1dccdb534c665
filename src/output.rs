//! CLI output formatting for the offline commands.
//!
//! # Information-First Display
//!
//! Each container is shown by its URL path, the way clients address it, with
//! its files as indented context lines. Variant lines lead with the filename
//! (which *is* the recipe) followed by its state.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! 001 /q/3/Z/k9Xv0cBmLr_2N8aYtWe1H
//!     source.jpeg
//!     metadata.txt
//!     crop-50x50-x0y0.png: pending
//!     scale-100x50.jpeg: materialized (3.2 KiB)
//!     banana: corrupt
//!
//! 1 container, 1 materialized, 1 pending, 1 corrupt
//! ```
//!
//! ## Name
//!
//! ```text
//! crop-50x50.png → crop-50x50-x50y50.png
//!     Crop 50x50 centered at 50%,50%
//!     PNG
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::naming::{ParseError, canonical_name};
use crate::scan::{Inventory, Variant, VariantState};
use crate::types::{OutputFormat, Recipe, Transformation};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte size: `812 B`, `3.2 KiB`, `1.4 MiB`.
fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

/// `1 container`, `3 containers`.
fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

fn variant_line(variant: &Variant) -> String {
    match variant.state {
        VariantState::Materialized => format!(
            "{}: materialized ({})",
            variant.name,
            format_bytes(variant.bytes)
        ),
        VariantState::Pending => format!("{}: pending", variant.name),
        VariantState::Corrupt => format!("{}: corrupt", variant.name),
    }
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the store inventory: one block per container, then a summary line.
pub fn format_inventory(inventory: &Inventory) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, container) in inventory.containers.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), container.path));
        if container.has_source {
            lines.push(format!("{}source.jpeg", indent(1)));
        } else {
            lines.push(format!("{}(no source)", indent(1)));
        }
        if container.has_metadata {
            lines.push(format!("{}metadata.txt", indent(1)));
        }
        for variant in &container.variants {
            lines.push(format!("{}{}", indent(1), variant_line(variant)));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{}, {} materialized, {} pending, {} corrupt",
        plural(inventory.containers.len(), "container"),
        inventory.count(VariantState::Materialized),
        inventory.count(VariantState::Pending),
        inventory.count(VariantState::Corrupt),
    ));
    lines
}

pub fn print_inventory(inventory: &Inventory) {
    for line in format_inventory(inventory) {
        println!("{}", line);
    }
}

// ============================================================================
// Name output
// ============================================================================

/// Describe a transformation in words.
fn describe_transformation(t: &Transformation) -> String {
    match *t {
        Transformation::Scale { width, height } => format!("Scale to {width}x{height}"),
        Transformation::Clip { width, height } => format!("Clip to fit {width}x{height}"),
        Transformation::Crop {
            width,
            height,
            center_x,
            center_y,
        } => format!("Crop {width}x{height} centered at {center_x}%,{center_y}%"),
        Transformation::Cut {
            width,
            height,
            top,
            left,
            scale_width,
            scale_height,
        } => {
            let cut = format!("Cut {width}x{height} at left {left}, top {top}");
            if (scale_width, scale_height) == (width, height) {
                cut
            } else {
                format!("{cut}, scaled to {scale_width}x{scale_height}")
            }
        }
    }
}

fn describe_format(format: &OutputFormat) -> String {
    match format {
        OutputFormat::Jpeg { quality } => format!("JPEG quality {}", quality.value()),
        OutputFormat::Png => "PNG".to_string(),
    }
}

/// Format the result of parsing a variant segment.
pub fn format_name(segment: &str, parsed: &Result<Recipe, ParseError>) -> Vec<String> {
    match parsed {
        Ok(recipe) => vec![
            format!("{} → {}", segment, canonical_name(recipe)),
            format!("{}{}", indent(1), describe_transformation(&recipe.transformation)),
            format!("{}{}", indent(1), describe_format(&recipe.format)),
        ],
        Err(e) => vec![format!("{}: {}", segment, e)],
    }
}

pub fn print_name(segment: &str, parsed: &Result<Recipe, ParseError>) {
    for line in format_name(segment, parsed) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
