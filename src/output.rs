//! CLI output formatting.
//!
//! # Architecture
//!
//! Each surface has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.
//!
//! ## Tool listing
//!
//! ```text
//! compress (15 tools)
//!     compress            Compress to a byte budget in the chosen format
//!     compress-jpeg       Compress to a byte budget as JPEG
//!     ...
//! ```
//!
//! ## Run result
//!
//! ```text
//! resize → resize.jpg (image/jpeg, 14213 bytes)
//!     original_bytes: 183402
//!     output_width: 800
//! ```

use crate::dispatch::EncodedOutput;
use crate::recipes::{Family, Registry};

/// Group the registry by family for `imgpress list`.
pub fn format_tool_listing(registry: &Registry) -> Vec<String> {
    let mut lines = Vec::new();
    let families = [
        Family::Resize,
        Family::Effects,
        Family::Convert,
        Family::Compress,
        Family::Document,
        Family::Inspect,
    ];
    for family in families {
        let tools: Vec<_> = registry.iter().filter(|r| r.family() == family).collect();
        if tools.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("{} ({} tools)", family.name(), tools.len()));
        for recipe in tools {
            lines.push(format!("    {:<22} {}", recipe.id(), recipe.summary()));
        }
    }
    lines
}

/// Header line + indented diagnostics for an image result.
pub fn format_image_result(tool_id: &str, output: &EncodedOutput) -> Vec<String> {
    let mut lines = vec![format!(
        "{tool_id} → {} ({}, {} bytes)",
        output.suggested_filename,
        output.content_type,
        output.bytes.len()
    )];
    for (key, value) in &output.diagnostics {
        if key == "tool" {
            continue;
        }
        lines.push(format!("    {key}: {value}"));
    }
    lines
}

pub fn print_tool_listing(registry: &Registry) {
    for line in format_tool_listing(registry) {
        println!("{line}");
    }
}

pub fn print_image_result(tool_id: &str, output: &EncodedOutput) {
    for line in format_image_result(tool_id, output) {
        println!("{line}");
    }
}
