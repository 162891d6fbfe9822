//! Codec-adjacent image plumbing.
//!
//! | Concern | Where |
//! |---|---|
//! | **Decode + metadata** | [`handle`] — one decode per request, density sniffing |
//! | **Encode** | [`codec`] — JPEG/PNG via `image`, lossy WebP via `webp` |
//! | **Density** | [`density`] — JFIF APP0 / PNG pHYs reader and JFIF patcher |
//! | **Geometry** | [`geometry`] — pure unit/dimension/grid math (unit testable) |
//!
//! The module is the seam between the rest of the crate and the native
//! codec stack: recipes never touch encoders directly.

pub mod codec;
pub mod density;
pub mod geometry;
pub mod handle;

pub use codec::{CodecConfig, CodecError, OutputFormat, encode};
pub use density::{Density, set_jfif_density, sniff_density};
pub use geometry::{
    CropRect, GridLayout, Unit, face_region, fill_dimensions, fit_dimensions, from_pixels,
    percent_dimensions, to_pixels,
};
pub use handle::{ImageHandle, RawImage};
