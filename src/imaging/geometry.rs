//! Pure calculation functions for geometry and unit conversion.
//!
//! All functions here are pure and testable without any I/O or images.
//! Physical units (mm, cm, inch) are converted to pixels through a DPI
//! value resolved per request; 300 DPI is the print-oriented default.

pub const MM_PER_INCH: f64 = 25.4;

/// Length unit accepted by geometry parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Px,
    Mm,
    Cm,
    In,
}

impl Unit {
    /// Parse a unit suffix (`"px"`, `"mm"`, `"cm"`, `"in"`). Empty means pixels.
    pub fn from_suffix(suffix: &str) -> Option<Unit> {
        match suffix {
            "" | "px" => Some(Unit::Px),
            "mm" => Some(Unit::Mm),
            "cm" => Some(Unit::Cm),
            "in" | "inch" => Some(Unit::In),
            _ => None,
        }
    }
}

/// Convert a length in the given unit to pixels at `dpi`.
///
/// # Examples
/// ```
/// # use imgpress::imaging::{to_pixels, Unit};
/// // 2 inches at 300 DPI → 600 px
/// assert_eq!(to_pixels(2.0, Unit::In, 300.0), 600.0);
/// // 25.4 mm is one inch
/// assert_eq!(to_pixels(25.4, Unit::Mm, 300.0), 300.0);
/// ```
pub fn to_pixels(value: f64, unit: Unit, dpi: f64) -> f64 {
    match unit {
        Unit::Px => value,
        Unit::Mm => value / MM_PER_INCH * dpi,
        Unit::Cm => value * 10.0 / MM_PER_INCH * dpi,
        Unit::In => value * dpi,
    }
}

/// Convert a pixel length back to the given unit at `dpi`.
///
/// Inverse of [`to_pixels`]: round-tripping a value through pixels at the
/// same DPI reproduces it within rounding tolerance.
pub fn from_pixels(pixels: f64, unit: Unit, dpi: f64) -> f64 {
    match unit {
        Unit::Px => pixels,
        Unit::Mm => pixels / dpi * MM_PER_INCH,
        Unit::Cm => pixels / dpi * MM_PER_INCH / 10.0,
        Unit::In => pixels / dpi,
    }
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h)
    }
}

/// Calculate dimensions that fit inside a bounding box, preserving aspect ratio.
///
/// The counterpart of [`fill_dimensions`]: both output dimensions are at most
/// the target, at least one matches it. Never upscales past the box.
pub fn fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let scale = (tgt_w as f64 / src_w as f64).min(tgt_h as f64 / src_h as f64);
    (
        ((src_w as f64 * scale).round() as u32).max(1),
        ((src_h as f64 * scale).round() as u32).max(1),
    )
}

/// Scale dimensions by a percentage, keeping both at least 1px.
pub fn percent_dimensions(source: (u32, u32), percent: f64) -> (u32, u32) {
    let factor = percent / 100.0;
    (
        ((source.0 as f64 * factor).round() as u32).max(1),
        ((source.1 as f64 * factor).round() as u32).max(1),
    )
}

/// Grid layout for composing `quantity` copies onto one canvas.
///
/// Columns are `ceil(sqrt(n))`, rows `ceil(n / cols)`, so the grid is as
/// close to square as the count allows and always has capacity ≥ `quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
}

impl GridLayout {
    pub fn for_quantity(quantity: u32) -> GridLayout {
        let n = quantity.max(1);
        let columns = (n as f64).sqrt().ceil() as u32;
        let rows = n.div_ceil(columns);
        GridLayout { columns, rows }
    }

    pub fn capacity(&self) -> u32 {
        self.columns * self.rows
    }

    /// Canvas size for unit images of `unit_w × unit_h`.
    pub fn canvas(&self, unit_w: u32, unit_h: u32) -> (u32, u32) {
        (self.columns * unit_w, self.rows * unit_h)
    }

    /// Pixel offset of cell `index` (row-major).
    pub fn offset(&self, index: u32, unit_w: u32, unit_h: u32) -> (u32, u32) {
        let col = index % self.columns;
        let row = index / self.columns;
        (col * unit_w, row * unit_h)
    }
}

/// A crop rectangle in source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Face-region heuristic used by passport-style crops.
///
/// Crops to a square of side `min(width, height)`, horizontally centered,
/// shifted upward from the vertical center by a third of the image height
/// (clamped at the top edge). In a portrait photo the subject's face sits
/// above center far more often than not, so the upward bias lands the crop
/// on it without any detection. This is an approximation, not a detector;
/// no accuracy claim is made.
pub fn face_region(width: u32, height: u32) -> CropRect {
    let side = width.min(height);
    let x = (width - side) / 2;
    let centered_y = (height - side) / 2;
    let y = centered_y.saturating_sub(height / 3);
    CropRect {
        x,
        y,
        width: side,
        height: side,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // unit conversion tests
    // =========================================================================

    #[test]
    fn inches_to_pixels_at_300() {
        assert_eq!(to_pixels(2.0, Unit::In, 300.0), 600.0);
    }

    #[test]
    fn millimeters_to_pixels_passport_size() {
        // 35x45mm at 300 DPI — the common passport photo geometry
        assert_eq!(to_pixels(35.0, Unit::Mm, 300.0).round(), 413.0);
        assert_eq!(to_pixels(45.0, Unit::Mm, 300.0).round(), 531.0);
    }

    #[test]
    fn centimeters_equal_ten_millimeters() {
        assert_eq!(
            to_pixels(1.0, Unit::Cm, 300.0),
            to_pixels(10.0, Unit::Mm, 300.0)
        );
    }

    #[test]
    fn pixels_pass_through_unchanged() {
        assert_eq!(to_pixels(800.0, Unit::Px, 72.0), 800.0);
        assert_eq!(from_pixels(800.0, Unit::Px, 600.0), 800.0);
    }

    #[test]
    fn cm_px_cm_round_trip_within_tolerance() {
        // cm → px → cm through the same DPI reproduces the value within
        // ±1 rounded pixel at 300 DPI.
        for v in [1.0, 2.54, 10.0, 21.0, 29.7] {
            let px = to_pixels(v, Unit::Cm, 300.0).round();
            let back = from_pixels(px, Unit::Cm, 300.0);
            let one_px_in_cm = from_pixels(1.0, Unit::Cm, 300.0);
            assert!(
                (back - v).abs() <= one_px_in_cm,
                "{v}cm round-tripped to {back}cm"
            );
        }
    }

    #[test]
    fn unit_suffix_parsing() {
        assert_eq!(Unit::from_suffix(""), Some(Unit::Px));
        assert_eq!(Unit::from_suffix("px"), Some(Unit::Px));
        assert_eq!(Unit::from_suffix("mm"), Some(Unit::Mm));
        assert_eq!(Unit::from_suffix("cm"), Some(Unit::Cm));
        assert_eq!(Unit::from_suffix("in"), Some(Unit::In));
        assert_eq!(Unit::from_suffix("inch"), Some(Unit::In));
        assert_eq!(Unit::from_suffix("pt"), None);
    }

    // =========================================================================
    // fill / fit dimension tests
    // =========================================================================

    #[test]
    fn fill_wider_source_to_portrait_target() {
        // 800x600 (4:3) → 400x500 target
        // Source is wider, so height matches: 500, width = 500 * (4/3) = 667
        assert_eq!(fill_dimensions((800, 600), (400, 500)), (667, 500));
    }

    #[test]
    fn fill_taller_source_to_landscape_target() {
        assert_eq!(fill_dimensions((600, 800), (500, 400)), (500, 667));
    }

    #[test]
    fn fill_same_aspect_ratio() {
        assert_eq!(fill_dimensions((800, 600), (400, 300)), (400, 300));
    }

    #[test]
    fn fit_constrains_longer_edge() {
        assert_eq!(fit_dimensions((2000, 1000), (800, 800)), (800, 400));
        assert_eq!(fit_dimensions((1000, 2000), (800, 800)), (400, 800));
    }

    #[test]
    fn fit_never_returns_zero() {
        assert_eq!(fit_dimensions((4000, 10), (100, 100)), (100, 1));
    }

    #[test]
    fn percent_scales_both_edges() {
        assert_eq!(percent_dimensions((800, 600), 50.0), (400, 300));
        assert_eq!(percent_dimensions((800, 600), 150.0), (1200, 900));
    }

    #[test]
    fn percent_floors_at_one_pixel() {
        assert_eq!(percent_dimensions((10, 10), 1.0), (1, 1));
    }

    // =========================================================================
    // grid layout tests
    // =========================================================================

    #[test]
    fn grid_for_five_is_three_by_two() {
        // ceil(sqrt(5)) = 3 columns, ceil(5/3) = 2 rows
        let grid = GridLayout::for_quantity(5);
        assert_eq!(grid.columns, 3);
        assert_eq!(grid.rows, 2);
        assert_eq!(grid.capacity(), 6);
    }

    #[test]
    fn grid_for_one_is_single_cell() {
        let grid = GridLayout::for_quantity(1);
        assert_eq!((grid.columns, grid.rows), (1, 1));
    }

    #[test]
    fn grid_for_perfect_square() {
        let grid = GridLayout::for_quantity(9);
        assert_eq!((grid.columns, grid.rows), (3, 3));
    }

    #[test]
    fn grid_capacity_always_covers_quantity() {
        for n in 1..=64 {
            let grid = GridLayout::for_quantity(n);
            assert!(grid.capacity() >= n, "quantity {n} overflows its grid");
        }
    }

    #[test]
    fn grid_canvas_and_offsets() {
        let grid = GridLayout::for_quantity(5);
        assert_eq!(grid.canvas(600, 600), (1800, 1200));
        assert_eq!(grid.offset(0, 600, 600), (0, 0));
        assert_eq!(grid.offset(2, 600, 600), (1200, 0));
        assert_eq!(grid.offset(3, 600, 600), (0, 600));
        assert_eq!(grid.offset(4, 600, 600), (600, 600));
    }

    // =========================================================================
    // face region heuristic tests
    // =========================================================================

    #[test]
    fn face_region_portrait_biases_upward() {
        let r = face_region(600, 900);
        assert_eq!((r.width, r.height), (600, 600));
        assert_eq!(r.x, 0);
        // Centered would be y=150; shifted up by 900/3=300, clamped to 0.
        assert_eq!(r.y, 0);
    }

    #[test]
    fn face_region_tall_portrait_keeps_offset() {
        let r = face_region(600, 2400);
        assert_eq!((r.width, r.height), (600, 600));
        // Centered y = 900, shift up by 800 → 100.
        assert_eq!(r.y, 100);
    }

    #[test]
    fn face_region_landscape_is_horizontally_centered() {
        let r = face_region(900, 600);
        assert_eq!((r.width, r.height), (600, 600));
        assert_eq!(r.x, 150);
        assert_eq!(r.y, 0);
    }

    #[test]
    fn face_region_square_is_identity() {
        let r = face_region(500, 500);
        assert_eq!(
            r,
            CropRect {
                x: 0,
                y: 0,
                width: 500,
                height: 500
            }
        );
    }
}
