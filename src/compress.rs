//! Size-targeted compression engine.
//!
//! Given a decoded image and a byte budget, searches the codec's quality
//! parameter for the best encoding that fits. Quality→size is monotone in
//! practice for the formats served here but not guaranteed by any codec
//! contract, so the search is a *bounded* binary search: a hard probe cap
//! and a tolerance band, not a convergence guarantee.
//!
//! Costs are dominated by full re-encodes — codecs expose no cheap size
//! estimator — so the search is O(log(quality range)) encode passes, at
//! most [`CodecConfig::max_probes`].
//!
//! Formats differ in capability: JPEG and WebP map quality straight onto
//! their encoders; PNG has no quality knob and is steered structurally
//! (see [`PngStrategy`]). Each format implements the same [`probe`]
//! contract so the search itself is format-blind.
//!
//! [`probe`]: FormatStrategy::probe

use crate::imaging::codec::{self, CodecConfig, CodecError, OutputFormat};
use image::DynamicImage;
use image::codecs::png::CompressionType;

/// A byte budget for one encoding.
#[derive(Debug, Clone, Copy)]
pub struct CompressionTarget {
    pub target_bytes: u64,
    pub format: OutputFormat,
    /// Inclusive quality search bounds, `floor <= ceiling`.
    pub quality_bounds: (u8, u8),
}

impl CompressionTarget {
    /// Build a target with bounds from the codec config. A zero budget is
    /// clamped to one byte; bounds are clamped into 1–100 with
    /// `floor <= ceiling` preserved.
    pub fn new(target_bytes: u64, format: OutputFormat, config: &CodecConfig) -> Self {
        let floor = config.quality_floor.clamp(1, 100);
        let ceiling = config.quality_ceiling.clamp(floor, 100);
        Self {
            target_bytes: target_bytes.max(1),
            format,
            quality_bounds: (floor, ceiling),
        }
    }
}

/// Outcome of a size-targeted compression.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub bytes: Vec<u8>,
    /// Quality parameter of the returned encoding.
    pub quality_used: u8,
    /// Always equal to `bytes.len()`.
    pub achieved_bytes: u64,
    /// True when the budget was met (possibly within the tolerance band).
    /// False means the budget sits below the format's floor and `bytes`
    /// is the smallest encoding observed — callers must not assume exact
    /// convergence either way.
    pub converged: bool,
    /// Encode passes spent, for diagnostics.
    pub trials: u32,
}

impl CompressionResult {
    fn new(bytes: Vec<u8>, quality_used: u8, converged: bool, trials: u32) -> Self {
        let achieved_bytes = bytes.len() as u64;
        Self {
            bytes,
            quality_used,
            achieved_bytes,
            converged,
            trials,
        }
    }
}

/// One encode pass at a quality setting.
trait FormatStrategy: Sync {
    fn probe(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError>;
}

struct JpegStrategy;

impl FormatStrategy for JpegStrategy {
    fn probe(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
        codec::encode_jpeg(image, quality)
    }
}

struct WebpStrategy;

impl FormatStrategy for WebpStrategy {
    fn probe(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
        codec::encode_webp(image, quality)
    }
}

/// PNG exposes no lossy quality knob. Above [`PNG_DIRECT_QUALITY`] the
/// probe is a straight maximum-compression PNG encode; below it the image
/// is passed through a lossy JPEG intermediate at the probed quality and
/// re-encoded, trading fidelity for the flattened regions PNG's DEFLATE
/// stage can exploit. Size tracks quality more loosely than for native
/// lossy formats, which the bounded search tolerates.
struct PngStrategy;

const PNG_DIRECT_QUALITY: u8 = 90;

impl FormatStrategy for PngStrategy {
    fn probe(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
        if quality >= PNG_DIRECT_QUALITY {
            return codec::encode_png(image, CompressionType::Best);
        }
        let intermediate = codec::encode_jpeg(image, quality)?;
        let lossy = image::load_from_memory_with_format(&intermediate, image::ImageFormat::Jpeg)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        codec::encode_png(&lossy, CompressionType::Best)
    }
}

fn strategy(format: OutputFormat) -> &'static dyn FormatStrategy {
    match format {
        OutputFormat::Jpeg => &JpegStrategy,
        OutputFormat::Webp => &WebpStrategy,
        OutputFormat::Png => &PngStrategy,
    }
}

/// Quality of the initial safety probe. A budget that the encoding at
/// this quality already fits is returned unchanged — the engine never
/// degrades quality purely to fill an oversized budget.
const TOP_PROBE_QUALITY: u8 = 95;

/// Search the quality space for the best encoding within the byte budget.
///
/// Returns the closest-from-below candidate, accepting results within the
/// tolerance band on either side of the target. When no probe fits, the
/// smallest encoding observed is returned with `converged = false`; an
/// unreachable budget is a diagnostic condition, never an error.
pub fn compress_to_size(
    image: &DynamicImage,
    target: &CompressionTarget,
    config: &CodecConfig,
) -> Result<CompressionResult, CodecError> {
    let strategy = strategy(target.format);
    let (floor, ceiling) = target.quality_bounds;
    let budget = target.target_bytes;
    let tolerance = budget * config.tolerance_percent as u64 / 100;
    let max_probes = config.max_probes.max(1);

    let top_quality = ceiling.min(TOP_PROBE_QUALITY).max(floor);
    let top = strategy.probe(image, top_quality)?;
    let mut trials = 1u32;
    if top.len() as u64 <= budget {
        return Ok(CompressionResult::new(top, top_quality, true, trials));
    }

    // Everything below runs with the top-end encoding already over budget.
    // `smallest` backs the non-convergence path; `best_under` wins as soon
    // as any probe fits.
    let mut smallest_size = top.len() as u64;
    let mut smallest: (Vec<u8>, u8) = (top, top_quality);
    let mut best_under: Option<(Vec<u8>, u8)> = None;

    let mut low = floor;
    let mut high = top_quality.saturating_sub(1);
    while low <= high && trials < max_probes {
        let mid = ((low as u16 + high as u16) / 2) as u8;
        let bytes = strategy.probe(image, mid)?;
        trials += 1;
        let size = bytes.len() as u64;

        if size <= budget {
            let within_band = budget - size <= tolerance;
            best_under = Some((bytes, mid));
            if within_band {
                break;
            }
            low = mid + 1;
        } else {
            if size - budget <= tolerance {
                // Slightly over but inside the band: accepted as converged.
                return Ok(CompressionResult::new(bytes, mid, true, trials));
            }
            if size < smallest_size {
                smallest_size = size;
                smallest = (bytes, mid);
            }
            if mid == floor {
                break;
            }
            high = mid - 1;
        }
    }

    if let Some((bytes, quality)) = best_under {
        return Ok(CompressionResult::new(bytes, quality, true, trials));
    }
    let (bytes, quality) = smallest;
    Ok(CompressionResult::new(bytes, quality, false, trials))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{solid_image, textured_image};

    fn default_target(bytes: u64, format: OutputFormat) -> CompressionTarget {
        CompressionTarget::new(bytes, format, &CodecConfig::default())
    }

    #[test]
    fn target_clamps_zero_budget_and_bounds() {
        let config = CodecConfig {
            quality_floor: 0,
            quality_ceiling: 255,
            ..CodecConfig::default()
        };
        let t = CompressionTarget::new(0, OutputFormat::Jpeg, &config);
        assert_eq!(t.target_bytes, 1);
        assert_eq!(t.quality_bounds, (1, 100));
    }

    #[test]
    fn oversized_budget_returns_top_quality_unchanged() {
        let img = textured_image(320, 240);
        let result =
            compress_to_size(&img, &default_target(100 << 20, OutputFormat::Jpeg), &CodecConfig::default())
                .unwrap();
        assert!(result.converged);
        assert_eq!(result.quality_used, 95);
        assert_eq!(result.trials, 1);
        assert_eq!(result.achieved_bytes, result.bytes.len() as u64);
    }

    #[test]
    fn reachable_budget_converges_within_band() {
        let img = textured_image(640, 480);
        let config = CodecConfig::default();
        let s_low = codec::encode_jpeg(&img, 10).unwrap().len() as u64;
        let s_high = codec::encode_jpeg(&img, 95).unwrap().len() as u64;
        assert!(s_low < s_high, "fixture must span a size range");

        let budget = (s_low + s_high) / 2;
        let result =
            compress_to_size(&img, &default_target(budget, OutputFormat::Jpeg), &config).unwrap();
        assert!(result.converged);
        assert!(result.achieved_bytes <= budget + budget / 20);
        assert!((10..=95).contains(&result.quality_used));
        assert!(result.trials <= config.max_probes);
    }

    #[test]
    fn unreachable_budget_flags_without_error() {
        let img = solid_image(50, 50, [200, 200, 200]);
        let result =
            compress_to_size(&img, &default_target(1, OutputFormat::Png), &CodecConfig::default())
                .unwrap();
        assert!(!result.converged);
        assert!(result.achieved_bytes > 1);
        assert!(!result.bytes.is_empty());
    }

    #[test]
    fn unreachable_budget_returns_smallest_observed() {
        let img = textured_image(320, 240);
        let config = CodecConfig::default();
        let floor_size = codec::encode_jpeg(&img, 10).unwrap().len() as u64;
        let result =
            compress_to_size(&img, &default_target(2, OutputFormat::Jpeg), &config).unwrap();
        assert!(!result.converged);
        assert_eq!(result.achieved_bytes, floor_size);
        assert_eq!(result.quality_used, 10);
    }

    #[test]
    fn probe_count_stays_within_cap() {
        let img = textured_image(320, 240);
        let config = CodecConfig::default();
        for budget in [2, 1000, 5000, 20_000, 1 << 30] {
            let result =
                compress_to_size(&img, &default_target(budget, OutputFormat::Jpeg), &config)
                    .unwrap();
            assert!(result.trials <= config.max_probes, "budget {budget}");
        }
    }

    #[test]
    fn webp_budget_search_works() {
        let img = textured_image(320, 240);
        let config = CodecConfig::default();
        let s_low = codec::encode_webp(&img, 10).unwrap().len() as u64;
        let s_high = codec::encode_webp(&img, 95).unwrap().len() as u64;
        let budget = (s_low + s_high) / 2;
        let result =
            compress_to_size(&img, &default_target(budget, OutputFormat::Webp), &config).unwrap();
        assert!(result.converged);
        assert!(result.achieved_bytes <= budget + budget / 20);
        assert_eq!(&result.bytes[..4], b"RIFF");
    }

    #[test]
    fn png_strategy_produces_png_at_any_quality() {
        let img = textured_image(128, 128);
        let config = CodecConfig::default();
        let generous = compress_to_size(
            &img,
            &default_target(10 << 20, OutputFormat::Png),
            &config,
        )
        .unwrap();
        assert_eq!(&generous.bytes[..4], &[0x89, b'P', b'N', b'G']);

        let tight = compress_to_size(&img, &default_target(500, OutputFormat::Png), &config).unwrap();
        assert_eq!(&tight.bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn achieved_bytes_matches_buffer_length() {
        let img = textured_image(200, 200);
        for format in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Webp] {
            let result =
                compress_to_size(&img, &default_target(4000, format), &CodecConfig::default())
                    .unwrap();
            assert_eq!(result.achieved_bytes, result.bytes.len() as u64);
        }
    }
}
