//! Badge resize and recompression for `/resize`.
//!
//! Input PNGs are resized to a fixed resolution, reduced to an RGBA palette and
//! re-encoded as indexed PNGs. Each attempt lowers the quality, which shrinks the
//! palette, until the file fits the byte budget or the quality floor is hit.

use crate::{config::settings::ResizeConfig, core::scratch::sanitize_filename, errors::Result};
use color_quant::NeuQuant;
use image::{RgbaImage, imageops::FilterType};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix for the returned file name
pub const OUTPUT_PREFIX: &str = "badge_compatible_";

/// Reply for uploads that aren't PNGs
pub const NOT_PNG_REPLY: &str = "Sorry sir I havent worked with that format before";

/// Reason written to the command log after `resize - `
pub const NOT_PNG_REASON: &str = "not a PNG";

/// Smallest palette any attempt uses
const MIN_PALETTE_COLORS: usize = 16;

/// `NeuQuant` sampling factor: 1 is slowest and best, 30 fastest
const NEUQUANT_SAMPLE_FACTOR: i32 = 10;

/// What the size-reduction loop settled on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOutcome {
    /// Quality of the attempt that was kept
    pub quality: u32,
    /// Palette size of that attempt
    pub colors: usize,
    /// Encoded size in bytes
    pub bytes: usize,
}

/// Whether the upload is named like a PNG. The contents are not sniffed.
#[must_use]
pub fn is_png_name(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".png")
}

/// Name of the resized file sent back to the user
#[must_use]
pub fn output_name(filename: &str) -> String {
    format!("{OUTPUT_PREFIX}{}", sanitize_filename(filename))
}

/// Palette size for a given quality, proportional to `palette_colors` at
/// `start_quality` and never below [`MIN_PALETTE_COLORS`].
#[must_use]
pub fn palette_size(settings: &ResizeConfig, quality: u32) -> usize {
    let start = settings.start_quality.max(1) as usize;
    let scaled = settings.palette_colors * quality as usize / start;
    scaled.clamp(
        MIN_PALETTE_COLORS.min(settings.palette_colors),
        settings.palette_colors,
    )
}

/// Resizes `input` and writes the smallest acceptable encoding to `output`.
///
/// # Errors
/// Returns an error if the input can't be decoded or the output can't be encoded or
/// written.
pub fn resize_png(input: &Path, output: &Path, settings: &ResizeConfig) -> Result<ResizeOutcome> {
    let source = image::open(input)?;
    let rgba = source
        .resize_exact(settings.width, settings.height, FilterType::Lanczos3)
        .to_rgba8();

    let mut quality = settings.start_quality;
    loop {
        let colors = palette_size(settings, quality);
        let encoded = encode_indexed(&rgba, colors)?;
        debug!(quality, colors, bytes = encoded.len(), "Badge encoding attempt");

        if encoded.len() < settings.max_bytes || quality <= settings.min_quality {
            std::fs::write(output, &encoded)?;
            return Ok(ResizeOutcome {
                quality,
                colors,
                bytes: encoded.len(),
            });
        }
        quality = quality
            .saturating_sub(settings.quality_step)
            .max(settings.min_quality);
    }
}

/// Runs [`resize_png`] on the blocking pool.
///
/// # Errors
/// As [`resize_png`], plus a join error if the worker panics.
pub async fn resize_badge(
    input: PathBuf,
    output: PathBuf,
    settings: ResizeConfig,
) -> Result<ResizeOutcome> {
    tokio::task::spawn_blocking(move || resize_png(&input, &output, &settings)).await?
}

fn encode_indexed(rgba: &RgbaImage, colors: usize) -> Result<Vec<u8>> {
    let pixels = rgba.as_raw();
    let quantizer = NeuQuant::new(NEUQUANT_SAMPLE_FACTOR, colors, pixels);

    let color_map = quantizer.color_map_rgba();
    let palette: Vec<u8> = color_map
        .chunks_exact(4)
        .flat_map(|c| [c[0], c[1], c[2]])
        .collect();
    let alpha: Vec<u8> = color_map.chunks_exact(4).map(|c| c[3]).collect();
    let indices: Vec<u8> = pixels
        .chunks_exact(4)
        .map(|px| u8::try_from(quantizer.index_of(px)).unwrap_or(u8::MAX))
        .collect();

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, rgba.width(), rgba.height());
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(palette);
        encoder.set_trns(alpha);
        encoder.set_compression(png::Compression::Best);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&indices)?;
        writer.finish()?;
    }
    Ok(buf)
}
