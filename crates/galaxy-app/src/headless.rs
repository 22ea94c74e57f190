//! Headless snapshots through the CPU compositor.
//!
//! The galaxy is advanced in fixed reference frames so the same seed and
//! frame count always produce the same image.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use galaxy_config::Config;
use galaxy_render::{FrameOutcome, HdrImage, RenderError, SkipReason, SoftwareRenderer};
use tracing::{debug, info, instrument};

use crate::frame_driver::{DriverError, FrameDriver};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to build frame driver: {0}")]
    Driver(#[from] DriverError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("final frame was skipped: {0:?}")]
    Skipped(SkipReason),

    #[error("failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode PNG: {0}")]
    Png(#[from] png::EncodingError),
}

/// What a snapshot run produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapshotSummary {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub drawables: usize,
}

/// Simulate `frames` reference frames at the configured window size and
/// return the presented image.
pub fn render_snapshot(config: &Config, frames: u32) -> Result<(HdrImage, usize), SnapshotError> {
    let width = config.window.width;
    let height = config.window.height;
    let mut driver = FrameDriver::from_config(config, width, height)?;
    let mut renderer = SoftwareRenderer::new();

    let mut outcome = FrameOutcome::Rendered;
    for frame in 0..frames.max(1) {
        outcome = driver.fixed_step(&mut renderer, None)?;
        debug!("Snapshot frame {frame}: {outcome:?}");
    }
    if let FrameOutcome::Skipped(reason) = outcome {
        return Err(SnapshotError::Skipped(reason));
    }
    Ok((renderer.frame().clone(), driver.drawables().len()))
}

/// Render and write an RGBA8 PNG to `path`.
#[instrument(skip(config, path), fields(path = %path.display()))]
pub fn write_snapshot(
    config: &Config,
    path: &Path,
    frames: u32,
) -> Result<SnapshotSummary, SnapshotError> {
    let (image, drawables) = render_snapshot(config, frames)?;
    let file = File::create(path)?;
    encode_png(&image, BufWriter::new(file))?;

    let summary = SnapshotSummary {
        width: image.width(),
        height: image.height(),
        frames: frames.max(1),
        drawables,
    };
    info!(
        "Wrote {}x{} snapshot after {} frames ({} drawables)",
        summary.width, summary.height, summary.frames, summary.drawables
    );
    Ok(summary)
}

/// Encode a presented frame as 8-bit sRGB with alpha.
pub fn encode_png<W: Write>(image: &HdrImage, writer: W) -> Result<(), SnapshotError> {
    let mut encoder = png::Encoder::new(writer, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&image.to_srgba8())?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.window.width = 48;
        config.window.height = 27;
        config.galaxy.num_stars = 300;
        config.galaxy.seed = Some(5);
        config
    }

    #[test]
    fn test_snapshot_is_reproducible() {
        let (a, _) = render_snapshot(&small_config(), 3).unwrap();
        let (b, _) = render_snapshot(&small_config(), 3).unwrap();
        assert_eq!(a.to_srgba8(), b.to_srgba8());
    }

    #[test]
    fn test_zero_frames_still_renders_one() {
        let (image, drawables) = render_snapshot(&small_config(), 0).unwrap();
        assert_eq!((image.width(), image.height()), (48, 27));
        assert!(drawables > 0);
    }

    #[test]
    fn test_encode_png_header_and_size() {
        let (image, _) = render_snapshot(&small_config(), 1).unwrap();
        let mut bytes = Vec::new();
        encode_png(&image, &mut bytes).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!((info.width, info.height), (48, 27));
        assert_eq!(info.color_type, png::ColorType::Rgba);
    }

    #[test]
    fn test_write_snapshot_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("galaxy.png");
        let summary = write_snapshot(&small_config(), &path, 2).unwrap();
        assert_eq!(summary.frames, 2);
        assert!(path.metadata().unwrap().len() > 0);
    }
}
