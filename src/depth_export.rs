//! Depth buffer export
//!
//! Writes the z-buffer as a grayscale 24-bit BMP. Touched depths are
//! stretched from [min, max] to [0, 255]; untouched cells are white.
//! Buffer row 0 is the first row of pixel data in the file, which BMP
//! stores bottom-up, so the image reads with +y pointing up.

use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use log::{info, warn};

use crate::error::Result;
use crate::rasterizer::{Framebuffer, DEPTH_SENTINEL};

/// Smallest and largest depth written since the last clear, or `None`
/// when nothing was rasterized
pub fn depth_range(zbuffer: &[f32]) -> Option<(f32, f32)> {
    zbuffer
        .iter()
        .copied()
        .filter(|&z| z != DEPTH_SENTINEL)
        .fold(None, |range, z| match range {
            None => Some((z, z)),
            Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
        })
}

/// Map the depth buffer to a grayscale image
pub fn depth_image(fb: &Framebuffer) -> RgbImage {
    let range = depth_range(&fb.zbuffer);
    match range {
        None => warn!("Depth buffer is empty, exporting a blank image"),
        Some((lo, hi)) if lo == hi => warn!("All depths equal ({}), exporting a flat image", lo),
        Some((lo, hi)) => info!("Depth range: {} .. {}", lo, hi),
    }

    RgbImage::from_fn(fb.width as u32, fb.height as u32, |x, y| {
        let row = fb.height - 1 - y as usize;
        let z = fb.zbuffer[row * fb.width + x as usize];
        let v = depth_to_gray(z, range);
        Rgb([v, v, v])
    })
}

fn depth_to_gray(z: f32, range: Option<(f32, f32)>) -> u8 {
    match range {
        _ if z == DEPTH_SENTINEL => 255,
        Some((lo, hi)) if hi > lo => ((z - lo) / (hi - lo) * 255.0).clamp(0.0, 255.0) as u8,
        _ => 0,
    }
}

/// Write the depth buffer to `path` as a BMP
pub fn write_depth_bmp<P: AsRef<Path>>(fb: &Framebuffer, path: P) -> Result<()> {
    depth_image(fb).save_with_format(path.as_ref(), ImageFormat::Bmp)?;
    Ok(())
}
