use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};

/// Loads the anchor decal from an image file.
pub fn load_decal(path: impl AsRef<Path>) -> Result<RgbaImage> {
    let path = path.as_ref();
    let img = image::open(path).with_context(|| format!("failed to load decal {}", path.display()))?;
    Ok(img.to_rgba8())
}

/// Fallback decal: a translucent checkerboard with an opaque border, so plane
/// extents and orientation stay readable without an asset.
pub fn checkerboard_decal(size: u32, cells: u32) -> RgbaImage {
    let size = size.max(2);
    let cell = (size / cells.max(1)).max(1);
    let border = (size / 32).max(1);

    RgbaImage::from_fn(size, size, |x, y| {
        let edge = x < border || y < border || x >= size - border || y >= size - border;
        if edge {
            return Rgba([255, 255, 255, 255]);
        }
        if (x / cell + y / cell) % 2 == 0 {
            Rgba([40, 170, 255, 170])
        } else {
            Rgba([255, 255, 255, 60])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_has_border_and_alternating_cells() {
        let img = checkerboard_decal(64, 4);
        assert_eq!(img.dimensions(), (64, 64));
        assert_eq!(img.get_pixel(0, 0)[3], 255);
        let a = img.get_pixel(8, 8);
        let b = img.get_pixel(24, 8);
        assert_ne!(a, b);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_decal("/nonexistent/decal.png").is_err());
    }
}
