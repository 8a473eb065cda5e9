use std::sync::Arc;

use anyhow::{ensure, Result};

/// One plane of a planar pixel buffer.
#[derive(Debug, Clone)]
pub struct ImagePlane {
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
    pub data: Arc<[u8]>,
}

impl ImagePlane {
    /// Wraps plane bytes, checking that `data` covers `height` rows.
    pub fn new(width: u32, height: u32, bytes_per_row: u32, data: Arc<[u8]>) -> Result<Self> {
        ensure!(width > 0 && height > 0, "image plane has zero size");
        ensure!(
            data.len() as u64 >= bytes_per_row as u64 * height as u64,
            "image plane data too short: {} bytes for {} rows of {}",
            data.len(),
            height,
            bytes_per_row
        );
        Ok(Self {
            width,
            height,
            bytes_per_row,
            data,
        })
    }
}

/// Captured camera image in bi-planar YCbCr layout.
///
/// Plane 0 holds luma (1 byte per texel), plane 1 holds interleaved CbCr at
/// half resolution (2 bytes per texel).
#[derive(Debug, Clone, Default)]
pub struct PlanarImage {
    planes: Vec<ImagePlane>,
}

impl PlanarImage {
    pub fn new(planes: Vec<ImagePlane>) -> Self {
        Self { planes }
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn planes(&self) -> &[ImagePlane] {
        &self.planes
    }

    /// Luma and chroma planes, or `None` when the buffer is not bi-planar.
    pub fn luma_chroma(&self) -> Option<(&ImagePlane, &ImagePlane)> {
        match self.planes.as_slice() {
            [y, cbcr, ..] => Some((y, cbcr)),
            _ => None,
        }
    }

    /// Luma resolution, which is the image resolution.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.planes.first().map(|p| (p.width, p.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(w: u32, h: u32, bpp: u32) -> ImagePlane {
        let data: Arc<[u8]> = vec![0u8; (w * h * bpp) as usize].into();
        ImagePlane::new(w, h, w * bpp, data).unwrap()
    }

    #[test]
    fn single_plane_is_not_luma_chroma() {
        let img = PlanarImage::new(vec![plane(4, 4, 1)]);
        assert_eq!(img.plane_count(), 1);
        assert!(img.luma_chroma().is_none());
    }

    #[test]
    fn bi_planar_exposes_both_planes() {
        let img = PlanarImage::new(vec![plane(8, 4, 1), plane(4, 2, 2)]);
        let (y, cbcr) = img.luma_chroma().unwrap();
        assert_eq!((y.width, cbcr.width), (8, 4));
        assert_eq!(img.size(), Some((8, 4)));
    }

    #[test]
    fn short_data_is_rejected() {
        let data: Arc<[u8]> = vec![0u8; 10].into();
        assert!(ImagePlane::new(4, 4, 4, data).is_err());
    }
}
