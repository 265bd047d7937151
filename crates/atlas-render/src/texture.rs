// SPDX-License-Identifier: CEPL-1.0
//! Pixel-map loading for engines. Loading never fails: every failure path
//! logs one warning and hands back the empty map, so a missing or corrupt
//! asset degrades to an untextured surface instead of aborting startup.

use std::path::Path;

use tracing::warn;

/// RGBA8 pixel buffer with a bottom-left row origin (GL texture order).
/// The empty 0x0 map is the universal degradation value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelMap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelMap {
    pub fn empty() -> Self {
        PixelMap {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        }
    }

    /// Builds a map from raw RGBA8 rows (bottom row first). Returns `None`
    /// when the buffer length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() as u64 != u64::from(width) * u64::from(height) * 4 {
            return None;
        }
        Some(PixelMap {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Decodes encoded image bytes into a `PixelMap`, flipping rows to the
/// bottom-left origin. `label` names the source in warnings.
pub fn decode_pixels(bytes: &[u8], label: &str) -> PixelMap {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!("failed to decode image {label}: {e}");
            return PixelMap::empty();
        }
    };

    let rgba = img.flipv().into_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        warn!("image {label} decoded to zero size");
        return PixelMap::empty();
    }

    PixelMap {
        width,
        height,
        pixels: rgba.into_raw(),
    }
}

/// Reads and decodes an image file.
pub fn load_pixels(path: &Path) -> PixelMap {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to read image {}: {e}", path.display());
            return PixelMap::empty();
        }
    };
    decode_pixels(&bytes, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img.clone())
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn garbage_bytes_degrade_to_empty() {
        let map = decode_pixels(b"not an image", "garbage");
        assert!(map.is_empty());
        assert_eq!(map.data().len(), 0);
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let map = load_pixels(Path::new("/definitely/not/here.png"));
        assert!(map.is_empty());
    }

    #[test]
    fn decoded_rows_are_bottom_left_origin() {
        // 1x2 image: red on the top row, blue on the bottom row.
        let mut img = image::RgbaImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        let map = decode_pixels(&encode_png(&img), "two rows");

        assert_eq!((map.width(), map.height()), (1, 2));
        // Bottom row (blue) must come first after the flip.
        assert_eq!(&map.data()[0..4], &[0, 0, 255, 255]);
        assert_eq!(&map.data()[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(PixelMap::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(PixelMap::from_raw(2, 2, vec![0; 15]).is_none());
    }
}
