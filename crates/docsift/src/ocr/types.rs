use image::{DynamicImage, GrayImage, RgbImage};

/// Pixel layout of a [`RasterImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Three bytes per pixel.
    Rgb8,
    /// One byte per pixel.
    Gray8,
}

impl ColorMode {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ColorMode::Rgb8 => 3,
            ColorMode::Gray8 => 1,
        }
    }
}

/// Uncompressed pixels handed to an OCR backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub color: ColorMode,
}

impl RasterImage {
    /// Wrap a pixel buffer, checking that its length matches the dimensions.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, color: ColorMode) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(color.bytes_per_pixel())?;
        if pixels.len() != expected || width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            pixels,
            width,
            height,
            color,
        })
    }

    pub fn bytes_per_line(&self) -> usize {
        self.width as usize * self.color.bytes_per_pixel()
    }

    pub fn to_dynamic(&self) -> Option<DynamicImage> {
        match self.color {
            ColorMode::Rgb8 => {
                RgbImage::from_raw(self.width, self.height, self.pixels.clone()).map(DynamicImage::ImageRgb8)
            }
            ColorMode::Gray8 => {
                GrayImage::from_raw(self.width, self.height, self.pixels.clone()).map(DynamicImage::ImageLuma8)
            }
        }
    }
}

impl From<DynamicImage> for RasterImage {
    /// Grayscale sources stay single-channel; everything else is flattened to RGB.
    fn from(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self {
                width: gray.width(),
                height: gray.height(),
                pixels: gray.into_raw(),
                color: ColorMode::Gray8,
            },
            other => {
                let rgb = other.to_rgb8();
                Self {
                    width: rgb.width(),
                    height: rgb.height(),
                    pixels: rgb.into_raw(),
                    color: ColorMode::Rgb8,
                }
            }
        }
    }
}
