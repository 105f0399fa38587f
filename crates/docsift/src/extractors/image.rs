//! Standalone image extractor. The whole image is one chunk of OCR text.

use super::{ChunkStream, Extractor};
use crate::error::classify_io;
use crate::ocr::{OcrEngine, RasterImage};
use crate::types::{ExtractionChunk, Format};
use crate::{ParseError, Result};
use image::{ImageError, ImageReader};
use std::path::Path;
use std::sync::Arc;

pub struct ImageExtractor {
    ocr: Arc<OcrEngine>,
}

impl ImageExtractor {
    pub fn new(ocr: Arc<OcrEngine>) -> Self {
        Self { ocr }
    }
}

impl Extractor for ImageExtractor {
    fn name(&self) -> &str {
        "image-extractor"
    }

    fn format(&self) -> Format {
        Format::Image
    }

    fn extract(self: Box<Self>, path: &Path) -> Result<ChunkStream> {
        let raster = load_raster(path)?;
        tracing::debug!(
            image = %path.display(),
            width = raster.width,
            height = raster.height,
            "decoded image for OCR"
        );

        let text = self.ocr.image_to_text(&raster);
        Ok(Box::new(std::iter::once(Ok(ExtractionChunk::new(text, 1, Some(1))))))
    }
}

fn image_error(err: ImageError) -> ParseError {
    match err {
        ImageError::IoError(io_err) => classify_io(io_err, |e| {
            ParseError::corrupt_image_with_source("truncated or unreadable image data", e)
        }),
        other => ParseError::corrupt_image_with_source(other.to_string(), other),
    }
}

/// Decode `path` by its content, whatever its extension says.
pub fn load_raster(path: &Path) -> Result<RasterImage> {
    let reader = ImageReader::open(path)?
        .with_guessed_format()
        .map_err(|e| classify_io(e, |e| ParseError::corrupt_image_with_source("cannot read image header", e)))?;

    if reader.format().is_none() {
        return Err(ParseError::corrupt_image(format!(
            "unrecognized image encoding in {}",
            path.display()
        )));
    }

    let decoded = reader.decode().map_err(image_error)?;
    Ok(RasterImage::from(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OcrConfig;
    use crate::ocr::{ColorMode, OcrBackend, OcrError};
    use image::{GrayImage, ImageFormat, Luma};
    use std::fs;
    use tempfile::tempdir;

    struct Describe;

    impl OcrBackend for Describe {
        fn name(&self) -> &str {
            "describe"
        }

        fn recognize(&self, image: &RasterImage, _config: &OcrConfig) -> std::result::Result<String, OcrError> {
            Ok(format!("{:?} {}x{}", image.color, image.width, image.height))
        }
    }

    fn write_gray_png(path: &Path) {
        let img = GrayImage::from_pixel(4, 3, Luma([200u8]));
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    #[test]
    fn test_single_chunk_of_ocr_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.png");
        write_gray_png(&path);

        let ocr = Arc::new(OcrEngine::with_backend(OcrConfig::default(), Describe));
        let chunks: Vec<_> = Box::new(ImageExtractor::new(ocr))
            .extract(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Gray8 4x3");
        assert_eq!(chunks[0].percent(), 100);
    }

    #[test]
    fn test_misleading_extension_decoded_by_content() {
        let dir = tempdir().unwrap();
        let png = dir.path().join("scan.png");
        write_gray_png(&png);
        let renamed = dir.path().join("scan.dat");
        fs::rename(&png, &renamed).unwrap();

        let raster = load_raster(&renamed).unwrap();
        assert_eq!(raster.color, ColorMode::Gray8);
        assert_eq!((raster.width, raster.height), (4, 3));
    }

    #[test]
    fn test_not_an_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.png");
        fs::write(&path, b"definitely not pixels").unwrap();

        let err = load_raster(&path).unwrap_err();
        assert!(matches!(err, ParseError::CorruptImage { .. }));
    }

    #[test]
    fn test_truncated_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cut.png");
        write_gray_png(&path);
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let err = load_raster(&path).unwrap_err();
        assert!(matches!(err, ParseError::CorruptImage { .. }));
    }
}
