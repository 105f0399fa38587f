//! OCR through the `tesseract` executable.
//!
//! The raster is PNG-encoded and piped to `tesseract stdin stdout`; recognized text is
//! read back from stdout.

use super::engine::OcrBackend;
use super::error::OcrError;
use super::types::RasterImage;
use crate::core::config::OcrConfig;
use image::ImageFormat;
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

#[derive(Debug, Clone)]
pub struct TesseractCliBackend {
    command: String,
    version: String,
}

impl TesseractCliBackend {
    /// Check that `command` runs and reports a version.
    pub fn probe(command: &str) -> Result<Self, OcrError> {
        let output = Command::new(command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| OcrError::BackendUnavailable(format!("Failed to execute {}: {}", command, e)))?;

        if !output.status.success() {
            return Err(OcrError::BackendUnavailable(format!(
                "{} --version exited with {}",
                command, output.status
            )));
        }

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        let version = String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(Self {
            command: command.to_string(),
            version,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl OcrBackend for TesseractCliBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &RasterImage, config: &OcrConfig) -> Result<String, OcrError> {
        let png = encode_png(image)?;

        let mut child = Command::new(&self.command)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&config.language)
            .arg("--psm")
            .arg(config.psm.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::IOError(format!("Failed to execute {}: {}", self.command, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::IOError("tesseract stdin was not captured".to_string()))?;
        let writer = std::thread::spawn(move || stdin.write_all(&png));

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::IOError(format!("Failed to wait for tesseract: {}", e)))?;

        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(OcrError::IOError(format!("Failed to write image to tesseract: {}", e))),
            Err(_) => return Err(OcrError::IOError("tesseract writer thread panicked".to_string())),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn encode_png(image: &RasterImage) -> Result<Vec<u8>, OcrError> {
    let dynamic = image.to_dynamic().ok_or_else(|| {
        OcrError::ImageProcessingFailed(format!(
            "pixel buffer does not match {}x{} {:?}",
            image.width, image.height, image.color
        ))
    })?;

    let mut png = Vec::new();
    dynamic
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| OcrError::ImageProcessingFailed(format!("PNG encoding failed: {}", e)))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::types::ColorMode;

    #[test]
    fn test_probe_missing_binary() {
        let err = TesseractCliBackend::probe("/nonexistent/bin/tesseract").unwrap_err();
        assert!(matches!(err, OcrError::BackendUnavailable(_)));
    }

    #[test]
    fn test_encode_png_signature() {
        let image = RasterImage::new(vec![0, 128, 255, 64], 2, 2, ColorMode::Gray8).unwrap();
        let png = encode_png(&image).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_encode_png_rejects_mismatched_buffer() {
        let image = RasterImage {
            pixels: vec![0; 5],
            width: 2,
            height: 2,
            color: ColorMode::Rgb8,
        };
        assert!(matches!(encode_png(&image), Err(OcrError::ImageProcessingFailed(_))));
    }
}
