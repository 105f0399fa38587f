//! Locating and decoding the raster image behind a PDF page.
//!
//! Scanned pages usually carry their content as a single Image XObject, sometimes
//! wrapped in one or more Form XObjects. [`PageImageResolver`] searches a page's
//! resource dictionary for a decodable image first and then descends into Form
//! XObjects through their own `/Resources`, up to a fixed depth and never visiting
//! the same form twice.

use super::error::{PdfError, Result};
use crate::ocr::{ColorMode, RasterImage};
use image::ImageFormat;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;

/// Parent chains longer than this are treated as cycles.
const MAX_PARENT_HOPS: usize = 64;

pub struct PageImageResolver<'a> {
    doc: &'a Document,
    max_form_depth: usize,
}

impl<'a> PageImageResolver<'a> {
    pub fn new(doc: &'a Document, max_form_depth: usize) -> Self {
        Self { doc, max_form_depth }
    }

    /// First decodable image reachable from the page, if any.
    pub fn find_page_image(&self, page_id: ObjectId) -> Option<RasterImage> {
        let Some(resources) = self.page_resources(page_id) else {
            tracing::warn!(page = ?page_id, "page has no resources, no image for OCR");
            return None;
        };

        let mut visited = HashSet::new();
        let found = self.search_resources(resources, 0, &mut visited);
        if found.is_none() {
            tracing::warn!(page = ?page_id, "no image found in the PDF page for OCR");
        }
        found
    }

    /// `/Resources` of the page, inherited through `/Parent` when absent.
    fn page_resources(&self, page_id: ObjectId) -> Option<&'a Dictionary> {
        let mut node = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_PARENT_HOPS {
            if let Ok(resources) = node.get(b"Resources") {
                return self.as_dict(resources);
            }
            let parent = node.get(b"Parent").ok()?;
            node = self.as_dict(parent)?;
        }
        None
    }

    fn search_resources(
        &self,
        resources: &'a Dictionary,
        depth: usize,
        visited: &mut HashSet<ObjectId>,
    ) -> Option<RasterImage> {
        let xobjects = self.as_dict(resources.get(b"XObject").ok()?)?;

        for (name, entry) in xobjects.iter() {
            let Some((_, stream)) = self.as_stream(entry) else {
                continue;
            };
            if !has_subtype(stream, b"Image") {
                continue;
            }
            match decode_image_xobject(self.doc, stream) {
                Ok(image) => {
                    tracing::debug!(
                        xobject = %String::from_utf8_lossy(name),
                        width = image.width,
                        height = image.height,
                        "decoded page image for OCR"
                    );
                    return Some(image);
                }
                Err(err) => {
                    tracing::warn!(xobject = %String::from_utf8_lossy(name), error = %err, "skipping image XObject");
                }
            }
        }

        if depth >= self.max_form_depth {
            tracing::debug!(depth, "form XObject nesting limit reached");
            return None;
        }

        for (_, entry) in xobjects.iter() {
            let Some((id, stream)) = self.as_stream(entry) else {
                continue;
            };
            if !has_subtype(stream, b"Form") {
                continue;
            }
            if let Some(id) = id
                && !visited.insert(id)
            {
                continue;
            }
            let Some(nested) = stream.dict.get(b"Resources").ok().and_then(|r| self.as_dict(r)) else {
                continue;
            };
            if let Some(image) = self.search_resources(nested, depth + 1, visited) {
                return Some(image);
            }
        }

        None
    }

    fn deref(&self, object: &'a Object) -> Option<(Option<ObjectId>, &'a Object)> {
        match object {
            Object::Reference(id) => self.doc.get_object(*id).ok().map(|o| (Some(*id), o)),
            other => Some((None, other)),
        }
    }

    fn as_dict(&self, object: &'a Object) -> Option<&'a Dictionary> {
        match self.deref(object)?.1 {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn as_stream(&self, object: &'a Object) -> Option<(Option<ObjectId>, &'a Stream)> {
        match self.deref(object)? {
            (id, Object::Stream(stream)) => Some((id, stream)),
            _ => None,
        }
    }
}

fn has_subtype(stream: &Stream, subtype: &[u8]) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == subtype)
}

fn resolve<'d>(doc: &'d Document, object: &'d Object) -> &'d Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn dict_integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::Integer(value) => Some(*value),
        Object::Real(value) => Some(*value as i64),
        _ => None,
    }
}

fn dict_name<'d>(doc: &'d Document, dict: &'d Dictionary, key: &[u8]) -> Option<&'d [u8]> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

fn filter_names<'d>(doc: &'d Document, dict: &'d Dictionary) -> Vec<&'d [u8]> {
    match dict.get(b"Filter").map(|f| resolve(doc, f)) {
        Ok(Object::Name(name)) => vec![name.as_slice()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match resolve(doc, item) {
                Object::Name(name) => Some(name.as_slice()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Turn an Image XObject into pixels.
///
/// JPEG streams (`/DCTDecode`, possibly behind other filters such as `/FlateDecode`)
/// are unwrapped and decoded as JPEG. Other streams are decompressed and interpreted
/// from `/ColorSpace` and `/BitsPerComponent`: 8-bit DeviceRGB, 8-bit DeviceGray, and
/// 1-bit DeviceGray (set bits become white).
pub fn decode_image_xobject(doc: &Document, stream: &Stream) -> Result<RasterImage> {
    let filters = filter_names(doc, &stream.dict);

    if let Some(position) = filters.iter().position(|f| *f == b"DCTDecode") {
        if position + 1 != filters.len() {
            return Err(PdfError::UnsupportedImage(format!(
                "filters after DCTDecode {:?}",
                filters.iter().map(|f| String::from_utf8_lossy(f)).collect::<Vec<_>>()
            )));
        }
        let jpeg = if position == 0 {
            stream.content.clone()
        } else {
            apply_filters(stream, &filters[..position])?
        };
        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)
            .map_err(|e| PdfError::ImageDecodingFailed(format!("JPEG: {}", e)))?;
        return Ok(RasterImage::from(decoded));
    }

    let width = dict_integer(doc, &stream.dict, b"Width")
        .and_then(|w| u32::try_from(w).ok())
        .ok_or_else(|| PdfError::UnsupportedImage("missing or invalid /Width".to_string()))?;
    let height = dict_integer(doc, &stream.dict, b"Height")
        .and_then(|h| u32::try_from(h).ok())
        .ok_or_else(|| PdfError::UnsupportedImage("missing or invalid /Height".to_string()))?;
    let bits = dict_integer(doc, &stream.dict, b"BitsPerComponent").unwrap_or(8);
    let color_space = dict_name(doc, &stream.dict, b"ColorSpace")
        .ok_or_else(|| PdfError::UnsupportedImage("colorspace is not a device name".to_string()))?;

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        apply_filters(stream, &filters)?
    };

    match (color_space, bits) {
        (b"DeviceRGB", 8) => raster_from_bytes(data, width, height, ColorMode::Rgb8),
        (b"DeviceGray", 8) => raster_from_bytes(data, width, height, ColorMode::Gray8),
        (b"DeviceGray", 1) => {
            let pixels = unpack_bilevel(&data, width, height)?;
            raster_from_bytes(pixels, width, height, ColorMode::Gray8)
        }
        (b"DeviceRGB" | b"DeviceGray", other) => {
            Err(PdfError::UnsupportedImage(format!("unsupported bits per component: {}", other)))
        }
        (other, _) => Err(PdfError::UnsupportedImage(format!(
            "unsupported colorspace: {}",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Run the stream content through `filters`, in order.
///
/// lopdf declines to decompress streams tagged as images, so the filters are applied
/// to an untagged copy.
fn apply_filters(stream: &Stream, filters: &[&[u8]]) -> Result<Vec<u8>> {
    let mut dict = Dictionary::new();
    dict.set(
        "Filter",
        Object::Array(filters.iter().map(|f| Object::Name(f.to_vec())).collect()),
    );
    match stream.dict.get(b"DecodeParms") {
        Ok(Object::Array(params)) => {
            dict.set("DecodeParms", Object::Array(params.iter().take(filters.len()).cloned().collect()));
        }
        Ok(params) if filters.len() == 1 && matches!(params, Object::Dictionary(_)) => {
            dict.set("DecodeParms", params.clone());
        }
        _ => {}
    }

    Stream::new(dict, stream.content.clone())
        .decompressed_content()
        .map_err(|e| PdfError::ImageDecodingFailed(format!("decompression: {}", e)))
}

fn raster_from_bytes(mut data: Vec<u8>, width: u32, height: u32, color: ColorMode) -> Result<RasterImage> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(color.bytes_per_pixel()))
        .ok_or_else(|| PdfError::UnsupportedImage(format!("image dimensions {}x{} are too large", width, height)))?;
    if data.len() < expected {
        return Err(PdfError::ImageDecodingFailed(format!(
            "expected {} bytes for {}x{} image, got {}",
            expected,
            width,
            height,
            data.len()
        )));
    }
    data.truncate(expected);
    RasterImage::new(data, width, height, color)
        .ok_or_else(|| PdfError::ImageDecodingFailed(format!("empty {}x{} image", width, height)))
}

/// Expand 1-bit rows (each padded to a byte boundary) to 8-bit grayscale.
pub fn unpack_bilevel(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let too_large = || PdfError::UnsupportedImage(format!("image dimensions {}x{} are too large", width, height));
    let width = width as usize;
    let height = height as usize;
    let row_bytes = width.div_ceil(8);
    let needed = row_bytes.checked_mul(height).ok_or_else(too_large)?;
    if data.len() < needed {
        return Err(PdfError::ImageDecodingFailed("1-bit buffer too short".to_string()));
    }
    let capacity = width.checked_mul(height).ok_or_else(too_large)?;

    let mut pixels = Vec::with_capacity(capacity);
    if row_bytes == 0 {
        return Ok(pixels);
    }
    for row in data.chunks_exact(row_bytes).take(height) {
        for x in 0..width {
            let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
            pixels.push(if bit == 1 { 255 } else { 0 });
        }
    }
    Ok(pixels)
}
