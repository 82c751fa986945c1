//! PDF text and page-image extraction using lopdf and pdf-extract.

use std::panic::{self, AssertUnwindSafe};

use image::{DynamicImage, ImageBuffer, Luma, Rgba};
use image::imageops::FilterType;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::{PdfProcessor, Result};
use crate::error::DocumentError;

/// US Letter in points, used when a page has no readable MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Upper bound on the pixels of a rendered page or decoded image
/// (A4 at about 1200 dpi).
const MAX_PIXELS: u64 = 150_000_000;

/// Maximum depth followed through the page tree's `Parent` links.
const MAX_TREE_DEPTH: usize = 32;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    /// Native text per page, index 0 = page 1.
    page_texts: Vec<String>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            page_texts: Vec::new(),
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or(DocumentError::Parse("No document loaded".to_string()))
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        let doc = self.document()?;
        doc.get_pages()
            .get(&page)
            .copied()
            .ok_or(DocumentError::InvalidPage(page))
    }

    /// Page size in points from the (possibly inherited) MediaBox.
    pub fn page_size(&self, page: u32) -> Result<(f32, f32)> {
        let doc = self.document()?;
        let page_id = self.page_id(page)?;

        let size = inherited_attribute(doc, page_id, b"MediaBox", 0)
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| {
                let nums: Vec<f32> = arr.iter().filter_map(number).collect();
                if nums.len() == 4 {
                    Some(((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs()))
                } else {
                    None
                }
            })
            .filter(|(w, h)| *w > 0.0 && *h > 0.0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Ok(size)
    }

    fn try_extract_image_from_object(&self, doc: &Document, obj: &Object) -> Option<DynamicImage> {
        if let Object::Stream(stream) = obj {
            let dict = &stream.dict;

            // Check if it's an image XObject
            let subtype = dict.get(b"Subtype").ok()?;
            if subtype.as_name().ok()? != b"Image" {
                return None;
            }

            let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
            let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;

            trace!("Found image object: {}x{}", width, height);

            let data = match stream.decompressed_content() {
                Ok(d) => d,
                Err(_) => stream.content.clone(),
            };

            if let Ok(filter) = dict.get(b"Filter") {
                let filter_name = match filter {
                    Object::Name(name) => Some(name.as_slice()),
                    Object::Array(arr) if !arr.is_empty() => {
                        arr.first().and_then(|o| o.as_name().ok())
                    }
                    _ => None,
                };

                match filter_name {
                    Some(b"DCTDecode") => {
                        // JPEG data is stored as-is
                        return image::load_from_memory_with_format(
                            &stream.content,
                            image::ImageFormat::Jpeg,
                        )
                        .ok();
                    }
                    Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                        trace!("Unsupported image filter");
                        return None;
                    }
                    _ => {}
                }
            }

            let color_space = dict
                .get(b"ColorSpace")
                .ok()
                .and_then(|o| match o {
                    Object::Name(name) => Some(name.as_slice()),
                    Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                    Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                    _ => None,
                })
                .unwrap_or(b"DeviceRGB");

            let bits = dict
                .get(b"BitsPerComponent")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(8) as u8;

            return decode_raw_image(&data, width, height, color_space, bits);
        }
        None
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| DocumentError::Parse(e.to_string()))?;

        // PDFs encrypted with an empty user password are still readable
        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(DocumentError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| DocumentError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(DocumentError::NoPages);
        }

        // pdf-extract panics on some PDFs lopdf reads fine (fonts missing
        // /BaseFont, for one); those fall back to lopdf per page.
        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&raw_data)
        }));
        self.page_texts = match extracted {
            Ok(Ok(texts)) => texts,
            Ok(Err(e)) => {
                debug!("pdf-extract failed, using lopdf text extraction: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!("pdf-extract panicked, using lopdf text extraction");
                Vec::new()
            }
        };

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        let doc = self.document()?;
        if page == 0 || page > self.page_count() {
            return Err(DocumentError::InvalidPage(page));
        }

        if let Some(text) = self.page_texts.get((page - 1) as usize) {
            return Ok(text.clone());
        }

        match doc.extract_text(&[page]) {
            Ok(text) => Ok(text),
            Err(e) => {
                // An undecodable text layer is treated like a missing one
                debug!("No readable text layer on page {}: {}", page, e);
                Ok(String::new())
            }
        }
    }

    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage> {
        let (width_pt, height_pt) = self.page_size(page)?;
        let width = ((width_pt as f64 / 72.0) * dpi as f64).round().max(1.0);
        let height = ((height_pt as f64 / 72.0) * dpi as f64).round().max(1.0);
        if width * height > MAX_PIXELS as f64 {
            return Err(DocumentError::PageTooLarge {
                page,
                width: width as u64,
                height: height as u64,
            });
        }
        let (width, height) = (width as u32, height as u32);

        let largest = self
            .extract_images(page)?
            .into_iter()
            .max_by_key(|img| img.width() as u64 * img.height() as u64);

        match largest {
            Some(img) => {
                debug!(
                    "Rendering page {} from {}x{} image at {}x{} ({} dpi)",
                    page,
                    img.width(),
                    img.height(),
                    width,
                    height,
                    dpi
                );
                Ok(img.resize_exact(width, height, FilterType::Triangle))
            }
            None => {
                debug!("Page {} has no images, rendering blank {}x{}", page, width, height);
                Ok(DynamicImage::ImageLuma8(ImageBuffer::from_pixel(
                    width,
                    height,
                    Luma([255u8]),
                )))
            }
        }
    }

    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let doc = self.document()?;
        let page_id = self.page_id(page)?;

        let mut images = Vec::new();

        let resources = inherited_attribute(doc, page_id, b"Resources", 0)
            .and_then(|obj| obj.as_dict().ok());

        if let Some(resources) = resources {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = doc.dereference(obj_ref) {
                            if let Some(img) = self.try_extract_image_from_object(doc, obj) {
                                images.push(img);
                            }
                        }
                    }
                }
            }
        }

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }
}

/// Look up a page attribute, following `Parent` links for inherited ones.
fn inherited_attribute<'a>(
    doc: &'a Document,
    node_id: ObjectId,
    key: &[u8],
    depth: usize,
) -> Option<&'a Object> {
    if depth > MAX_TREE_DEPTH {
        return None;
    }

    let dict = doc.get_object(node_id).ok()?.as_dict().ok()?;
    if let Ok(value) = dict.get(key) {
        return doc.dereference(value).ok().map(|(_, obj)| obj);
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => inherited_attribute(doc, *parent_id, key, depth + 1),
        _ => None,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn decode_raw_image(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = (width as u64).checked_mul(height as u64)?;
    if pixels == 0 || pixels > MAX_PIXELS {
        trace!("Rejecting image of {}x{}", width, height);
        return None;
    }
    let expected_gray = usize::try_from(pixels).ok()?;
    let expected_rgb = expected_gray.checked_mul(3)?;

    if (color_space == b"DeviceRGB" || color_space == b"RGB") && data.len() >= expected_rgb {
        let mut rgba_data = Vec::with_capacity(expected_gray.checked_mul(4)?);
        for chunk in data[..expected_rgb].chunks(3) {
            rgba_data.extend_from_slice(chunk);
            rgba_data.push(255);
        }
        return ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba_data)
            .map(DynamicImage::ImageRgba8);
    }

    if (color_space == b"DeviceGray" || color_space == b"G") && data.len() >= expected_gray {
        return ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data[..expected_gray].to_vec())
            .map(DynamicImage::ImageLuma8);
    }

    trace!(
        "Could not decode image: data_len={}, expected_rgb={}, expected_gray={}",
        data.len(),
        expected_rgb,
        expected_gray
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let mut extractor = PdfExtractor::new();
        let err = extractor.load(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, DocumentError::Parse(_)));
    }

    #[test]
    fn test_decode_gray() {
        let img = decode_raw_image(&[0, 255, 128, 64], 2, 2, b"DeviceGray", 8).unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
    }

    #[test]
    fn test_decode_rejects_short_data() {
        assert!(decode_raw_image(&[0, 1, 2], 2, 2, b"DeviceRGB", 8).is_none());
        assert!(decode_raw_image(&[0; 16], 2, 2, b"DeviceGray", 1).is_none());
    }

    #[test]
    fn test_decode_rejects_oversized_dimensions() {
        assert!(decode_raw_image(&[0; 12], 70_000, 70_000, b"DeviceRGB", 8).is_none());
        assert!(decode_raw_image(&[0; 12], u32::MAX, u32::MAX, b"DeviceGray", 8).is_none());
        assert!(decode_raw_image(&[], 0, 4, b"DeviceGray", 8).is_none());
    }
}
