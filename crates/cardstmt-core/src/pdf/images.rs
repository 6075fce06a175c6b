//! Embedded page images for the OCR backend.

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use crate::error::PdfError;

/// Image XObjects referenced from a page's resources, inherited ones included.
pub fn page_images(doc: &Document, page: u32) -> Result<Vec<DynamicImage>, PdfError> {
    let pages = doc.get_pages();
    let page_id = pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

    let mut images = Vec::new();
    if let Some(resources) = page_resources(doc, *page_id) {
        if let Ok(xobjects) = resources.get(b"XObject") {
            if let Ok((_, Object::Dictionary(xobjects))) = doc.dereference(xobjects) {
                for (_, reference) in xobjects.iter() {
                    if let Ok((_, object)) = doc.dereference(reference) {
                        if let Some(img) = decode_image_object(doc, object) {
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

/// The image to OCR for one page.
///
/// Prefers the page's own first image, then the document image at the
/// same index, then the first document image.
pub fn page_image(doc: &Document, page: u32) -> Result<DynamicImage, PdfError> {
    if let Some(first) = page_images(doc, page)?.into_iter().next() {
        return Ok(first);
    }

    let mut images = all_images(doc);
    let index = page.saturating_sub(1) as usize;
    if index < images.len() {
        return Ok(images.swap_remove(index));
    }
    images
        .into_iter()
        .next()
        .ok_or_else(|| PdfError::ImageExtraction(format!("no images found for page {}", page)))
}

/// Every decodable image object in the document.
pub fn all_images(doc: &Document) -> Vec<DynamicImage> {
    let images: Vec<DynamicImage> = doc
        .objects
        .values()
        .filter_map(|object| decode_image_object(doc, object))
        .collect();
    debug!("Found {} images in document", images.len());
    images
}

fn decode_image_object(doc: &Document, object: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = object else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;
    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(filters) => filters.first().and_then(|f| f.as_name().ok()),
            _ => None,
        };
        match filter {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg).ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Skipping unsupported image filter");
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

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
        .unwrap_or(8);

    image_from_raw(&data, width, height, color_space, bits)
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let value = dict.get(key).ok()?.as_i64().ok()?;
    u32::try_from(value).ok().filter(|&v| v > 0)
}

fn image_from_raw(data: &[u8], width: u32, height: u32, color_space: &[u8], bits: i64) -> Option<DynamicImage> {
    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    let pixels = (width as usize).checked_mul(height as usize)?;
    let rgb_len = pixels.checked_mul(3)?;
    let rgba: Vec<u8> = match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= rgb_len => data[..rgb_len]
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        b"DeviceGray" | b"G" if data.len() >= pixels => data[..pixels]
            .iter()
            .flat_map(|&gray| [gray, gray, gray, 255])
            .collect(),
        _ => {
            trace!(
                "Could not decode image: colorspace={:?}, data_len={}, pixels={}",
                String::from_utf8_lossy(color_space),
                data.len(),
                pixels
            );
            return None;
        }
    };

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

/// Resources dictionary for a page, following `Parent` links for inherited resources.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let Object::Dictionary(dict) = doc.get_object(node_id).ok()? else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(resources))) = doc.dereference(resources) {
            return Some(resources.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent)) => page_resources(doc, *parent),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_gray_image_from_raw() {
        let img = image_from_raw(&[0, 128, 255, 64], 2, 2, b"DeviceGray", 8).unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
        assert_eq!(img.to_rgba8().get_pixel(1, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn test_rgb_image_from_raw() {
        let data = [10, 20, 30, 40, 50, 60];
        let img = image_from_raw(&data, 2, 1, b"DeviceRGB", 8).unwrap();
        assert_eq!(img.to_rgba8().get_pixel(1, 0).0, [40, 50, 60, 255]);
    }

    #[test]
    fn test_short_or_unsupported_data() {
        assert!(image_from_raw(&[0, 1], 2, 2, b"DeviceGray", 8).is_none());
        assert!(image_from_raw(&[0; 16], 2, 2, b"DeviceGray", 1).is_none());
        assert!(image_from_raw(&[0; 16], 2, 2, b"DeviceCMYK", 8).is_none());
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        assert!(image_from_raw(&[0; 16], u32::MAX, u32::MAX, b"DeviceRGB", 8).is_none());
        assert!(image_from_raw(&[0; 16], u32::MAX, u32::MAX, b"DeviceGray", 8).is_none());
    }

    #[test]
    fn test_bad_image_dictionary_dimensions() {
        let doc = Document::with_version("1.5");
        let image = |width: i64, height: i64| {
            Object::Stream(Stream::new(
                dictionary! {
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                vec![0; 4],
            ))
        };

        assert!(decode_image_object(&doc, &image(2, 2)).is_some());
        assert!(decode_image_object(&doc, &image(-2, 2)).is_none());
        assert!(decode_image_object(&doc, &image(2, 0)).is_none());
        assert!(decode_image_object(&doc, &image(i64::from(u32::MAX) + 1, 1)).is_none());
    }
}
