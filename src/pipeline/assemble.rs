//! PDF assembly: PNG bytes → one-page PDF with the image filling the page.
//!
//! The page MediaBox is `[0 0 W H]` with 1 pt per pixel, so the aspect ratio
//! is preserved by construction. The PNG is decoded back to pixels and
//! embedded as a FlateDecode RGB image XObject; when any pixel is not opaque
//! the alpha channel goes into a DeviceGray soft mask.
//!
//! No Info dictionary, document ID or timestamp is written: the same PNG
//! always produces the same bytes.

use crate::config::CompressionLevel;
use crate::error::Svg2PdfError;
use flate2::write::ZlibEncoder;
use image::ImageFormat;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref};
use std::io::Write;
use tracing::{debug, info};

const IMAGE_NAME: Name<'static> = Name(b"Im1");

/// A serialised single-page PDF.
#[derive(Debug, Clone)]
pub struct AssembledPdf {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub has_transparency: bool,
}

/// Build a one-page PDF around a PNG image.
pub fn assemble_pdf(png: &[u8], compression: CompressionLevel) -> Result<AssembledPdf, Svg2PdfError> {
    let rgba = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| Svg2PdfError::EncodeFailed {
            detail: format!("PNG could not be read back: {}", e),
        })?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(Svg2PdfError::PdfAssemblyFailed {
            detail: format!("image has no area ({}x{})", width, height),
        });
    }

    let pixels = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for px in rgba.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }
    let has_transparency = alpha.iter().any(|&a| a != u8::MAX);

    let level = compression.to_flate();
    let rgb = deflate(&rgb, level)?;
    let alpha = if has_transparency {
        Some(deflate(&alpha, level)?)
    } else {
        None
    };

    let bytes = write_document(width, height, &rgb, alpha.as_deref());
    info!(
        "Assembled PDF: {}x{} pt page, {} bytes",
        width,
        height,
        bytes.len()
    );

    Ok(AssembledPdf {
        bytes,
        width,
        height,
        has_transparency,
    })
}

fn deflate(data: &[u8], level: flate2::Compression) -> Result<Vec<u8>, Svg2PdfError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| Svg2PdfError::PdfAssemblyFailed {
            detail: format!("deflate failed: {}", e),
        })
}

fn write_document(width: u32, height: u32, rgb: &[u8], alpha: Option<&[u8]>) -> Vec<u8> {
    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let page_id = Ref::new(3);
    let content_id = Ref::new(4);
    let image_id = Ref::new(5);
    let mask_id = Ref::new(6);

    let (w, h) = (width as f32, height as f32);
    let mut pdf = Pdf::new();

    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id).kids([page_id]).count(1);

    let mut page = pdf.page(page_id);
    page.media_box(Rect::new(0.0, 0.0, w, h));
    page.parent(page_tree_id);
    page.contents(content_id);
    page.resources().x_objects().pair(IMAGE_NAME, image_id);
    page.finish();

    let mut image = pdf.image_xobject(image_id, rgb);
    image.filter(Filter::FlateDecode);
    image.width(width as i32);
    image.height(height as i32);
    image.color_space().device_rgb();
    image.bits_per_component(8);
    if alpha.is_some() {
        image.s_mask(mask_id);
    }
    image.finish();

    if let Some(alpha) = alpha {
        let mut mask = pdf.image_xobject(mask_id, alpha);
        mask.filter(Filter::FlateDecode);
        mask.width(width as i32);
        mask.height(height as i32);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        mask.finish();
    }

    // Unit square scaled to the page: the image covers it edge to edge.
    let mut content = Content::new();
    content.save_state();
    content.transform([w, 0.0, 0.0, h, 0.0, 0.0]);
    content.x_object(IMAGE_NAME);
    content.restore_state();
    let content = content.finish();
    pdf.stream(content_id, &content);

    let bytes = pdf.finish();
    debug!("Serialised {} PDF objects", if alpha.is_some() { 6 } else { 5 });
    bytes
}
