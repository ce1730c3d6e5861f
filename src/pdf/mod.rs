// Certificate PDF generation
// Wraps the rendered PNG in a single A4 landscape page using genpdf.
use genpdf::elements::Image;
use genpdf::{Document, SimplePageDecorator, Size};
use std::io::Cursor;

use crate::render::{RenderError, RendererConfig, CANVAS_WIDTH};

const PAGE_WIDTH_MM: f64 = 297.0;
const PAGE_HEIGHT_MM: f64 = 210.0;
const MM_PER_INCH: f64 = 25.4;

/// Build a one-page PDF with `png` scaled to the full page width.
///
/// genpdf needs a font family even for image-only pages, so the body face from
/// the renderer configuration is reused for every style.
pub fn wrap_png(png: &[u8], fonts: &RendererConfig) -> Result<Vec<u8>, RenderError> {
    let font = genpdf::fonts::FontData::new(fonts.body_font_data().to_vec(), None)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let family = genpdf::fonts::FontFamily {
        regular: font.clone(),
        bold: font.clone(),
        italic: font.clone(),
        bold_italic: font,
    };

    let mut doc = Document::new(family);
    doc.set_title("Certificate of Completion");
    doc.set_paper_size(Size::new(PAGE_WIDTH_MM, PAGE_HEIGHT_MM));

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(0);
    doc.set_page_decorator(decorator);

    // Pick the DPI that maps the canvas width exactly onto the page width.
    let dpi = f64::from(CANVAS_WIDTH) / (PAGE_WIDTH_MM / MM_PER_INCH);
    let image = Image::from_reader(Cursor::new(png))
        .map_err(|e| RenderError::Pdf(e.to_string()))?
        .with_dpi(dpi);
    doc.push(image);

    let mut out = Vec::new();
    doc.render(&mut out)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    Ok(out)
}
