use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use super::{CertificateDetails, RendererConfig};

/// A4 landscape at roughly 96 DPI.
pub const CANVAS_WIDTH: u32 = 1123;
pub const CANVAS_HEIGHT: u32 = 794;

const BACKGROUND: Rgb<u8> = Rgb([0xfd, 0xf6, 0xe3]);
const INK: Rgb<u8> = Rgb([0x2d, 0x34, 0x36]);

const BORDER_INSET: u32 = 30;
const BORDER_WIDTH: u32 = 10;

const DATE_FORMAT: &str = "%a %b %d %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Display,
    Body,
    Italic,
}

struct Line {
    baseline: f32,
    size: f32,
    face: Face,
    text: String,
}

impl Line {
    fn new(baseline: f32, size: f32, face: Face, text: impl Into<String>) -> Self {
        Self {
            baseline,
            size,
            face,
            text: text.into(),
        }
    }
}

/// Draw the certificate template onto a fresh canvas.
///
/// Text positions are fixed; long names are not scaled down and may run past
/// the border.
pub fn draw_certificate(fonts: &RendererConfig, details: &CertificateDetails) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, BACKGROUND);
    draw_border(&mut canvas);

    for line in template_lines(details) {
        let font = match line.face {
            Face::Display => fonts.display(),
            Face::Body => fonts.body(),
            Face::Italic => fonts.italic(),
        };
        draw_centered(&mut canvas, font, &line);
    }

    canvas
}

fn template_lines(details: &CertificateDetails) -> Vec<Line> {
    vec![
        Line::new(100.0, 40.0, Face::Display, "OriginHash"),
        Line::new(200.0, 55.0, Face::Display, "Certificate of Completion"),
        Line::new(260.0, 24.0, Face::Italic, "This is proudly presented to"),
        Line::new(330.0, 45.0, Face::Display, details.student_name.as_str()),
        Line::new(380.0, 24.0, Face::Body, "for successfully completing the course"),
        Line::new(430.0, 32.0, Face::Display, details.course_name.as_str()),
        Line::new(
            500.0,
            20.0,
            Face::Body,
            format!("Issued on: {}", details.issue_date.format(DATE_FORMAT)),
        ),
        Line::new(
            540.0,
            20.0,
            Face::Body,
            format!("Valid until: {}", details.expiry_date.format(DATE_FORMAT)),
        ),
        Line::new(
            600.0,
            16.0,
            Face::Body,
            format!("Certificate ID: {}", details.unique_id),
        ),
        Line::new(660.0, 20.0, Face::Display, "_____________________"),
        Line::new(690.0, 20.0, Face::Display, "Authorized by OriginHash"),
    ]
}

// Stroke is centred on the frame edge, half inside and half outside.
fn draw_border(canvas: &mut RgbImage) {
    let half = BORDER_WIDTH / 2;
    let outer = Rect::at((BORDER_INSET - half) as i32, (BORDER_INSET - half) as i32).of_size(
        CANVAS_WIDTH - 2 * BORDER_INSET + BORDER_WIDTH,
        CANVAS_HEIGHT - 2 * BORDER_INSET + BORDER_WIDTH,
    );
    let inner = Rect::at((BORDER_INSET + half) as i32, (BORDER_INSET + half) as i32).of_size(
        CANVAS_WIDTH - 2 * BORDER_INSET - BORDER_WIDTH,
        CANVAS_HEIGHT - 2 * BORDER_INSET - BORDER_WIDTH,
    );

    draw_filled_rect_mut(canvas, outer, INK);
    draw_filled_rect_mut(canvas, inner, BACKGROUND);
}

fn draw_centered(canvas: &mut RgbImage, font: &FontArc, line: &Line) {
    let scale = PxScale::from(line.size);
    let (width, _) = text_size(scale, font, &line.text);
    let x = (CANVAS_WIDTH as i32 - width as i32) / 2;
    // draw_text_mut positions by the top of the line box, not the baseline
    let top = line.baseline - font.as_scaled(scale).ascent();

    draw_text_mut(canvas, INK, x, top.round() as i32, scale, font, &line.text);
}
