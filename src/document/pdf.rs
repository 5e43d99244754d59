// src/document/pdf.rs
// In-memory PDF assembly: title page (with optional illustration), then story pages

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::path::Path;
use tracing::debug;

use crate::content::paragraphs;
use crate::error::Result;

// A4 in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;

const TITLE_FONT_SIZE: f32 = 28.0;
const TITLE_LEADING: f32 = 34.0;
const TITLE_COLOR: [f32; 3] = [0.16, 0.32, 0.62];

const BODY_FONT_SIZE: f32 = 12.0;
const BODY_LEADING: f32 = 16.0;

// Bounding box for the illustration below the title
const IMAGE_MAX_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const IMAGE_MAX_HEIGHT: f32 = 520.0;
const IMAGE_GAP: f32 = 24.0;

// Helvetica averages roughly half an em per glyph
const AVG_GLYPH_WIDTH: f32 = 0.5;

const DEFAULT_TITLE: &str = "Story";

/// Build a PDF with the title (and illustration, when given) on page one
/// and the story text on the following pages.
pub fn build_pdf(title: &str, image_path: Option<&Path>, story: &str) -> Result<Vec<u8>> {
    let title = match title.trim() {
        "" => DEFAULT_TITLE,
        t => t,
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let title_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let body_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let fonts = dictionary! {
        "F1" => title_font,
        "F2" => body_font,
    };

    let mut kids: Vec<Object> = Vec::new();

    // Page 1: title and illustration
    let mut resources = dictionary! { "Font" => fonts.clone() };
    let mut operations = title_operations(title);
    let title_lines = wrap_text(title, chars_per_line(TITLE_FONT_SIZE)).len() as f32;
    let title_bottom = PAGE_HEIGHT - MARGIN - title_lines * TITLE_LEADING;

    if let Some(path) = image_path {
        let (image_id, width, height) = add_image(&mut doc, path)?;
        resources.set("XObject", dictionary! { "Im1" => image_id });
        operations.extend(image_operations(width, height, title_bottom - IMAGE_GAP));
    }

    kids.push(add_page(&mut doc, pages_id, resources, operations)?.into());

    // Page 2+: story body
    let lines = wrap_text(story, chars_per_line(BODY_FONT_SIZE));
    let lines_per_page = ((PAGE_HEIGHT - 2.0 * MARGIN) / BODY_LEADING).floor().max(1.0) as usize;

    for chunk in lines.chunks(lines_per_page) {
        let resources = dictionary! { "Font" => fonts.clone() };
        let page_id = add_page(&mut doc, pages_id, resources, body_operations(chunk))?;
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;

    debug!("Assembled PDF: {} pages, {} bytes", page_count, buffer.len());
    Ok(buffer)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    resources: Dictionary,
    operations: Vec<Operation>,
) -> Result<ObjectId> {
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources,
    }))
}

/// Decode the image and embed it as an RGB XObject; returns its id and pixel size.
fn add_image(doc: &mut Document, path: &Path) -> Result<(ObjectId, u32, u32)> {
    let bytes = std::fs::read(path)?;
    let rgb = image::load_from_memory(&bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    );

    Ok((doc.add_object(stream), width, height))
}

fn title_operations(title: &str) -> Vec<Operation> {
    let [r, g, b] = TITLE_COLOR;
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new("Tf", vec!["F1".into(), TITLE_FONT_SIZE.into()]),
    ];

    let mut y = PAGE_HEIGHT - MARGIN - TITLE_FONT_SIZE;
    for line in wrap_text(title, chars_per_line(TITLE_FONT_SIZE)) {
        let width = text_width(&line, TITLE_FONT_SIZE);
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
        let matrix: Vec<Object> = vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()];
        ops.push(Operation::new("Tm", matrix));
        ops.push(Operation::new("Tj", vec![Object::string_literal(encode_latin1(&line))]));
        y -= TITLE_LEADING;
    }

    ops.push(Operation::new("ET", vec![]));
    ops
}

/// Draw Im1 scaled to fit the bounding box, centered, its top edge at `top`.
fn image_operations(width: u32, height: u32, top: f32) -> Vec<Operation> {
    let (w, h) = fit_within(width as f32, height as f32, IMAGE_MAX_WIDTH, IMAGE_MAX_HEIGHT);
    let x = (PAGE_WIDTH - w) / 2.0;
    let y = (top - h).max(MARGIN);

    vec![
        Operation::new("q", vec![]),
        Operation::new("cm", vec![w.into(), 0.into(), 0.into(), h.into(), x.into(), y.into()]),
        Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

fn body_operations(lines: &[String]) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), BODY_FONT_SIZE.into()]),
        Operation::new("TL", vec![BODY_LEADING.into()]),
        Operation::new(
            "Td",
            vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN - BODY_FONT_SIZE).into()],
        ),
    ];

    for line in lines {
        if !line.is_empty() {
            ops.push(Operation::new("Tj", vec![Object::string_literal(encode_latin1(line))]));
        }
        ops.push(Operation::new("T*", vec![]));
    }

    ops.push(Operation::new("ET", vec![]));
    ops
}

/// Scale (w, h) to fit inside (max_w, max_h), preserving aspect ratio.
fn fit_within(w: f32, h: f32, max_w: f32, max_h: f32) -> (f32, f32) {
    if w <= 0.0 || h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_w / w).min(max_h / h);
    (w * scale, h * scale)
}

fn chars_per_line(font_size: f32) -> usize {
    ((PAGE_WIDTH - 2.0 * MARGIN) / (font_size * AVG_GLYPH_WIDTH)).floor() as usize
}

fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * AVG_GLYPH_WIDTH
}

/// Greedy word wrap. Paragraph breaks survive as empty lines; words longer
/// than a line are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in paragraphs(text) {
        if !lines.is_empty() {
            lines.push(String::new());
        }

        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let current_len = current.chars().count();
            if current_len > 0 && current_len + 1 + word.len() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// WinAnsi bytes for the standard Type1 fonts; unmappable characters become '?'.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => b'\'',
            '\u{201C}' | '\u{201D}' => b'"',
            '\u{2013}' | '\u{2014}' => b'-',
            '\u{2026}' => b'.',
            c if (c as u32) < 0x100 => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
