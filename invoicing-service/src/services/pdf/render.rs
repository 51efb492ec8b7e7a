//! Draws a laid-out [`Document`] with printpdf.

use super::layout::text_width;
use super::{Align, Block, Document, PdfError, Rgb, Weight, PAGE_HEIGHT, PAGE_WIDTH};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
};
use std::io::BufWriter;

fn color(rgb: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(
        f32::from(rgb.r) / 255.0,
        f32::from(rgb.g) / 255.0,
        f32::from(rgb.b) / 255.0,
        None,
    ))
}

/// Layout y runs down from the top edge, PDF y runs up from the bottom.
fn flip(y: f32) -> Mm {
    Mm(PAGE_HEIGHT - y)
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn draw(layer: &PdfLayerReference, fonts: &Fonts, block: &Block) {
    match block {
        Block::Text {
            x,
            y,
            text,
            size,
            weight,
            color: rgb,
            align,
        } => {
            let x = match align {
                Align::Left => *x,
                Align::Center => x - text_width(text, *size) / 2.0,
                Align::Right => x - text_width(text, *size),
            };
            let font = match weight {
                Weight::Regular => &fonts.regular,
                Weight::Bold => &fonts.bold,
            };
            layer.set_fill_color(color(*rgb));
            layer.use_text(text.as_str(), *size, Mm(x), flip(*y), font);
        }
        Block::Rect {
            x,
            y,
            width,
            height,
            color: rgb,
        } => {
            layer.set_fill_color(color(*rgb));
            let rect = Rect::new(Mm(*x), flip(y + height), Mm(x + width), flip(*y))
                .with_mode(PaintMode::Fill);
            layer.add_rect(rect);
        }
        Block::Line {
            from,
            to,
            thickness,
            color: rgb,
        } => {
            layer.set_outline_color(color(*rgb));
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(from.0), flip(from.1)), false),
                    (Point::new(Mm(to.0), flip(to.1)), false),
                ],
                is_closed: false,
            });
        }
    }
}

pub fn render(document: &Document) -> Result<Vec<u8>, PdfError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        document.title.as_str(),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::Font(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PdfError::Font(e.to_string()))?,
    };

    for (index, page) in document.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page_index).get_layer(layer_index)
        };
        for block in &page.blocks {
            draw(&layer, &fonts, block);
        }
    }

    let mut writer = BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer)
        .map_err(|e| PdfError::Write(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| PdfError::Write(e.to_string()))
}
