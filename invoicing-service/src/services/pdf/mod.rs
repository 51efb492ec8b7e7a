//! Invoice and agreement PDFs.
//!
//! Layout and rendering are separate steps: [`layout`] turns an invoice or
//! contract into a [`Document`] of positioned [`Block`]s on A4 pages, and
//! [`render`] draws those blocks with `printpdf`. Coordinates are millimetres
//! from the top-left corner of the page.

pub mod layout;
pub mod render;

use super::metrics::PDF_RENDERS_TOTAL;
use crate::models::{CompanySnapshot, ContractRequest, Invoice};
use service_core::error::AppError;
use thiserror::Error;
use tracing::instrument;

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN: f32 = 20.0;

pub const DEFAULT_BRAND_COLOR: Rgb = Rgb {
    r: 37,
    g: 99,
    b: 235,
};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Font error: {0}")]
    Font(String),

    #[error("Failed to write PDF: {0}")]
    Write(String),
}

impl From<PdfError> for AppError {
    fn from(err: PdfError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn grey(level: u8) -> Rgb {
        Rgb {
            r: level,
            g: level,
            b: level,
        }
    }

    /// Parses `#rrggbb` (the `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Rgb> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Brand colour of a company, falling back to the default blue.
    pub fn brand(color: Option<&str>) -> Rgb {
        color.and_then(Rgb::from_hex).unwrap_or(DEFAULT_BRAND_COLOR)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Text anchored at `x` according to `align`, baseline at `y`.
    Text {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        weight: Weight,
        color: Rgb,
        align: Align,
    },
    /// Filled rectangle, `(x, y)` is the top-left corner.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        thickness: f32,
        color: Rgb,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub pages: Vec<Page>,
}

impl Document {
    /// Every text run in drawing order, across pages.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|page| {
            page.blocks.iter().filter_map(|block| match block {
                Block::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
        })
    }
}

/// Renders invoices and agreements to PDF bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    #[instrument(skip(self, invoice), fields(invoice_number = %invoice.invoice_number))]
    pub fn render_invoice(&self, invoice: &Invoice) -> Result<Vec<u8>, AppError> {
        let document = layout::invoice(invoice);
        Self::finish("invoice", render::render(&document))
    }

    #[instrument(skip(self, contract, company), fields(contract_number = %contract.contract_number))]
    pub fn render_contract(
        &self,
        contract: &ContractRequest,
        company: &CompanySnapshot,
    ) -> Result<Vec<u8>, AppError> {
        let document = layout::contract(contract, company);
        Self::finish("agreement", render::render(&document))
    }

    fn finish(kind: &str, result: Result<Vec<u8>, PdfError>) -> Result<Vec<u8>, AppError> {
        match result {
            Ok(bytes) => {
                PDF_RENDERS_TOTAL.with_label_values(&[kind, "ok"]).inc();
                Ok(bytes)
            }
            Err(e) => {
                PDF_RENDERS_TOTAL.with_label_values(&[kind, "error"]).inc();
                tracing::error!(error = %e, kind, "PDF rendering failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_brand_colours() {
        assert_eq!(
            Rgb::from_hex("#667eea"),
            Some(Rgb {
                r: 0x66,
                g: 0x7e,
                b: 0xea
            })
        );
        assert_eq!(Rgb::from_hex("667EEA"), Rgb::from_hex("#667eea"));
    }

    #[test]
    fn malformed_colours_fall_back_to_default() {
        assert_eq!(Rgb::brand(Some("#fff")), DEFAULT_BRAND_COLOR);
        assert_eq!(Rgb::brand(Some("#zzzzzz")), DEFAULT_BRAND_COLOR);
        assert_eq!(Rgb::brand(Some("#ééé")), DEFAULT_BRAND_COLOR);
        assert_eq!(Rgb::brand(None), DEFAULT_BRAND_COLOR);
    }
}
