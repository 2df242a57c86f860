//! PDF Core - Low-level PDF manipulation
//!
//! This crate provides functionality for:
//! - Loading PDF documents and writing them back to bytes
//! - Enumerating and filling interactive form (AcroForm) text fields
//! - Laying out a grid of text cells onto fixed-size pages
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::PdfDocument;
//!
//! let mut doc = PdfDocument::open_from_bytes(&template_bytes)?;
//! for field in doc.form_fields()? {
//!     if field.name == "Buyer.firstname" {
//!         doc.set_text_field(&field, "Jane")?;
//!     }
//! }
//! let output = doc.to_bytes()?;
//! ```

mod document;
mod form;
mod grid;
mod text;

pub use document::{Color, PdfDocument};
pub use form::{FieldKind, FormField};
pub use grid::{render_grid, GridFooter, GridLayout};
pub use text::{
    encode_win_ansi, fit_text, generate_text_operators, text_width, StandardFont,
    TextRenderContext,
};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("Form field '{name}' cannot be filled: {reason}")]
    FieldNotFillable { name: String, reason: String },

    #[error("Invalid layout: {0}")]
    LayoutError(String),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}
