//! OOXML - Office Open XML package handling
//!
//! This crate provides:
//! - Reading and re-writing `.docx` / `.xlsx` zip packages without
//!   disturbing parts that are not touched
//! - Rewriting the text of paragraphs and string items, including text that
//!   is split across formatting runs
//! - Reading worksheets into rows of cell values
//!
//! # Example
//!
//! ```ignore
//! use ooxml::{wordprocessing, Package, Splice};
//!
//! let mut package = Package::from_bytes(&docx_bytes)?;
//! let rewriter = |text: &str| -> Vec<Splice> {
//!     text.find("{{name}}")
//!         .map(|start| vec![Splice::new(start..start + 8, "Jane")])
//!         .unwrap_or_default()
//! };
//! wordprocessing::rewrite_document(&mut package, &rewriter)?;
//! let output = package.to_bytes()?;
//! ```

mod package;
mod relationships;
mod runs;
pub mod spreadsheet;
pub mod wordprocessing;

pub use package::Package;
pub use runs::{collect_text_groups, rewrite_text_runs, Splice, TextRewriter};

use thiserror::Error;

/// Errors that can occur while reading or writing OOXML packages
#[derive(Debug, Error)]
pub enum OoxmlError {
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Missing package part: {0}")]
    MissingPart(String),

    #[error("Malformed package: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for OOXML operations
pub type Result<T> = std::result::Result<T, OoxmlError>;
