//! Word (`.docx`) template rendering

use crate::dispatch::TemplateFormat;
use crate::record::NormalizedRecord;
use crate::resolver::Placeholders;
use crate::{Result, TemplateError};
use ooxml::{wordprocessing, OoxmlError, Package, Splice};
use tracing::debug;

/// Replace every placeholder in the document body, headers, footers,
/// footnotes and endnotes
///
/// Placeholders split across formatting runs are found too; the replacement
/// takes the formatting of the run where the placeholder starts. Every
/// other part of the package is carried over unchanged.
pub fn render_word(template: &[u8], record: &NormalizedRecord) -> Result<Vec<u8>> {
    let syntax = |e: OoxmlError| TemplateError::syntax(TemplateFormat::Word, e);

    let mut package = Package::from_bytes(template).map_err(syntax)?;
    let placeholders = Placeholders::new()?;
    let rewriter = |text: &str| -> Vec<Splice> { placeholders.splices(text, record) };

    let replaced = wordprocessing::rewrite_document(&mut package, &rewriter).map_err(syntax)?;
    debug!(replaced, "substituted placeholders in Word template");

    Ok(package.to_bytes()?)
}
