//! WordprocessingML (`.docx`) documents

use crate::relationships::{main_document, part_relationships};
use crate::runs::{collect_text_groups, rewrite_text_runs};
use crate::{OoxmlError, Package, Result, TextRewriter};

const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Relationship type suffixes of parts that carry body-like text
const TEXT_PART_KINDS: [&str; 4] = ["/header", "/footer", "/footnotes", "/endnotes"];

/// Name of the main document part
pub fn main_part(package: &Package) -> Result<String> {
    if let Some(target) = main_document(package)? {
        if package.contains(&target) {
            return Ok(target);
        }
    }
    if package.contains(DEFAULT_MAIN_PART) {
        return Ok(DEFAULT_MAIN_PART.to_string());
    }
    Err(OoxmlError::MissingPart(DEFAULT_MAIN_PART.to_string()))
}

/// Every part whose paragraphs are rewritten: the main document followed
/// by its headers, footers, footnotes and endnotes
pub fn text_parts(package: &Package) -> Result<Vec<String>> {
    let main = main_part(package)?;
    let mut parts = vec![main.clone()];

    for rel in part_relationships(package, &main)? {
        let is_text = TEXT_PART_KINDS.iter().any(|kind| rel.kind.ends_with(kind));
        if is_text && !rel.external && package.contains(&rel.target) && !parts.contains(&rel.target) {
            parts.push(rel.target);
        }
    }

    Ok(parts)
}

/// Apply `rewriter` to every paragraph of the document
///
/// Returns the total number of splices applied. Parts are only replaced
/// when their text changed.
pub fn rewrite_document(package: &mut Package, rewriter: &dyn TextRewriter) -> Result<usize> {
    let mut total = 0;

    for name in text_parts(package)? {
        let Some(xml) = package.part(&name) else {
            continue;
        };
        let (rewritten, applied) = rewrite_text_runs(xml, "p", "t", rewriter)?;
        if rewritten.as_slice() != xml {
            package.set_part(&name, rewritten);
        }
        total += applied;
    }

    Ok(total)
}

/// Plain text of every paragraph in the main document part
pub fn paragraph_texts(package: &Package) -> Result<Vec<String>> {
    let main = main_part(package)?;
    let xml = package
        .part(&main)
        .ok_or_else(|| OoxmlError::MissingPart(main.clone()))?;
    collect_text_groups(xml, "p", "t")
}
