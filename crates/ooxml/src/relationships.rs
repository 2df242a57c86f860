//! Package relationship (`.rels`) parsing

use crate::{Package, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Relationship type suffix of a package's main document part
pub(crate) const OFFICE_DOCUMENT: &str = "/officeDocument";

/// One `<Relationship>` entry
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Relationship {
    pub id: String,
    pub kind: String,
    /// Part name resolved against the source part's directory
    pub target: String,
    pub external: bool,
}

/// Relationships of a source part (`""` for the package root)
pub(crate) fn part_relationships(package: &Package, source: &str) -> Result<Vec<Relationship>> {
    let (dir, file) = split_part_name(source);
    let rels_name = if dir.is_empty() {
        format!("_rels/{file}.rels")
    } else {
        format!("{dir}/_rels/{file}.rels")
    };

    match package.part(&rels_name) {
        Some(xml) => parse_relationships(xml, dir),
        None => Ok(Vec::new()),
    }
}

/// Main document part named by the package root relationships
pub(crate) fn main_document(package: &Package) -> Result<Option<String>> {
    let rels = part_relationships(package, "")?;
    Ok(rels
        .into_iter()
        .find(|rel| rel.kind.ends_with(OFFICE_DOCUMENT) && !rel.external)
        .map(|rel| rel.target))
}

fn parse_relationships(xml: &[u8], base_dir: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut relationships = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut kind = String::new();
                let mut target = String::new();
                let mut external = false;
                for attr in e.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = value,
                        b"Type" => kind = value,
                        b"Target" => target = value,
                        b"TargetMode" => external = value == "External",
                        _ => {}
                    }
                }
                let target = if external {
                    target
                } else {
                    resolve_target(base_dir, &target)
                };
                relationships.push(Relationship {
                    id,
                    kind,
                    target,
                    external,
                });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Split `xl/worksheets/sheet1.xml` into `("xl/worksheets", "sheet1.xml")`
pub(crate) fn split_part_name(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("", name),
    }
}

/// Resolve a relationship target against the directory of its source part
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
