//! SpreadsheetML (`.xlsx`) workbooks

use crate::relationships::{main_document, part_relationships};
use crate::runs::{collect_text_groups, rewrite_text_runs};
use crate::{OoxmlError, Package, Result, TextRewriter};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";
const DEFAULT_SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// One cell of a worksheet row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Display text of the cell
    pub value: String,
    /// Index into the workbook's cell formats (`s` attribute)
    pub style: Option<u32>,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            style: None,
        }
    }
}

/// A worksheet listed in the workbook
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    /// Package part holding the worksheet XML
    pub part: String,
}

/// Name of the workbook part
pub fn workbook_part(package: &Package) -> Result<String> {
    if let Some(target) = main_document(package)? {
        if package.contains(&target) {
            return Ok(target);
        }
    }
    if package.contains(DEFAULT_WORKBOOK_PART) {
        return Ok(DEFAULT_WORKBOOK_PART.to_string());
    }
    Err(OoxmlError::MissingPart(DEFAULT_WORKBOOK_PART.to_string()))
}

/// Worksheets in workbook order
///
/// Chart sheets and sheets whose part is missing are skipped.
pub fn sheets(package: &Package) -> Result<Vec<Sheet>> {
    let workbook = workbook_part(package)?;
    let xml = package
        .part(&workbook)
        .ok_or_else(|| OoxmlError::MissingPart(workbook.clone()))?;
    let rels = part_relationships(package, &workbook)?;

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(&e, b"name")?.unwrap_or_default();
                let Some(rel_id) = attribute(&e, b"id")? else {
                    continue;
                };
                let part = rels
                    .iter()
                    .find(|rel| rel.id == rel_id && rel.kind.ends_with("/worksheet"))
                    .map(|rel| rel.target.clone());
                if let Some(part) = part.filter(|part| package.contains(part)) {
                    sheets.push(Sheet { name, part });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}

/// Name of the shared string table part, if the workbook has one
pub fn shared_strings_part(package: &Package) -> Result<Option<String>> {
    let workbook = workbook_part(package)?;
    let from_rels = part_relationships(package, &workbook)?
        .into_iter()
        .find(|rel| rel.kind.ends_with("/sharedStrings"))
        .map(|rel| rel.target);

    Ok(from_rels
        .or_else(|| Some(DEFAULT_SHARED_STRINGS_PART.to_string()))
        .filter(|part| package.contains(part)))
}

/// Plain text of every shared string item, by index
pub fn shared_strings(package: &Package) -> Result<Vec<String>> {
    match shared_strings_part(package)? {
        Some(part) => match package.part(&part) {
            Some(xml) => collect_text_groups(xml, "si", "t"),
            None => Ok(Vec::new()),
        },
        None => Ok(Vec::new()),
    }
}

/// Cells of a worksheet, row by row
///
/// Only rows with at least one cell are returned. Columns skipped inside a
/// row are filled with empty unstyled cells, starting from column A. Shared and
/// inline strings resolve to their text, booleans to `TRUE`/`FALSE`, and
/// every other cell (numbers, dates, formulas) to its stored value.
pub fn read_sheet(package: &Package, sheet: &Sheet, shared: &[String]) -> Result<Vec<Vec<Cell>>> {
    let xml = package
        .part(&sheet.part)
        .ok_or_else(|| OoxmlError::MissingPart(sheet.part.clone()))?;

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut rows = Vec::new();
    let mut row: Option<Vec<Cell>> = None;
    let mut cell: Option<CellReader> = None;
    let mut has_cells = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    has_cells = false;
                }
                b"c" => cell = Some(CellReader::from_start(&e)?),
                b"v" => {
                    if let Some(cell) = cell.as_mut() {
                        cell.in_value = true;
                    }
                }
                b"t" => {
                    if let Some(cell) = cell.as_mut() {
                        cell.in_inline_text = true;
                    }
                }
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                if let Some(row) = row.as_mut() {
                    CellReader::from_start(&e)?.place(row, shared);
                    has_cells = true;
                }
            }
            Event::Text(t) => {
                if let Some(cell) = cell.as_mut() {
                    if cell.in_value {
                        cell.value.push_str(&t.unescape()?);
                    } else if cell.in_inline_text {
                        cell.inline.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => {
                    if let Some(cell) = cell.as_mut() {
                        cell.in_value = false;
                    }
                }
                b"t" => {
                    if let Some(cell) = cell.as_mut() {
                        cell.in_inline_text = false;
                    }
                }
                b"c" => {
                    if let (Some(done), Some(row)) = (cell.take(), row.as_mut()) {
                        done.place(row, shared);
                        has_cells = true;
                    }
                }
                b"row" => {
                    if let Some(done) = row.take() {
                        if has_cells {
                            rows.push(done);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}

/// Apply `rewriter` to every shared string item and every inline string
///
/// Formulas and numeric cells are left alone. Returns the total number of
/// splices applied.
pub fn rewrite_strings(package: &mut Package, rewriter: &dyn TextRewriter) -> Result<usize> {
    let mut targets: Vec<(String, &str)> = Vec::new();
    if let Some(part) = shared_strings_part(package)? {
        targets.push((part, "si"));
    }
    for sheet in sheets(package)? {
        targets.push((sheet.part, "is"));
    }

    let mut total = 0;
    for (name, container) in targets {
        let Some(xml) = package.part(&name) else {
            continue;
        };
        let (rewritten, applied) = rewrite_text_runs(xml, container, "t", rewriter)?;
        if rewritten.as_slice() != xml {
            package.set_part(&name, rewritten);
        }
        total += applied;
    }

    Ok(total)
}

/// Zero-based column index of a cell reference such as `AB12`
pub fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let number = letters
        .iter()
        .fold(0usize, |acc, &b| acc * 26 + (b - b'A' + 1) as usize);
    Some(number - 1)
}

#[derive(Debug, Default)]
struct CellReader {
    column: Option<usize>,
    kind: String,
    style: Option<u32>,
    value: String,
    inline: String,
    in_value: bool,
    in_inline_text: bool,
}

impl CellReader {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        Ok(Self {
            column: attribute(start, b"r")?.as_deref().and_then(column_index),
            kind: attribute(start, b"t")?.unwrap_or_default(),
            style: attribute(start, b"s")?.and_then(|s| s.parse().ok()),
            ..Self::default()
        })
    }

    fn text(&self, shared: &[String]) -> String {
        match self.kind.as_str() {
            "s" => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| shared.get(index).cloned())
                .unwrap_or_default(),
            "inlineStr" => self.inline.clone(),
            "b" => match self.value.trim() {
                "1" => "TRUE".to_string(),
                _ => "FALSE".to_string(),
            },
            _ => self.value.clone(),
        }
    }

    fn place(self, row: &mut Vec<Cell>, shared: &[String]) {
        let column = self.column.unwrap_or(row.len());
        let cell = Cell {
            value: self.text(shared),
            style: self.style,
        };
        if row.len() <= column {
            row.resize(column + 1, Cell::default());
        }
        row[column] = cell;
    }
}

fn attribute(start: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
