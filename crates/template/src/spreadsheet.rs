//! Spreadsheet (`.xlsx`) template rendering

use crate::config::EngineConfig;
use crate::dispatch::TemplateFormat;
use crate::paginator::paginate;
use crate::record::NormalizedRecord;
use crate::resolver::Placeholders;
use crate::{Result, TemplateError};
use chrono::{Local, NaiveDateTime};
pub use ooxml::spreadsheet::Cell;
use ooxml::{spreadsheet, OoxmlError, Package, Splice};
use std::fmt::Write;
use tracing::{debug, warn};

/// One worksheet's substituted contents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

/// Substituted contents of every worksheet, in workbook order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellGrid {
    pub sheets: Vec<SheetGrid>,
}

impl CellGrid {
    pub fn first_sheet(&self) -> Option<&SheetGrid> {
        self.sheets.first()
    }
}

/// A workbook after placeholder substitution
pub struct PopulatedWorkbook {
    package: Package,
    pub grid: CellGrid,
}

impl PopulatedWorkbook {
    /// The substituted workbook as `.xlsx` bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.package.to_bytes()?)
    }
}

/// Substitute placeholders in every string cell of every sheet and snapshot
/// the result as a [`CellGrid`]
///
/// Shared and inline strings are rewritten in place; a cell may hold any
/// number of placeholders. Styles, formulas and numeric cells are left
/// untouched.
pub fn populate_workbook(template: &[u8], record: &NormalizedRecord) -> Result<PopulatedWorkbook> {
    let syntax = |e: OoxmlError| TemplateError::syntax(TemplateFormat::Spreadsheet, e);

    let mut package = Package::from_bytes(template).map_err(syntax)?;
    let placeholders = Placeholders::new()?;
    let rewriter = |text: &str| -> Vec<Splice> { placeholders.splices(text, record) };

    let replaced = spreadsheet::rewrite_strings(&mut package, &rewriter).map_err(syntax)?;
    debug!(replaced, "substituted placeholders in spreadsheet template");

    let shared = spreadsheet::shared_strings(&package).map_err(syntax)?;
    let mut grid = CellGrid::default();
    for sheet in spreadsheet::sheets(&package).map_err(syntax)? {
        let rows = spreadsheet::read_sheet(&package, &sheet, &shared).map_err(syntax)?;
        grid.sheets.push(SheetGrid {
            name: sheet.name,
            rows,
        });
    }

    Ok(PopulatedWorkbook { package, grid })
}

/// Populate a spreadsheet template, returning `.xlsx` bytes or, with
/// `to_pdf`, a PDF of the first sheet
pub fn render_spreadsheet(
    template: &[u8],
    record: &NormalizedRecord,
    to_pdf: bool,
    config: &EngineConfig,
) -> Result<Vec<u8>> {
    render_spreadsheet_at(template, record, to_pdf, config, Local::now().naive_local())
}

/// [`render_spreadsheet`] with an explicit generation time for the PDF
/// footer
pub fn render_spreadsheet_at(
    template: &[u8],
    record: &NormalizedRecord,
    to_pdf: bool,
    config: &EngineConfig,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>> {
    let workbook = populate_workbook(template, record)?;
    if !to_pdf {
        return workbook.to_bytes();
    }

    // Only the first sheet is converted; later sheets are dropped
    if workbook.grid.sheets.len() > 1 {
        let dropped: Vec<&str> = workbook.grid.sheets[1..]
            .iter()
            .map(|sheet| sheet.name.as_str())
            .collect();
        warn!(?dropped, "PDF conversion includes only the first sheet");
    }

    let empty = SheetGrid::default();
    let sheet = workbook.grid.first_sheet().unwrap_or(&empty);

    let mut timestamp = String::new();
    if write!(timestamp, "{}", generated_at.format(&config.timestamp_format)).is_err() {
        timestamp.clear();
    }

    paginate(sheet, &config.pagination.to_layout(), &timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_normalized_record_on, SourceRecord, SourceRecords};
    use chrono::NaiveDate;
    use pdf_core::PdfDocument;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    fn template() -> Vec<u8> {
        workbook(&format!(r#"<worksheet xmlns="{MAIN}"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Buyer</t></is></c><c r="B1" t="inlineStr"><is><t>{{{{Buyer.fullname}}}} ({{{{Buyer.ssn}}}})</t></is></c><c r="C1"><v>42</v></c></row></sheetData></worksheet>"#))
    }

    fn workbook(sheet: &str) -> Vec<u8> {
        let parts = [
            (
                "_rels/.rels".to_string(),
                format!(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#),
            ),
            (
                "xl/workbook.xml".to_string(),
                format!(r#"<workbook xmlns="{MAIN}" xmlns:r="{REL}"><sheets><sheet name="Summary" sheetId="1" r:id="rId1"/></sheets></workbook>"#),
            ),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                format!(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL}/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#),
            ),
            ("xl/worksheets/sheet1.xml".to_string(), sheet.to_string()),
        ];
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in &parts {
            writer.start_file(name.as_str(), SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn record() -> NormalizedRecord {
        let records = SourceRecords {
            buyer_contact: SourceRecord::from(json!({ "firstName": "Ana", "lastName": "Lima" })),
            ..SourceRecords::default()
        };
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        build_normalized_record_on(&records, date, &EngineConfig::default())
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(15, 4, 5)
            .unwrap()
    }

    fn hex(text: &str) -> String {
        text.bytes().map(|b| format!("{b:02X}")).collect()
    }

    #[test]
    fn test_grid_snapshot() {
        let workbook = populate_workbook(&template(), &record()).unwrap();
        let sheet = workbook.grid.first_sheet().unwrap();
        assert_eq!(sheet.name, "Summary");
        let values: Vec<&str> = sheet.rows[0].iter().map(|cell| cell.value.as_str()).collect();
        assert_eq!(values, vec!["Buyer", "Ana Lima (XXX-XX-XXXX)", "42"]);
    }

    #[test]
    fn test_xlsx_output_reopens() {
        let output = render_spreadsheet_at(&template(), &record(), false, &EngineConfig::default(), generated_at()).unwrap();
        let reparsed = populate_workbook(&output, &record()).unwrap();
        assert_eq!(reparsed.grid.sheets[0].rows[0][1].value, "Ana Lima (XXX-XX-XXXX)");
    }

    #[test]
    fn test_pdf_footer_uses_timestamp_format() {
        let pdf = render_spreadsheet_at(&template(), &record(), true, &EngineConfig::default(), generated_at()).unwrap();
        let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
        let page = doc.get_page_ids()[0];
        let content = String::from_utf8_lossy(&doc.inner().get_page_content(page).unwrap()).into_owned();
        assert!(content.contains(&hex("Generated: 1/2/2025, 3:04:05 PM")));
        assert!(content.contains(&hex("Ana Lima (XXX-XX-XXXX)")));
    }

    #[test]
    fn test_header_band_starts_at_first_row_with_cells() {
        let sheet = format!(
            r#"<worksheet xmlns="{MAIN}"><sheetData><row r="1"/><row r="2"/><row r="3"><c r="A3" t="inlineStr"><is><t>Title</t></is></c></row><row r="4"><c r="A4" t="inlineStr"><is><t>Body</t></is></c></row></sheetData></worksheet>"#
        );
        let template = workbook(&sheet);

        let grid = populate_workbook(&template, &record()).unwrap().grid;
        let values: Vec<&str> = grid.sheets[0].rows.iter().map(|row| row[0].value.as_str()).collect();
        assert_eq!(values, vec!["Title", "Body"]);

        let mut config = EngineConfig::default();
        config.pagination.header_rows = 1;
        let pdf = render_spreadsheet_at(&template, &record(), true, &config, generated_at()).unwrap();
        let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
        let page = doc.get_page_ids()[0];
        let content = String::from_utf8_lossy(&doc.inner().get_page_content(page).unwrap()).into_owned();

        let before_title = &content[..content.find(&hex("Title")).unwrap()];
        let before_body = &content[..content.find(&hex("Body")).unwrap()];
        assert_eq!(last_font(before_title), Some("/F2"));
        assert_eq!(last_font(before_body), Some("/F1"));
    }

    /// Last font resource selected in a stretch of page content
    fn last_font(content: &str) -> Option<&'static str> {
        ["/F1", "/F2"]
            .into_iter()
            .filter_map(|name| content.rfind(name).map(|at| (at, name)))
            .max()
            .map(|(_, name)| name)
    }
}
