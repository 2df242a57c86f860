//! Spreadsheet to PDF pagination

use crate::spreadsheet::SheetGrid;
use crate::Result;
use pdf_core::{render_grid, GridFooter, GridLayout};
use tracing::debug;

/// Lay a sheet's cells out on fixed-size pages
///
/// Every page carries a `Generated: <timestamp>` footer and page numbers.
/// Each row divides the content width by its own cell count (at least two),
/// so rows with different lengths do not line up into columns. The first
/// `layout.header_rows` rows are drawn bold on a shaded band. Those are the
/// first rows of the grid, which holds no empty rows: a sheet starting with
/// blank rows gets its band on the first rows that have cells.
pub fn paginate(sheet: &SheetGrid, layout: &GridLayout, timestamp: &str) -> Result<Vec<u8>> {
    let rows: Vec<Vec<String>> = sheet
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.value.clone()).collect())
        .collect();

    let footer = GridFooter {
        text: if timestamp.is_empty() {
            String::new()
        } else {
            format!("Generated: {timestamp}")
        },
        page_numbers: true,
    };

    let pdf = render_grid(&rows, layout, &footer)?;
    debug!(
        sheet = %sheet.name,
        rows = rows.len(),
        bytes = pdf.len(),
        "paginated sheet"
    );
    Ok(pdf)
}
