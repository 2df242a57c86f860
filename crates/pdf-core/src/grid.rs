//! Fixed-layout grid pages
//!
//! Lays rows of text cells onto fixed-size pages. Every row has the same
//! height; each row divides the content width evenly between its own cells,
//! so rows with different cell counts do not line up into columns.

use crate::document::Color;
use crate::text::{fit_text, generate_text_operators, text_width, to_hex_operand};
use crate::{Align, PdfError, Result, StandardFont, TextRenderContext};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Page geometry and styling for grid output (all lengths in points)
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub page_width: f64,
    pub page_height: f64,
    /// Uniform margin on all four sides
    pub margin: f64,
    pub font_size: f32,
    /// Space between the cell border and its text, above and below
    pub cell_padding: f64,
    /// Leading rows drawn bold on a shaded background
    ///
    /// Counted over the rows handed to [`render_grid`]; a caller that drops
    /// blank rows shifts the band onto the next rows with content.
    pub header_rows: usize,
    pub header_shade: Color,
    pub footer_font_size: f32,
}

impl Default for GridLayout {
    /// US Letter portrait
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 40.0,
            font_size: 9.0,
            cell_padding: 4.0,
            header_rows: 3,
            header_shade: Color::gray(0.9),
            footer_font_size: 8.0,
        }
    }
}

impl GridLayout {
    /// Height of one text line
    pub fn line_height(&self) -> f64 {
        self.font_size as f64 * 1.2
    }

    /// Height of every row: one line plus top and bottom padding
    pub fn row_height(&self) -> f64 {
        self.line_height() + 2.0 * self.cell_padding
    }

    /// Width available between the left and right margins
    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    /// Width of each cell in a row with `cell_count` cells
    ///
    /// Rows are treated as having at least two columns, so a single-cell
    /// row only spans half the content width.
    pub fn column_width(&self, cell_count: usize) -> f64 {
        self.content_width() / cell_count.max(2) as f64
    }

    /// Lowest y coordinate a row may reach before a page break
    fn bottom_limit(&self) -> f64 {
        self.margin
    }

    /// Check that at least one row fits between the margins
    pub fn validate(&self) -> Result<()> {
        if self.content_width() <= 0.0 {
            return Err(PdfError::LayoutError(
                "margins leave no horizontal space".to_string(),
            ));
        }
        if self.page_height - 2.0 * self.margin < self.row_height() {
            return Err(PdfError::LayoutError(
                "page is too short for a single row".to_string(),
            ));
        }
        Ok(())
    }
}

/// Footer stamped at the bottom of every page
#[derive(Debug, Clone, Default)]
pub struct GridFooter {
    /// Left-aligned footer text (e.g. a generation timestamp)
    pub text: String,
    /// Whether to add right-aligned "Page N of M" numbering
    pub page_numbers: bool,
}

/// Render rows of cell text into a new PDF document
///
/// Pages break before any row whose bottom edge would cross the bottom
/// margin. An empty grid still yields one page carrying the footer.
pub fn render_grid(rows: &[Vec<String>], layout: &GridLayout, footer: &GridFooter) -> Result<Vec<u8>> {
    layout.validate()?;

    let pages = paginate_rows(rows, layout);
    let page_count = pages.len();

    let mut contents = Vec::with_capacity(page_count);
    for (index, page_rows) in pages.iter().enumerate() {
        let mut ops = Vec::new();
        let mut top = layout.page_height - layout.margin;
        for &(row_index, row) in page_rows {
            ops.extend(row_operators(row, row_index < layout.header_rows, top, layout));
            top -= layout.row_height();
        }
        ops.extend(footer_operators(footer, index + 1, page_count, layout));
        contents.push(ops);
    }

    build_document(contents, layout)
}

/// Split rows into pages, keeping each row's index in the sheet
fn paginate_rows<'a>(rows: &'a [Vec<String>], layout: &GridLayout) -> Vec<Vec<(usize, &'a Vec<String>)>> {
    let mut pages = vec![Vec::new()];
    let mut top = layout.page_height - layout.margin;

    for (row_index, row) in rows.iter().enumerate() {
        if top - layout.row_height() < layout.bottom_limit() {
            pages.push(Vec::new());
            top = layout.page_height - layout.margin;
        }
        if let Some(page) = pages.last_mut() {
            page.push((row_index, row));
        }
        top -= layout.row_height();
    }

    pages
}

fn row_operators(row: &[String], header: bool, top: f64, layout: &GridLayout) -> Vec<u8> {
    let mut ops = String::new();
    let height = layout.row_height();
    let width = layout.column_width(row.len());
    let bottom = top - height;
    let font = if header {
        StandardFont::HelveticaBold
    } else {
        StandardFont::Helvetica
    };

    let mut text_ops = Vec::new();
    for (column, value) in row.iter().enumerate() {
        let x = layout.margin + column as f64 * width;

        if header {
            let shade = layout.header_shade;
            ops.push_str(&format!(
                "q {} {} {} rg {x:.2} {bottom:.2} {width:.2} {height:.2} re f Q\n",
                shade.r, shade.g, shade.b
            ));
        }
        ops.push_str(&format!(
            "q 0.5 w 0 0 0 RG {x:.2} {bottom:.2} {width:.2} {height:.2} re S Q\n"
        ));

        let text = fit_text(
            value,
            font,
            layout.font_size,
            width - 2.0 * layout.cell_padding,
        );
        if text.is_empty() {
            continue;
        }

        let ctx = TextRenderContext {
            font_name: font.resource_name().to_string(),
            font_size: layout.font_size,
            text_width: text_width(&text, font, layout.font_size),
            color: Color::black(),
        };
        // Baseline sits one descent above the bottom padding
        let baseline = bottom + layout.cell_padding + layout.font_size as f64 * 0.25;
        text_ops.extend(generate_text_operators(
            &to_hex_operand(&text),
            x + layout.cell_padding,
            baseline,
            Align::Left,
            &ctx,
        ));
    }

    let mut bytes = ops.into_bytes();
    bytes.extend(text_ops);
    bytes
}

fn footer_operators(footer: &GridFooter, page: usize, page_count: usize, layout: &GridLayout) -> Vec<u8> {
    let mut ops = Vec::new();
    let font = StandardFont::Helvetica;
    let baseline = layout.margin / 2.0;

    if !footer.text.is_empty() {
        let ctx = TextRenderContext {
            font_name: font.resource_name().to_string(),
            font_size: layout.footer_font_size,
            text_width: text_width(&footer.text, font, layout.footer_font_size),
            color: Color::gray(0.4),
        };
        ops.extend(generate_text_operators(
            &to_hex_operand(&footer.text),
            layout.margin,
            baseline,
            Align::Left,
            &ctx,
        ));
    }

    if footer.page_numbers {
        let label = format!("Page {page} of {page_count}");
        let ctx = TextRenderContext {
            font_name: font.resource_name().to_string(),
            font_size: layout.footer_font_size,
            text_width: text_width(&label, font, layout.footer_font_size),
            color: Color::gray(0.4),
        };
        ops.extend(generate_text_operators(
            &to_hex_operand(&label),
            layout.page_width - layout.margin,
            baseline,
            Align::Right,
            &ctx,
        ));
    }

    ops
}

fn font_dictionary(font: StandardFont) -> Object {
    Object::Dictionary(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    })
}

fn build_document(contents: Vec<Vec<u8>>, layout: &GridLayout) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dictionary(StandardFont::Helvetica));
    let bold_id = doc.add_object(font_dictionary(StandardFont::HelveticaBold));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            StandardFont::Helvetica.resource_name() => regular_id,
            StandardFont::HelveticaBold.resource_name() => bold_id,
        },
    });

    let page_ids: Vec<ObjectId> = contents
        .into_iter()
        .map(|content| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
        })
        .collect();

    let page_count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(layout.page_width as _),
                Object::Real(layout.page_height as _),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfError::SaveError(e.to_string()))?;
    Ok(buffer)
}
