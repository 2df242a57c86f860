//! Template classification and dispatch

use crate::config::EngineConfig;
use crate::fetch::TemplateFetcher;
use crate::pdf_form::{fill_pdf_form, FillOutcome};
use crate::record::{build_normalized_record, NormalizedRecord, SourceRecords};
use crate::spreadsheet::render_spreadsheet;
use crate::word::render_word;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Document format of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    Word,
    Spreadsheet,
    Pdf,
    Unsupported,
}

impl TemplateFormat {
    /// Classify a template by MIME type and file name
    ///
    /// Checked in order: Word (`word` in the MIME type or `.docx`),
    /// spreadsheet (`spreadsheet` or `.xlsx` / `.xls`), PDF (`pdf` or
    /// `.pdf`). Anything else is unsupported.
    pub fn classify(mime_type: &str, file_name: &str) -> Self {
        let mime = mime_type.to_lowercase();
        let name = file_name.trim().to_lowercase();

        if mime.contains("word") || name.ends_with(".docx") {
            TemplateFormat::Word
        } else if mime.contains("spreadsheet") || name.ends_with(".xlsx") || name.ends_with(".xls") {
            TemplateFormat::Spreadsheet
        } else if mime.contains("pdf") || name.ends_with(".pdf") {
            TemplateFormat::Pdf
        } else {
            TemplateFormat::Unsupported
        }
    }

    /// Extension used when the template's file name has none
    pub fn default_extension(self) -> Option<&'static str> {
        match self {
            TemplateFormat::Word => Some("docx"),
            TemplateFormat::Spreadsheet => Some("xlsx"),
            TemplateFormat::Pdf => Some("pdf"),
            TemplateFormat::Unsupported => None,
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemplateFormat::Word => "Word",
            TemplateFormat::Spreadsheet => "spreadsheet",
            TemplateFormat::Pdf => "PDF",
            TemplateFormat::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// A template as listed in the template catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateDescriptor {
    /// Declared MIME type
    pub file_type: String,
    pub file_name: String,
    pub download_location: String,
    pub display_name: String,
}

impl TemplateDescriptor {
    pub fn format(&self) -> TemplateFormat {
        TemplateFormat::classify(&self.file_type, &self.file_name)
    }

    /// Lowercased extension of the file name, if it has one
    fn extension(&self) -> Option<String> {
        let name = self.file_name.trim();
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || ext.contains('/') {
            return None;
        }
        Some(ext.to_lowercase())
    }

    /// Display name, falling back to the file name without its extension
    fn title(&self) -> &str {
        let display = self.display_name.trim();
        if !display.is_empty() {
            return display;
        }
        let name = self.file_name.trim();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }
}

/// PDF form fill counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStats {
    pub populated: usize,
    pub total: usize,
}

/// A populated document ready to be saved
#[derive(Debug, Clone, PartialEq)]
pub struct PopulatedOutput {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    /// Present for PDF form templates
    pub fields: Option<FieldStats>,
}

/// Result of a population run
#[derive(Debug, Clone, PartialEq)]
pub enum PopulateOutcome {
    Populated(PopulatedOutput),
    /// PDF template without form fields; the caller completes it by hand
    NoFillableFields,
    /// Template format not recognised; nothing was downloaded
    Unsupported,
}

/// MIME type for an output file extension
pub fn mime_type_for(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn output_extension(descriptor: &TemplateDescriptor, format: TemplateFormat, convert_to_pdf: bool) -> String {
    if format == TemplateFormat::Spreadsheet && convert_to_pdf {
        return "pdf".to_string();
    }
    descriptor
        .extension()
        .or_else(|| format.default_extension().map(str::to_string))
        .unwrap_or_default()
}

/// `"<display name> - <buyer first> <buyer last>.<ext>"`
///
/// The ` - <name>` part is omitted when the buyer has no name.
pub fn output_file_name(
    descriptor: &TemplateDescriptor,
    record: &NormalizedRecord,
    convert_to_pdf: bool,
) -> String {
    let format = descriptor.format();
    let ext = output_extension(descriptor, format, convert_to_pdf);
    let buyer = format!(
        "{} {}",
        record.resolve("Buyer.firstname"),
        record.resolve("Buyer.lastname")
    );
    let buyer = buyer.trim();

    let mut name = descriptor.title().to_string();
    if !buyer.is_empty() {
        name.push_str(" - ");
        name.push_str(buyer);
    }
    if !ext.is_empty() {
        name.push('.');
        name.push_str(&ext);
    }
    name
}

/// Download a template and populate it from the source records
///
/// Unsupported templates return [`PopulateOutcome::Unsupported`] without
/// being downloaded.
pub fn populate_template(
    descriptor: &TemplateDescriptor,
    fetcher: &dyn TemplateFetcher,
    records: &SourceRecords,
    convert_to_pdf: bool,
    config: &EngineConfig,
) -> Result<PopulateOutcome> {
    let format = descriptor.format();
    info!(
        template = %descriptor.file_name,
        %format,
        convert_to_pdf,
        "populating template"
    );
    if format == TemplateFormat::Unsupported {
        return Ok(PopulateOutcome::Unsupported);
    }

    let template = fetcher.fetch(&descriptor.download_location)?;
    populate_bytes(descriptor, &template, records, convert_to_pdf, config)
}

/// Populate template bytes the caller already holds
pub fn populate_bytes(
    descriptor: &TemplateDescriptor,
    template: &[u8],
    records: &SourceRecords,
    convert_to_pdf: bool,
    config: &EngineConfig,
) -> Result<PopulateOutcome> {
    let record = build_normalized_record(records, config);
    let format = descriptor.format();

    let (bytes, fields) = match format {
        TemplateFormat::Word => (render_word(template, &record)?, None),
        TemplateFormat::Spreadsheet => (
            render_spreadsheet(template, &record, convert_to_pdf, config)?,
            None,
        ),
        TemplateFormat::Pdf => match fill_pdf_form(template, &record)? {
            FillOutcome::Filled {
                bytes,
                fields_populated,
                fields_total,
            } => (
                bytes,
                Some(FieldStats {
                    populated: fields_populated,
                    total: fields_total,
                }),
            ),
            FillOutcome::NoFillableFields => return Ok(PopulateOutcome::NoFillableFields),
        },
        TemplateFormat::Unsupported => return Ok(PopulateOutcome::Unsupported),
    };

    let file_name = output_file_name(descriptor, &record, convert_to_pdf);
    let ext = output_extension(descriptor, format, convert_to_pdf);
    info!(file_name = %file_name, bytes = bytes.len(), "template populated");

    Ok(PopulateOutcome::Populated(PopulatedOutput {
        bytes,
        file_name,
        mime_type: mime_type_for(&ext).to_string(),
        fields,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_normalized_record_on, SourceRecord};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn descriptor(file_type: &str, file_name: &str) -> TemplateDescriptor {
        TemplateDescriptor {
            file_type: file_type.to_string(),
            file_name: file_name.to_string(),
            download_location: format!("mem://{file_name}"),
            display_name: "Credit App".to_string(),
        }
    }

    fn record(first: &str, last: &str) -> NormalizedRecord {
        let records = SourceRecords {
            buyer_contact: SourceRecord::from(json!({ "firstName": first, "lastName": last })),
            ..SourceRecords::default()
        };
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        build_normalized_record_on(&records, date, &EngineConfig::default())
    }

    #[test]
    fn test_classify_by_file_name() {
        for mime in ["", "application/octet-stream"] {
            assert_eq!(TemplateFormat::classify(mime, "report.docx"), TemplateFormat::Word);
            assert_eq!(TemplateFormat::classify(mime, "report.xlsx"), TemplateFormat::Spreadsheet);
            assert_eq!(TemplateFormat::classify(mime, "report.xls"), TemplateFormat::Spreadsheet);
            assert_eq!(TemplateFormat::classify(mime, "report.pdf"), TemplateFormat::Pdf);
            assert_eq!(TemplateFormat::classify(mime, "report.txt"), TemplateFormat::Unsupported);
        }
    }

    #[test]
    fn test_classify_by_mime_type() {
        assert_eq!(
            TemplateFormat::classify(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "template"
            ),
            TemplateFormat::Word
        );
        assert_eq!(TemplateFormat::classify("application/msword", ""), TemplateFormat::Word);
        assert_eq!(
            TemplateFormat::classify(
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ""
            ),
            TemplateFormat::Spreadsheet
        );
        assert_eq!(TemplateFormat::classify("application/pdf", "x"), TemplateFormat::Pdf);
        assert_eq!(TemplateFormat::classify("text/plain", "REPORT.DOCX"), TemplateFormat::Word);
    }

    #[test]
    fn test_word_checked_before_pdf() {
        assert_eq!(TemplateFormat::classify("application/pdf", "form.docx"), TemplateFormat::Word);
    }

    #[test]
    fn test_output_file_name() {
        let record = record("John", "Doe");
        assert_eq!(
            output_file_name(&descriptor("", "auth.docx"), &record, true),
            "Credit App - John Doe.docx"
        );
        assert_eq!(
            output_file_name(&descriptor("", "sheet.xlsx"), &record, false),
            "Credit App - John Doe.xlsx"
        );
        assert_eq!(
            output_file_name(&descriptor("", "sheet.xlsx"), &record, true),
            "Credit App - John Doe.pdf"
        );
        assert_eq!(
            output_file_name(&descriptor("application/pdf", "form"), &record, false),
            "Credit App - John Doe.pdf"
        );
    }

    #[test]
    fn test_output_file_name_fallbacks() {
        let mut desc = descriptor("", "Fair Credit Auth.docx");
        desc.display_name = String::new();
        assert_eq!(
            output_file_name(&desc, &record("", ""), false),
            "Fair Credit Auth.docx"
        );
        assert_eq!(
            output_file_name(&desc, &record("Jane", ""), false),
            "Fair Credit Auth - Jane.docx"
        );
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for("PDF"), "application/pdf");
        assert_eq!(
            mime_type_for("docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(mime_type_for("bin"), "application/octet-stream");
    }

    #[test]
    fn test_descriptor_from_catalog_json() {
        let desc: TemplateDescriptor = serde_json::from_value(json!({
            "fileType": "application/pdf",
            "fileName": "auth.pdf",
            "downloadLocation": "https://files.example.com/auth.pdf",
            "displayName": "Fair Credit Auth",
            "category": "CRM Documents",
        }))
        .unwrap();
        assert_eq!(desc.format(), TemplateFormat::Pdf);
        assert_eq!(desc.display_name, "Fair Credit Auth");
    }
}
