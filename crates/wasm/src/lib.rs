//! WASM bindings for dealdocs
//!
//! This crate provides a JavaScript-friendly API for:
//! - Classifying a template from its MIME type and file name
//! - Listing the placeholder paths a template refers to
//! - Building the normalized record templates are resolved against
//! - Populating Word, spreadsheet and PDF form templates
//!
//! Templates are passed in as bytes; downloading them is left to the page.
//!
//! # Example (JavaScript)
//!
//! ```javascript
//! import init, { TemplateEngine } from 'dealdocs-wasm';
//!
//! await init();
//!
//! const engine = new TemplateEngine();
//! const bytes = new Uint8Array(await (await fetch(descriptor.downloadLocation)).arrayBuffer());
//! const result = engine.populate(descriptor, bytes, {
//!   buyerContact: { firstName: "John", lastName: "Doe" },
//!   creditSnapshot: { buyer_ssn: "123456789" },
//! }, false);
//!
//! if (result.status === "populated") {
//!   download(result.bytes, result.fileName, result.mimeType);
//! }
//! ```

use serde::Serialize;
use template::{
    build_normalized_record, find_placeholders, populate_bytes, EngineConfig, PopulateOutcome, SourceRecords,
    TemplateDescriptor, TemplateError, TemplateFormat,
};
use wasm_bindgen::prelude::*;

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: TemplateError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Classify a template
///
/// @param fileType - Declared MIME type
/// @param fileName - Template file name
/// @returns "word", "spreadsheet", "pdf" or "unsupported"
#[wasm_bindgen(js_name = classifyTemplate)]
pub fn classify_template(file_type: &str, file_name: &str) -> String {
    format_name(TemplateFormat::classify(file_type, file_name)).to_string()
}

/// List the placeholder paths in a piece of template text
///
/// @param text - Text containing `{{ path }}` tokens
/// @returns Paths in order of appearance, e.g. ["Buyer.firstname"]
#[wasm_bindgen(js_name = findPlaceholders)]
pub fn find_placeholder_paths(text: &str) -> Result<Vec<String>, JsValue> {
    find_placeholders(text).map_err(js_error)
}

fn format_name(format: TemplateFormat) -> &'static str {
    match format {
        TemplateFormat::Word => "word",
        TemplateFormat::Spreadsheet => "spreadsheet",
        TemplateFormat::Pdf => "pdf",
        TemplateFormat::Unsupported => "unsupported",
    }
}

/// Result of populating a template
#[wasm_bindgen]
#[derive(Debug, Clone, PartialEq)]
pub struct PopulateResult {
    status: String,
    bytes: Vec<u8>,
    file_name: String,
    mime_type: String,
    fields_populated: Option<u32>,
    fields_total: Option<u32>,
}

impl PopulateResult {
    fn empty(status: &str) -> Self {
        PopulateResult {
            status: status.to_string(),
            bytes: Vec::new(),
            file_name: String::new(),
            mime_type: String::new(),
            fields_populated: None,
            fields_total: None,
        }
    }
}

impl From<PopulateOutcome> for PopulateResult {
    fn from(outcome: PopulateOutcome) -> Self {
        match outcome {
            PopulateOutcome::Populated(output) => PopulateResult {
                status: "populated".to_string(),
                bytes: output.bytes,
                file_name: output.file_name,
                mime_type: output.mime_type,
                fields_populated: output.fields.map(|f| f.populated as u32),
                fields_total: output.fields.map(|f| f.total as u32),
            },
            PopulateOutcome::NoFillableFields => PopulateResult::empty("noFillableFields"),
            PopulateOutcome::Unsupported => PopulateResult::empty("unsupported"),
        }
    }
}

#[wasm_bindgen]
impl PopulateResult {
    /// "populated", "noFillableFields" or "unsupported"
    #[wasm_bindgen(getter)]
    pub fn status(&self) -> String {
        self.status.clone()
    }

    /// Output document bytes (Uint8Array), empty unless populated
    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.file_name.clone()
    }

    #[wasm_bindgen(getter, js_name = mimeType)]
    pub fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    /// Number of PDF form fields filled (PDF templates only)
    #[wasm_bindgen(getter, js_name = fieldsPopulated)]
    pub fn fields_populated(&self) -> Option<u32> {
        self.fields_populated
    }

    /// Number of PDF form fields in the template (PDF templates only)
    #[wasm_bindgen(getter, js_name = fieldsTotal)]
    pub fn fields_total(&self) -> Option<u32> {
        self.fields_total
    }
}

/// Template population engine
#[wasm_bindgen]
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    config: EngineConfig,
}

#[wasm_bindgen]
impl TemplateEngine {
    /// Create an engine with the default configuration
    #[wasm_bindgen(constructor)]
    pub fn new() -> TemplateEngine {
        TemplateEngine::default()
    }

    /// Create an engine from a JSON configuration
    ///
    /// @param json - Engine configuration JSON string
    /// @returns TemplateEngine instance
    #[wasm_bindgen(js_name = fromConfigJson)]
    pub fn from_config_json(json: &str) -> Result<TemplateEngine, JsValue> {
        let config = EngineConfig::from_json(json).map_err(js_error)?;
        Ok(TemplateEngine { config })
    }

    /// Build the normalized record for a set of source records
    ///
    /// @param records - { buyerContact, coBuyerContact, creditSnapshot, dealRecord }
    /// @returns Plain object with Buyer, CoBuyer, Deal, date and today
    #[wasm_bindgen(js_name = buildRecord)]
    pub fn build_record(&self, records: JsValue) -> Result<JsValue, JsValue> {
        let records: SourceRecords = serde_wasm_bindgen::from_value(records)?;
        let record = build_normalized_record(&records, &self.config);
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        Ok(record.serialize(&serializer)?)
    }

    /// Populate a template
    ///
    /// @param descriptor - { fileType, fileName, downloadLocation, displayName }
    /// @param template - Template file bytes (Uint8Array)
    /// @param records - Source records, as for buildRecord()
    /// @param convertToPdf - Render spreadsheets as PDF
    /// @returns PopulateResult
    pub fn populate(
        &self,
        descriptor: JsValue,
        template: &[u8],
        records: JsValue,
        convert_to_pdf: bool,
    ) -> Result<PopulateResult, JsValue> {
        let descriptor: TemplateDescriptor = serde_wasm_bindgen::from_value(descriptor)?;
        let records: SourceRecords = serde_wasm_bindgen::from_value(records)?;
        self.populate_with(&descriptor, template, &records, convert_to_pdf)
            .map_err(js_error)
    }

    /// Populate a template from JSON strings
    ///
    /// @param descriptorJson - Template descriptor JSON string
    /// @param template - Template file bytes (Uint8Array)
    /// @param recordsJson - Source records JSON string
    /// @param convertToPdf - Render spreadsheets as PDF
    /// @returns PopulateResult
    #[wasm_bindgen(js_name = populateJson)]
    pub fn populate_json(
        &self,
        descriptor_json: &str,
        template: &[u8],
        records_json: &str,
        convert_to_pdf: bool,
    ) -> Result<PopulateResult, JsValue> {
        let parse = |e: serde_json::Error| js_error(TemplateError::from(e));
        let descriptor: TemplateDescriptor = serde_json::from_str(descriptor_json).map_err(parse)?;
        let records: SourceRecords = serde_json::from_str(records_json).map_err(parse)?;
        self.populate_with(&descriptor, template, &records, convert_to_pdf)
            .map_err(js_error)
    }
}

impl TemplateEngine {
    fn populate_with(
        &self,
        descriptor: &TemplateDescriptor,
        template: &[u8],
        records: &SourceRecords,
        convert_to_pdf: bool,
    ) -> Result<PopulateResult, TemplateError> {
        let outcome = populate_bytes(descriptor, template, records, convert_to_pdf, &self.config)?;
        Ok(outcome.into())
    }
}
