//! Template Engine - populate document templates from deal records
//!
//! This crate provides:
//! - Source record handling and the normalized, alias-rich template record
//! - `{{ path }}` placeholder resolution against that record
//! - Word (`.docx`) and spreadsheet (`.xlsx`) placeholder substitution
//! - Spreadsheet to PDF conversion on fixed US Letter pages
//! - PDF interactive form filling
//! - Dispatch from a template descriptor to the right renderer
//!
//! # Example
//!
//! ```ignore
//! use template::{populate_template, EngineConfig, HttpFetcher, PopulateOutcome, SourceRecords};
//!
//! let config = EngineConfig::default();
//! let fetcher = HttpFetcher::new(&config.download);
//! let records: SourceRecords = serde_json::from_str(records_json)?;
//! match populate_template(&descriptor, &fetcher, &records, false, &config)? {
//!     PopulateOutcome::Populated(output) => std::fs::write(&output.file_name, &output.bytes)?,
//!     PopulateOutcome::NoFillableFields | PopulateOutcome::Unsupported => { /* manual handling */ }
//! }
//! ```

mod config;
mod dispatch;
mod fetch;
pub mod paginator;
pub mod pdf_form;
mod record;
pub mod resolver;
pub mod spreadsheet;
pub mod word;

pub use config::{DownloadConfig, EngineConfig, PaginationConfig};
pub use dispatch::{
    mime_type_for, output_file_name, populate_bytes, populate_template, FieldStats,
    PopulateOutcome, PopulatedOutput, TemplateDescriptor, TemplateFormat,
};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use fetch::{MemoryFetcher, TemplateFetcher};
pub use record::{build_normalized_record, build_normalized_record_on, NormalizedRecord, SourceRecord, SourceRecords};
pub use resolver::{find_placeholders, resolve, Placeholders};

use thiserror::Error;

/// Boxed cause carried by [`TemplateError::Syntax`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while populating a template
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to download template from {location}: {reason}")]
    Download { location: String, reason: String },

    #[error("Template is not a valid {format} document: {source}")]
    Syntax {
        format: TemplateFormat,
        #[source]
        source: BoxError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("PDF error: {0}")]
    PdfError(#[from] pdf_core::PdfError),

    #[error("Package error: {0}")]
    PackageError(#[from] ooxml::OoxmlError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TemplateError {
    /// Template bytes that do not parse as the claimed format
    pub fn syntax(format: TemplateFormat, source: impl Into<BoxError>) -> Self {
        TemplateError::Syntax {
            format,
            source: source.into(),
        }
    }
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
