//! Engine configuration

use crate::{Result, TemplateError};
use chrono::format::{Item, StrftimeItems};
use pdf_core::{Color, GridLayout};
use serde::{Deserialize, Serialize};

/// Settings for a population run
///
/// Every field has a default, so `{}` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// chrono format of the `date` / `today` record fields
    pub date_format: String,
    /// chrono format of the generated-at footer in converted spreadsheets
    pub timestamp_format: String,
    pub pagination: PaginationConfig,
    pub download: DownloadConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            date_format: "%-m/%-d/%Y".to_string(),
            timestamp_format: "%-m/%-d/%Y, %-I:%M:%S %p".to_string(),
            pagination: PaginationConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TemplateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_format("dateFormat", &self.date_format)?;
        check_format("timestampFormat", &self.timestamp_format)?;
        self.pagination
            .to_layout()
            .validate()
            .map_err(|e| TemplateError::Config(e.to_string()))
    }
}

fn check_format(name: &str, format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(TemplateError::Config(format!(
            "{name} is not a valid date format: {format:?}"
        )));
    }
    Ok(())
}

/// Page geometry of spreadsheet to PDF conversion, in points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationConfig {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub font_size: f32,
    pub cell_padding: f64,
    /// Shaded bold rows at the top, counted over the sheet's non-empty rows
    pub header_rows: usize,
    /// Gray level (0 black, 1 white) behind header rows
    pub header_shade: f32,
    pub footer_font_size: f32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        let layout = GridLayout::default();
        Self {
            page_width: layout.page_width,
            page_height: layout.page_height,
            margin: layout.margin,
            font_size: layout.font_size,
            cell_padding: layout.cell_padding,
            header_rows: layout.header_rows,
            header_shade: 0.9,
            footer_font_size: layout.footer_font_size,
        }
    }
}

impl PaginationConfig {
    pub fn to_layout(&self) -> GridLayout {
        GridLayout {
            page_width: self.page_width,
            page_height: self.page_height,
            margin: self.margin,
            font_size: self.font_size,
            cell_padding: self.cell_padding,
            header_rows: self.header_rows,
            header_shade: Color::gray(self.header_shade.clamp(0.0, 1.0)),
            footer_font_size: self.footer_font_size,
        }
    }
}

/// Limits for the HTTP template fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
    pub max_bytes: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_bytes: 25 * 1024 * 1024,
        }
    }
}
