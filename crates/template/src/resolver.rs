//! Placeholder parsing and resolution
//!
//! Placeholders are written `{{ Section.field }}`. Path segments match
//! record keys case-insensitively, and anything that does not resolve
//! becomes an empty string.

use crate::record::NormalizedRecord;
use crate::Result;
use ooxml::Splice;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([^{}\s][^{}]*?)\s*\}\}";

/// Resolve a dotted path against a record
///
/// Each segment first tries an exact key match, then the first key (in map
/// order) that matches ignoring case. Returns `""` when a segment has no
/// match, when the walk reaches a non-object before the path ends, or when
/// the path ends on an object or array.
pub fn resolve(data: &Value, path: &str) -> String {
    let mut current = data;

    for segment in path.split('.').map(str::trim) {
        let Value::Object(map) = current else {
            return String::new();
        };
        let found = map.get(segment).or_else(|| {
            let wanted = segment.to_lowercase();
            map.iter()
                .find(|(key, _)| key.to_lowercase() == wanted)
                .map(|(_, value)| value)
        });
        match found {
            Some(value) => current = value,
            None => return String::new(),
        }
    }

    value_to_string(current)
}

/// Convert a JSON leaf to the text substituted into a document
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Compiled placeholder scanner
#[derive(Debug, Clone)]
pub struct Placeholders {
    pattern: Regex,
}

impl Placeholders {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(PLACEHOLDER_PATTERN)?,
        })
    }

    /// Paths of every placeholder in `text`, in order of appearance
    pub fn find(&self, text: &str) -> Vec<String> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|path| path.as_str().to_string())
            .collect()
    }

    /// One splice per placeholder in `text`, replacing it with its value
    pub fn splices(&self, text: &str, record: &NormalizedRecord) -> Vec<Splice> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let path = caps.get(1)?.as_str();
                let value = record.resolve(path);
                if value.is_empty() {
                    debug!(path, "placeholder resolved to empty text");
                }
                Some(Splice::new(whole.range(), value))
            })
            .collect()
    }

    /// Replace every placeholder in `text`
    pub fn substitute(&self, text: &str, record: &NormalizedRecord) -> String {
        self.pattern
            .replace_all(text, |caps: &regex::Captures| record.resolve(&caps[1]))
            .into_owned()
    }
}

/// Paths of every placeholder in `text`
pub fn find_placeholders(text: &str) -> Result<Vec<String>> {
    Ok(Placeholders::new()?.find(text))
}
