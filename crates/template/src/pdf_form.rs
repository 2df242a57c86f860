//! PDF form-field filling
//!
//! A field's value is found in two passes:
//!
//! 1. The lowercased, trimmed field name is looked up in [`FIELD_ALIASES`],
//!    an ordered table of common field labels and the record path each one
//!    stands for.
//! 2. Otherwise the name is split on `.` and `_`. The first segment must be
//!    `buyer` or `cobuyer` (ignoring case and punctuation, so `Co-Buyer`
//!    works); the remaining segments, joined and stripped to lowercase
//!    letters and digits, are compared with the section's keys stripped the
//!    same way. `Buyer.First_Name` therefore finds `Buyer.firstname`.
//!
//! Fields whose value resolves to an empty string are left untouched.

use crate::dispatch::TemplateFormat;
use crate::record::NormalizedRecord;
use crate::resolver::value_to_string;
use crate::{Result, TemplateError};
use pdf_core::{FieldKind, PdfDocument, PdfError};
use tracing::{debug, info, warn};

/// Field labels (lowercased) and the record path each one fills
///
/// Social security labels fill the unmasked `ssnFull`: a PDF form asking
/// for the number needs all nine digits, unlike the masked `{{Buyer.ssn}}`.
pub const FIELD_ALIASES: &[(&str, &str)] = &[
    ("first name", "Buyer.firstname"),
    ("middle name", "Buyer.middlename"),
    ("last name", "Buyer.lastname"),
    ("name", "Buyer.fullname"),
    ("full name", "Buyer.fullname"),
    ("applicant name", "Buyer.fullname"),
    ("buyer name", "Buyer.fullname"),
    ("address", "Buyer.address"),
    ("street address", "Buyer.address"),
    ("city", "Buyer.city"),
    ("state", "Buyer.state"),
    ("zip", "Buyer.zip"),
    ("zip code", "Buyer.zip"),
    ("city state zip", "Buyer.cityStateZip"),
    ("phone", "Buyer.phone"),
    ("phone number", "Buyer.phone"),
    ("email", "Buyer.email"),
    ("email address", "Buyer.email"),
    ("social security", "Buyer.ssnFull"),
    ("social security number", "Buyer.ssnFull"),
    ("ssn", "Buyer.ssnFull"),
    ("date of birth", "Buyer.dob"),
    ("date of birthmmddyyyy", "Buyer.dob"),
    ("dob", "Buyer.dob"),
    ("employer", "Buyer.employer"),
    ("monthly income", "Buyer.income"),
    ("drivers license", "Buyer.driversLicense"),
    ("co-buyer name", "CoBuyer.fullname"),
    ("cobuyer name", "CoBuyer.fullname"),
    ("co-buyer first name", "CoBuyer.firstname"),
    ("co-buyer last name", "CoBuyer.lastname"),
    ("co-buyer address", "CoBuyer.address"),
    ("co-buyer phone", "CoBuyer.phone"),
    ("co-buyer email", "CoBuyer.email"),
    ("co-buyer social security", "CoBuyer.ssnFull"),
    ("co-buyer date of birth", "CoBuyer.dob"),
    ("co-buyer date of birthmmddyyyy", "CoBuyer.dob"),
    ("date", "date"),
    ("today", "today"),
    ("todays date", "today"),
];

/// Result of filling a PDF form
#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    Filled {
        bytes: Vec<u8>,
        fields_populated: usize,
        fields_total: usize,
    },
    /// The PDF has no interactive form fields; it was not modified
    NoFillableFields,
}

/// Record path of a field label from [`FIELD_ALIASES`]
pub fn alias_path(field_name: &str) -> Option<&'static str> {
    let wanted = field_name.trim().to_lowercase();
    FIELD_ALIASES
        .iter()
        .find(|(pattern, _)| *pattern == wanted)
        .map(|(_, path)| *path)
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Value for a `section.field` style name, such as `CoBuyer_Last_Name`
fn parse_field_name(field_name: &str, record: &NormalizedRecord) -> Option<String> {
    let mut segments = field_name
        .split(['.', '_'])
        .filter(|segment| !segment.trim().is_empty());
    let section = match normalize(segments.next()?).as_str() {
        "buyer" => "Buyer",
        "cobuyer" => "CoBuyer",
        _ => return None,
    };
    let key = normalize(&segments.collect::<String>());
    if key.is_empty() {
        return None;
    }

    record
        .section(section)?
        .iter()
        .find(|(candidate, _)| normalize(candidate) == key)
        .map(|(_, value)| value_to_string(value))
}

/// Value a field should be filled with, `None` when nothing resolves
pub fn resolve_field(field_name: &str, record: &NormalizedRecord) -> Option<String> {
    let value = match alias_path(field_name) {
        Some(path) => record.resolve(path),
        None => parse_field_name(field_name, record)?,
    };
    Some(value).filter(|value| !value.is_empty())
}

/// Fill the text fields of a PDF form from the record
///
/// Failures to set an individual field are logged and skipped. A PDF
/// without form fields yields [`FillOutcome::NoFillableFields`].
pub fn fill_pdf_form(template: &[u8], record: &NormalizedRecord) -> Result<FillOutcome> {
    let syntax = |e: PdfError| TemplateError::syntax(TemplateFormat::Pdf, e);

    let mut doc = PdfDocument::open_from_bytes(template).map_err(syntax)?;
    let fields = doc.form_fields().map_err(syntax)?;
    if fields.is_empty() {
        info!("PDF template has no form fields");
        return Ok(FillOutcome::NoFillableFields);
    }

    let mut populated = 0;
    for field in &fields {
        if field.kind != FieldKind::Text || field.read_only {
            debug!(field = %field.name, kind = ?field.kind, "skipping non-fillable field");
            continue;
        }
        let Some(value) = resolve_field(&field.name, record) else {
            debug!(field = %field.name, "no value for field");
            continue;
        };
        match doc.set_text_field(field, &value) {
            Ok(()) => populated += 1,
            Err(e) => warn!(field = %field.name, error = %e, "failed to fill field"),
        }
    }

    info!(populated, total = fields.len(), "filled PDF form");
    Ok(FillOutcome::Filled {
        bytes: doc.to_bytes()?,
        fields_populated: populated,
        fields_total: fields.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_normalized_record_on, EngineConfig, SourceRecord, SourceRecords};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record() -> NormalizedRecord {
        let records = SourceRecords {
            buyer_contact: SourceRecord::from(json!({ "firstName": "John", "lastName": "Doe" })),
            co_buyer_contact: SourceRecord::from(json!({ "firstName": "Mary", "lastName": "Roe" })),
            credit_snapshot: SourceRecord::from(json!({ "buyer_ssn": "987654321", "buyer_dob": "04/05/1970" })),
            ..SourceRecords::default()
        };
        let date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        build_normalized_record_on(&records, date, &EngineConfig::default())
    }

    #[test]
    fn test_alias_table_patterns_are_lowercase_and_unique() {
        for (index, (pattern, _)) in FIELD_ALIASES.iter().enumerate() {
            assert_eq!(*pattern, pattern.to_lowercase());
            assert!(
                FIELD_ALIASES[..index].iter().all(|(other, _)| other != pattern),
                "duplicate alias {pattern}"
            );
        }
    }

    #[test]
    fn test_alias_paths_resolve() {
        let record = record();
        for (_, path) in FIELD_ALIASES {
            let (section, key) = path.split_once('.').unwrap_or(("", *path));
            if section.is_empty() {
                assert!(record.as_value().get(key).is_some(), "{path}");
            } else {
                assert!(record.section(section).unwrap().contains_key(key), "{path}");
            }
        }
    }

    #[test]
    fn test_alias_lookup() {
        let record = record();
        assert_eq!(resolve_field("Social Security", &record).as_deref(), Some("987654321"));
        assert_eq!(resolve_field(" Date of BirthMMDDYYYY ", &record).as_deref(), Some("04/05/1970"));
        assert_eq!(resolve_field("Co-Buyer Name", &record).as_deref(), Some("Mary Roe"));
        assert_eq!(resolve_field("Date", &record).as_deref(), Some("6/30/2025"));
    }

    #[test]
    fn test_section_field_parser() {
        let record = record();
        assert_eq!(resolve_field("Buyer.firstName", &record).as_deref(), Some("John"));
        assert_eq!(resolve_field("buyer_last_name", &record).as_deref(), Some("Doe"));
        assert_eq!(resolve_field("CoBuyer.First-Name", &record).as_deref(), Some("Mary"));
        assert_eq!(resolve_field("Co-Buyer_lastname", &record).as_deref(), Some("Roe"));
        assert_eq!(resolve_field("Buyer.ssn", &record).as_deref(), Some("XXX-XX-4321"));
    }

    #[test]
    fn test_unresolved_fields() {
        let record = record();
        assert_eq!(resolve_field("Seller.firstName", &record), None);
        assert_eq!(resolve_field("Buyer.favoriteColor", &record), None);
        assert_eq!(resolve_field("Buyer", &record), None);
        assert_eq!(resolve_field("Buyer.employer", &record), None);
        assert_eq!(resolve_field("Signature", &record), None);
    }

    #[test]
    fn test_invalid_pdf_is_syntax_error() {
        let result = fill_pdf_form(b"not a pdf", &record());
        assert!(matches!(
            result,
            Err(TemplateError::Syntax {
                format: TemplateFormat::Pdf,
                ..
            })
        ));
    }
}
