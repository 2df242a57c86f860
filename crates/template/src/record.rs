//! Source records and the normalized template record
//!
//! Templates in circulation were authored against several naming
//! conventions (`firstname`, `firstName`, `first name`, ...). The builder
//! emits every logical field under all of its spellings so that any of them
//! resolves, and coalesces every missing value to `""`.

use crate::config::EngineConfig;
use crate::resolver::resolve;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write;

/// A flat key/value record supplied by the caller
///
/// Built from any JSON value: string fields are kept, numbers and booleans
/// are stringified, `null` becomes `""`, nested objects and arrays are
/// ignored. A non-object value yields an empty record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "BTreeMap<String, String>")]
pub struct SourceRecord {
    fields: BTreeMap<String, String>,
}

impl SourceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-empty value of a field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Value> for SourceRecord {
    fn from(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };
        let fields = map
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null => String::new(),
                    Value::Array(_) | Value::Object(_) => return None,
                };
                Some((key, text))
            })
            .collect();
        Self { fields }
    }
}

impl From<SourceRecord> for BTreeMap<String, String> {
    fn from(record: SourceRecord) -> Self {
        record.fields
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The four records a population run draws from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceRecords {
    pub buyer_contact: SourceRecord,
    pub co_buyer_contact: SourceRecord,
    /// Identity/credit snapshot with `buyer_*` and `cobuyer_*` fields
    pub credit_snapshot: SourceRecord,
    /// Deal or prospect record
    pub deal_record: SourceRecord,
}

/// One logical field of a party section
struct FieldSpec {
    /// Every spelling the field is emitted under
    keys: &'static [&'static str],
    /// Credit snapshot field, after the `buyer_` / `cobuyer_` prefix
    credit: &'static str,
    /// Contact record fields, in precedence order
    contact: &'static [&'static str],
    /// Deal record fields, consulted for the buyer only
    deal: &'static [&'static str],
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        keys: &["firstname", "firstName", "first name"],
        credit: "first_name",
        contact: &["firstName"],
        deal: &["firstName"],
    },
    FieldSpec {
        keys: &["middlename", "middleName", "middle name"],
        credit: "middle_name",
        contact: &["middleName"],
        deal: &[],
    },
    FieldSpec {
        keys: &["lastname", "lastName", "last name"],
        credit: "last_name",
        contact: &["lastName"],
        deal: &["lastName"],
    },
    FieldSpec {
        keys: &["email", "emailaddress", "emailAddress", "email address"],
        credit: "email",
        contact: &["email"],
        deal: &["email"],
    },
    FieldSpec {
        keys: &["phone", "phonenumber", "phoneNumber", "phone number"],
        credit: "phone",
        contact: &["phone", "phoneNumber"],
        deal: &["phone"],
    },
    FieldSpec {
        keys: &["address", "streetaddress", "streetAddress", "street address"],
        credit: "address",
        contact: &["streetAddress", "address"],
        deal: &[],
    },
    FieldSpec {
        keys: &["city"],
        credit: "city",
        contact: &["city"],
        deal: &[],
    },
    FieldSpec {
        keys: &["state"],
        credit: "state",
        contact: &["state"],
        deal: &[],
    },
    FieldSpec {
        keys: &["zip", "zipcode", "zipCode", "zip code"],
        credit: "zip",
        contact: &["zipCode", "zip"],
        deal: &[],
    },
    FieldSpec {
        keys: &["dob", "dateofbirth", "dateOfBirth", "date of birth"],
        credit: "dob",
        contact: &["dateOfBirth", "dob"],
        deal: &[],
    },
    FieldSpec {
        keys: &["employer"],
        credit: "employer",
        contact: &["employer"],
        deal: &[],
    },
    FieldSpec {
        keys: &["income", "monthlyincome", "monthlyIncome", "monthly income"],
        credit: "monthly_income",
        contact: &["monthlyIncome", "income"],
        deal: &[],
    },
    FieldSpec {
        keys: &["creditscore", "creditScore", "credit score"],
        credit: "credit_score",
        contact: &["creditScore"],
        deal: &[],
    },
    FieldSpec {
        keys: &["driverslicense", "driversLicense", "drivers license"],
        credit: "drivers_license",
        contact: &["driversLicense"],
        deal: &[],
    },
];

const FULL_NAME_KEYS: &[&str] = &["fullname", "fullName", "name", "full name"];
const CITY_STATE_ZIP_KEYS: &[&str] = &["citystatezip", "cityStateZip"];
const SSN_FULL_KEYS: &[&str] = &["ssnfull", "ssnFull"];
const SSN_LAST4_KEYS: &[&str] = &["ssnlast4", "ssnLast4"];
const MASKED_SSN_UNKNOWN: &str = "XXX-XX-XXXX";

/// Every spelling group of a party section, for alias checks
pub(crate) fn party_key_groups() -> impl Iterator<Item = &'static [&'static str]> {
    FIELDS
        .iter()
        .map(|spec| spec.keys)
        .chain([FULL_NAME_KEYS, CITY_STATE_ZIP_KEYS, SSN_FULL_KEYS, SSN_LAST4_KEYS])
}

/// The record templates are resolved against
///
/// A JSON object with `Buyer`, `CoBuyer` and `Deal` sections plus `date`
/// and `today`. Every leaf is a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecord {
    value: Value,
}

impl NormalizedRecord {
    /// Resolve a dotted path, `""` when it does not lead to a value
    pub fn resolve(&self, path: &str) -> String {
        resolve(&self.value, path)
    }

    /// A top-level section such as `Buyer`
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.value.get(name).and_then(Value::as_object)
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }
}

/// Build the normalized record, dated today in local time
pub fn build_normalized_record(records: &SourceRecords, config: &EngineConfig) -> NormalizedRecord {
    build_normalized_record_on(records, Local::now().date_naive(), config)
}

/// Build the normalized record for a given date
pub fn build_normalized_record_on(
    records: &SourceRecords,
    date: NaiveDate,
    config: &EngineConfig,
) -> NormalizedRecord {
    let mut formatted = String::new();
    if write!(formatted, "{}", date.format(&config.date_format)).is_err() {
        formatted.clear();
    }

    let buyer = party_section(
        "buyer",
        &records.buyer_contact,
        &records.credit_snapshot,
        Some(&records.deal_record),
    );
    let co_buyer = party_section("cobuyer", &records.co_buyer_contact, &records.credit_snapshot, None);
    let deal: Map<String, Value> = records
        .deal_record
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();

    let mut root = Map::new();
    root.insert("Buyer".to_string(), Value::Object(buyer));
    root.insert("CoBuyer".to_string(), Value::Object(co_buyer));
    root.insert("Deal".to_string(), Value::Object(deal));
    root.insert("date".to_string(), Value::String(formatted.clone()));
    root.insert("today".to_string(), Value::String(formatted));

    NormalizedRecord {
        value: Value::Object(root),
    }
}

fn party_section(
    prefix: &str,
    contact: &SourceRecord,
    credit: &SourceRecord,
    deal: Option<&SourceRecord>,
) -> Map<String, Value> {
    let mut section = Map::new();
    let mut emit = |keys: &[&str], value: &str| {
        for key in keys {
            section.insert((*key).to_string(), Value::String(value.to_string()));
        }
    };

    let lookup = |spec: &FieldSpec| -> String {
        let from_credit = credit.get(&format!("{prefix}_{}", spec.credit));
        let from_contact = || spec.contact.iter().find_map(|key| contact.get(key));
        let from_deal = || {
            deal.and_then(|deal| spec.deal.iter().find_map(|key| deal.get(key)))
        };
        from_credit
            .or_else(from_contact)
            .or_else(from_deal)
            .unwrap_or_default()
            .to_string()
    };

    let mut values = BTreeMap::new();
    for spec in FIELDS {
        let value = lookup(spec);
        emit(spec.keys, &value);
        values.insert(spec.keys[0], value);
    }
    let field = |name: &str| values.get(name).map(String::as_str).unwrap_or_default();

    let full_name = format!("{} {}", field("firstname"), field("lastname"));
    emit(FULL_NAME_KEYS, full_name.trim());
    emit(
        CITY_STATE_ZIP_KEYS,
        &city_state_zip(field("city"), field("state"), field("zip")),
    );

    let ssn = credit
        .get(&format!("{prefix}_ssn"))
        .or_else(|| contact.get("ssn"))
        .unwrap_or_default();
    let last4 = last_chars(ssn, 4);
    let masked = if ssn.is_empty() {
        MASKED_SSN_UNKNOWN.to_string()
    } else {
        format!("XXX-XX-{last4}")
    };
    emit(&["ssn"], &masked);
    emit(SSN_FULL_KEYS, ssn);
    emit(SSN_LAST4_KEYS, last4);

    section
}

fn city_state_zip(city: &str, state: &str, zip: &str) -> String {
    let mut line = city.to_string();
    if !state.is_empty() {
        if !line.is_empty() {
            line.push_str(", ");
        }
        line.push_str(state);
    }
    if !zip.is_empty() {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(zip);
    }
    line
}

fn last_chars(text: &str, count: usize) -> &str {
    let skip = text.chars().count().saturating_sub(count);
    match text.char_indices().nth(skip) {
        Some((start, _)) => &text[start..],
        None => "",
    }
}
