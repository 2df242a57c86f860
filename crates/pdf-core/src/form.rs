//! Interactive form (AcroForm) field access

use crate::document::PdfDocument;
use crate::{PdfError, Result};
use lopdf::{Dictionary, Object, ObjectId, StringFormat};
use std::collections::HashSet;
use tracing::warn;

/// Field flag bit 1: the field may not be changed by the user
const FLAG_READ_ONLY: i64 = 1;

/// Nesting depth beyond which a field tree is treated as malformed
const MAX_FIELD_DEPTH: usize = 32;

/// Kind of an interactive form field (from the inheritable `/FT` entry)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `/Tx` text box
    Text,
    /// `/Btn` checkbox, radio button or push button
    Button,
    /// `/Ch` list or combo box
    Choice,
    /// `/Sig` signature field
    Signature,
    /// Missing or unrecognised field type
    Unknown,
}

impl FieldKind {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"Tx" => FieldKind::Text,
            b"Btn" => FieldKind::Button,
            b"Ch" => FieldKind::Choice,
            b"Sig" => FieldKind::Signature,
            _ => FieldKind::Unknown,
        }
    }
}

/// A terminal form field
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    /// Object holding the field dictionary
    pub id: ObjectId,
    /// Fully qualified name (partial names joined with `.`)
    pub name: String,
    /// Field type
    pub kind: FieldKind,
    /// Whether the read-only flag is set
    pub read_only: bool,
    /// Current value when it is a text string
    pub value: Option<String>,
}

/// Values inherited down the field tree
#[derive(Clone, Copy)]
struct Inherited<'a> {
    kind: Option<&'a [u8]>,
    flags: i64,
}

impl PdfDocument {
    /// Enumerate all terminal fields of the document's interactive form
    ///
    /// Returns an empty list when the document has no `/AcroForm` or its
    /// `/Fields` array is empty. Fields and kids whose objects cannot be
    /// resolved are logged and left out.
    pub fn form_fields(&self) -> Result<Vec<FormField>> {
        let Some(acroform) = self.acroform()? else {
            return Ok(Vec::new());
        };

        let roots = match acroform.get(b"Fields") {
            Ok(fields) => self.resolve(fields)?.as_array().cloned().unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        let mut fields = Vec::new();
        let mut visited = HashSet::new();
        let inherited = Inherited {
            kind: None,
            flags: 0,
        };
        for root in &roots {
            if let Object::Reference(id) = root {
                self.collect_fields(*id, "", inherited, 0, &mut visited, &mut fields)?;
            }
        }

        Ok(fields)
    }

    fn collect_fields<'a>(
        &'a self,
        id: ObjectId,
        parent_name: &str,
        inherited: Inherited<'a>,
        depth: usize,
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<FormField>,
    ) -> Result<()> {
        if depth > MAX_FIELD_DEPTH {
            return Err(PdfError::ParseError(
                "Form field tree is too deep".to_string(),
            ));
        }
        if !visited.insert(id) {
            return Ok(());
        }

        let dict = match self.dictionary(id) {
            Ok(dict) => dict,
            Err(e) => {
                warn!(field = ?id, error = %e, "skipping unresolvable form field");
                return Ok(());
            }
        };

        let partial = match dict.get(b"T") {
            Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
            _ => None,
        };
        let name = match (&partial, parent_name.is_empty()) {
            (Some(partial), true) => partial.clone(),
            (Some(partial), false) => format!("{parent_name}.{partial}"),
            (None, _) => parent_name.to_string(),
        };

        let inherited = Inherited {
            kind: match dict.get(b"FT") {
                Ok(Object::Name(kind)) => Some(kind.as_slice()),
                _ => inherited.kind,
            },
            flags: match dict.get(b"Ff") {
                Ok(Object::Integer(flags)) => *flags,
                _ => inherited.flags,
            },
        };

        // Kids carrying a partial name are child fields; kids without one
        // are the widget annotations of this field.
        let mut child_fields = Vec::new();
        if let Ok(kids) = dict.get(b"Kids") {
            for kid in self.resolve(kids)?.as_array().map(Vec::as_slice).unwrap_or(&[]) {
                if let Object::Reference(kid_id) = kid {
                    let kid_dict = match self.dictionary(*kid_id) {
                        Ok(kid_dict) => kid_dict,
                        Err(e) => {
                            warn!(field = %name, kid = ?kid_id, error = %e, "skipping unresolvable form field kid");
                            continue;
                        }
                    };
                    if kid_dict.has(b"T") {
                        child_fields.push(*kid_id);
                    }
                }
            }
        }

        if child_fields.is_empty() {
            out.push(FormField {
                id,
                name,
                kind: inherited.kind.map(FieldKind::from_name).unwrap_or(FieldKind::Unknown),
                read_only: inherited.flags & FLAG_READ_ONLY != 0,
                value: match dict.get(b"V") {
                    Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
                    _ => None,
                },
            });
            return Ok(());
        }

        for kid_id in child_fields {
            self.collect_fields(kid_id, &name, inherited, depth + 1, visited, out)?;
        }

        Ok(())
    }

    /// Set the value of a text field
    ///
    /// The stale appearance streams of the field's widgets are dropped and
    /// `/NeedAppearances` is set so viewers regenerate them from `/V`.
    pub fn set_text_field(&mut self, field: &FormField, value: &str) -> Result<()> {
        if field.kind != FieldKind::Text {
            return Err(PdfError::FieldNotFillable {
                name: field.name.clone(),
                reason: format!("field type is {:?}, not text", field.kind),
            });
        }
        if field.read_only {
            return Err(PdfError::FieldNotFillable {
                name: field.name.clone(),
                reason: "field is read-only".to_string(),
            });
        }

        let widget_ids: Vec<ObjectId> = match self.dictionary(field.id)?.get(b"Kids") {
            Ok(kids) => self
                .resolve(kids)?
                .as_array()
                .map(|kids| {
                    kids.iter()
                        .filter_map(|kid| kid.as_reference().ok())
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        let dict = self.dictionary_mut(field.id)?;
        dict.set("V", encode_text_string(value));
        dict.remove(b"AP");

        for widget_id in widget_ids {
            if let Ok(widget) = self.dictionary_mut(widget_id) {
                widget.remove(b"AP");
            }
        }

        self.set_need_appearances()
    }

    /// The `/AcroForm` dictionary of the catalog, if any
    fn acroform(&self) -> Result<Option<&Dictionary>> {
        let catalog = self.dictionary(self.catalog_id()?)?;
        match catalog.get(b"AcroForm") {
            Ok(obj) => {
                let dict = self.resolve(obj)?.as_dict().map_err(|_| {
                    PdfError::ParseError("AcroForm is not a dictionary".to_string())
                })?;
                Ok(Some(dict))
            }
            Err(_) => Ok(None),
        }
    }

    fn set_need_appearances(&mut self) -> Result<()> {
        let catalog_id = self.catalog_id()?;
        let acroform = self.dictionary(catalog_id)?.get(b"AcroForm").ok().cloned();

        match acroform {
            Some(Object::Reference(acroform_id)) => {
                self.dictionary_mut(acroform_id)?
                    .set("NeedAppearances", Object::Boolean(true));
            }
            Some(Object::Dictionary(_)) => {
                if let Ok(Object::Dictionary(acroform)) =
                    self.dictionary_mut(catalog_id)?.get_mut(b"AcroForm")
                {
                    acroform.set("NeedAppearances", Object::Boolean(true));
                }
            }
            _ => {
                return Err(PdfError::ParseError(
                    "Document has no AcroForm dictionary".to_string(),
                ))
            }
        }

        Ok(())
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise PDFDocEncoding)
///
/// PDFDocEncoding is treated as Latin-1, which matches it for every
/// printable character form authors use in field names.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Encode a value as a PDF text string
fn encode_text_string(value: &str) -> Object {
    if value.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return Object::string_literal(value);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
