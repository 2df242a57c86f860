//! Integration tests for pdf-core
//!
//! These tests verify end-to-end functionality with real PDF operations.

use lopdf::{dictionary, Object};
use pdf_core::{render_grid, FieldKind, GridFooter, GridLayout, PdfDocument, PdfError};
use pretty_assertions::assert_eq;

/// Create a one-page PDF whose AcroForm holds the given field dictionaries
///
/// Each entry is `(partial name, field type)`. A `None` field list creates a
/// PDF without any `/AcroForm` entry.
fn create_form_pdf(fields: Option<&[(&str, &str)]>) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let contents_id = doc.add_object(lopdf::Stream::new(dictionary! {}, vec![]));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Resources" => dictionary! {},
        "Contents" => contents_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![page_id.into()],
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };

    if let Some(fields) = fields {
        let field_refs: Vec<Object> = fields
            .iter()
            .map(|(name, kind)| {
                doc.add_object(dictionary! {
                    "FT" => *kind,
                    "T" => Object::string_literal(*name),
                    "Type" => "Annot",
                    "Subtype" => "Widget",
                    "Rect" => vec![0.into(), 0.into(), 100.into(), 20.into()],
                    "P" => page_id,
                    "AP" => dictionary! {},
                })
                .into()
            })
            .collect();
        let acroform_id = doc.add_object(dictionary! {
            "Fields" => field_refs,
        });
        catalog.set("AcroForm", acroform_id);
    }

    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Create a PDF with a hierarchical field `buyer` -> `first` with two widgets
fn create_hierarchical_form_pdf() -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![page_id.into()],
        }),
    );

    let parent_id = doc.new_object_id();
    let child_id = doc.new_object_id();
    let widget_a = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Parent" => child_id,
        "AP" => dictionary! {},
    });
    let widget_b = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Parent" => child_id,
        "AP" => dictionary! {},
    });
    doc.objects.insert(
        child_id,
        Object::Dictionary(dictionary! {
            "T" => Object::string_literal("first"),
            "Parent" => parent_id,
            "Kids" => vec![widget_a.into(), widget_b.into()],
        }),
    );
    doc.objects.insert(
        parent_id,
        Object::Dictionary(dictionary! {
            "T" => Object::string_literal("buyer"),
            "FT" => "Tx",
            "Kids" => vec![child_id.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => dictionary! {
            "Fields" => vec![parent_id.into()],
        },
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A form with one valid text field, one field whose only kid is missing
/// and one `/Fields` entry pointing at a missing object
fn create_form_with_dangling_references() -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![page_id.into()],
        }),
    );

    let first = doc.add_object(dictionary! {
        "FT" => "Tx",
        "T" => Object::string_literal("First Name"),
    });
    let last = doc.add_object(dictionary! {
        "FT" => "Tx",
        "T" => Object::string_literal("Last Name"),
        "Kids" => vec![Object::Reference((999, 0))],
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => dictionary! {
            "Fields" => vec![first.into(), Object::Reference((998, 0)), last.into()],
        },
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

#[test]
fn test_unresolvable_fields_are_skipped() {
    let mut doc = PdfDocument::open_from_bytes(&create_form_with_dangling_references()).unwrap();
    let fields = doc.form_fields().unwrap();

    let names: Vec<&str> = fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, vec!["First Name", "Last Name"]);
    assert!(fields.iter().all(|field| field.kind == FieldKind::Text));

    doc.set_text_field(&fields[1], "Doe").unwrap();
    let reopened = PdfDocument::open_from_bytes(&doc.to_bytes().unwrap()).unwrap();
    assert_eq!(reopened.form_fields().unwrap()[1].value.as_deref(), Some("Doe"));
}

#[test]
fn test_form_fields_without_acroform() {
    let doc = PdfDocument::open_from_bytes(&create_form_pdf(None)).unwrap();
    assert!(doc.form_fields().unwrap().is_empty());
}

#[test]
fn test_form_fields_enumerated_with_kinds() {
    let pdf = create_form_pdf(Some(&[
        ("First Name", "Tx"),
        ("Agree", "Btn"),
        ("Signature", "Sig"),
    ]));
    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let fields = doc.form_fields().unwrap();

    let summary: Vec<(String, FieldKind)> =
        fields.iter().map(|f| (f.name.clone(), f.kind)).collect();
    assert_eq!(
        summary,
        vec![
            ("First Name".to_string(), FieldKind::Text),
            ("Agree".to_string(), FieldKind::Button),
            ("Signature".to_string(), FieldKind::Signature),
        ]
    );
}

#[test]
fn test_fill_text_field_round_trip() {
    let pdf = create_form_pdf(Some(&[("First Name", "Tx")]));
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let field = doc.form_fields().unwrap().remove(0);

    doc.set_text_field(&field, "Jane").unwrap();
    let output = doc.to_bytes().unwrap();

    let reopened = PdfDocument::open_from_bytes(&output).unwrap();
    let fields = reopened.form_fields().unwrap();
    assert_eq!(fields[0].value.as_deref(), Some("Jane"));

    let field_dict = reopened
        .inner()
        .get_object(fields[0].id)
        .unwrap()
        .as_dict()
        .unwrap();
    assert!(!field_dict.has(b"AP"));

    let catalog_id = reopened
        .inner()
        .trailer
        .get(b"Root")
        .unwrap()
        .as_reference()
        .unwrap();
    let catalog = reopened
        .inner()
        .get_object(catalog_id)
        .unwrap()
        .as_dict()
        .unwrap();
    let acroform_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
    let acroform = reopened
        .inner()
        .get_object(acroform_id)
        .unwrap()
        .as_dict()
        .unwrap();
    assert_eq!(
        acroform.get(b"NeedAppearances").unwrap(),
        &Object::Boolean(true)
    );
}

#[test]
fn test_fill_non_text_field_rejected() {
    let pdf = create_form_pdf(Some(&[("Agree", "Btn")]));
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let field = doc.form_fields().unwrap().remove(0);

    let result = doc.set_text_field(&field, "Yes");
    assert!(matches!(result, Err(PdfError::FieldNotFillable { .. })));
}

#[test]
fn test_hierarchical_field_names_and_widgets() {
    let mut doc = PdfDocument::open_from_bytes(&create_hierarchical_form_pdf()).unwrap();
    let fields = doc.form_fields().unwrap();

    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name, "buyer.first");
    assert_eq!(fields[0].kind, FieldKind::Text);

    doc.set_text_field(&fields[0], "José").unwrap();
    let reopened = PdfDocument::open_from_bytes(&doc.to_bytes().unwrap()).unwrap();
    let fields = reopened.form_fields().unwrap();
    assert_eq!(fields[0].value.as_deref(), Some("José"));
}

#[test]
fn test_render_grid_pages_are_us_letter() {
    let rows: Vec<Vec<String>> = (0..100)
        .map(|i| vec![format!("Row {i}"), "value".to_string()])
        .collect();
    let footer = GridFooter {
        text: "Generated: 1/2/2025, 3:04:05 PM".to_string(),
        page_numbers: true,
    };

    let pdf = render_grid(&rows, &GridLayout::default(), &footer).unwrap();
    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    assert_eq!(doc.page_count(), 3);
    for page in 1..=doc.page_count() {
        assert_eq!(doc.page_size(page).unwrap(), (612.0, 792.0));
    }
}

#[test]
fn test_render_grid_footer_on_last_page() {
    let rows = vec![vec!["Name:".to_string(), "Jane".to_string()]];
    let footer = GridFooter {
        text: "Generated: now".to_string(),
        page_numbers: false,
    };

    let pdf = render_grid(&rows, &GridLayout::default(), &footer).unwrap();
    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let page_ids = doc.get_page_ids();
    let content = doc
        .inner()
        .get_page_content(*page_ids.last().unwrap())
        .unwrap();
    let content = String::from_utf8_lossy(&content);

    // "Jane" and "Generated: now" as WinAnsi hex operands
    assert!(content.contains("<4A616E65> Tj"));
    assert!(content.contains("<47656E6572617465643A206E6F77> Tj"));
}

#[test]
fn test_render_grid_is_deterministic() {
    let rows = vec![vec!["a".to_string(), "b".to_string()]];
    let footer = GridFooter {
        text: "fixed".to_string(),
        page_numbers: true,
    };
    let first = render_grid(&rows, &GridLayout::default(), &footer).unwrap();
    let second = render_grid(&rows, &GridLayout::default(), &footer).unwrap();
    assert_eq!(first, second);
}
