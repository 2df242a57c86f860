//! PDF Document wrapper

use crate::{PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Gray level (0.0 = black, 1.0 = white)
    pub fn gray(level: f32) -> Self {
        Self::rgb(level, level, level)
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// PDF Document wrapper providing high-level operations
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
}

impl PdfDocument {
    /// Open a PDF document from bytes
    ///
    /// # Arguments
    /// * `data` - PDF file bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Wrap an already-built lopdf document
    pub fn from_document(inner: Document) -> Self {
        Self { inner }
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Get page object IDs in page order
    pub fn get_page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().values().copied().collect()
    }

    /// Width and height of a page in points (1-indexed)
    ///
    /// MediaBox is looked up through the page tree when the page itself
    /// does not carry one.
    pub fn page_size(&self, page: usize) -> Result<(f64, f64)> {
        let pages = self.inner.get_pages();
        let page_id = *pages
            .get(&(page as u32))
            .ok_or(PdfError::InvalidPage(page, pages.len()))?;

        let media_box = self.inherited_media_box(page_id)?;
        if media_box.len() < 4 {
            return Err(PdfError::ParseError(
                "MediaBox has fewer than 4 entries".to_string(),
            ));
        }

        let mut coords = [0.0f64; 4];
        for (slot, obj) in coords.iter_mut().zip(media_box.iter()) {
            *slot = object_to_f64(obj)?;
        }

        Ok((coords[2] - coords[0], coords[3] - coords[1]))
    }

    fn inherited_media_box(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let mut current = page_id;
        // Page trees deeper than this are malformed
        for _ in 0..32 {
            let dict = self.dictionary(current)?;
            if let Ok(media_box) = dict.get(b"MediaBox") {
                let media_box = self.resolve(media_box)?;
                return media_box
                    .as_array()
                    .cloned()
                    .map_err(|_| PdfError::ParseError("MediaBox is not an array".to_string()));
            }
            match dict.get(b"Parent") {
                Ok(Object::Reference(parent)) => current = *parent,
                _ => break,
            }
        }
        Err(PdfError::ParseError("Page has no MediaBox".to_string()))
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Follow a reference to the object it points at
    pub(crate) fn resolve<'a>(&'a self, obj: &'a Object) -> Result<&'a Object> {
        match obj {
            Object::Reference(id) => Ok(self.inner.get_object(*id)?),
            other => Ok(other),
        }
    }

    pub(crate) fn dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.inner
            .get_object(id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError(format!("Object {:?} is not a dictionary", id)))
    }

    pub(crate) fn dictionary_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary> {
        self.inner
            .get_object_mut(id)?
            .as_dict_mut()
            .map_err(|_| PdfError::ParseError(format!("Object {:?} is not a dictionary", id)))
    }

    /// Object ID of the document catalog
    pub(crate) fn catalog_id(&self) -> Result<ObjectId> {
        let root = self
            .inner
            .trailer
            .get(b"Root")
            .map_err(|_| PdfError::ParseError("Document trailer missing Root entry".to_string()))?;
        root.as_reference()
            .map_err(|_| PdfError::ParseError("Root is not a reference".to_string()))
    }
}

fn object_to_f64(obj: &Object) -> Result<f64> {
    match obj {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(r) => Ok(*r as f64),
        _ => Err(PdfError::ParseError(
            "Expected a number in MediaBox".to_string(),
        )),
    }
}
