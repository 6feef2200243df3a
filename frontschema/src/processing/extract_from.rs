use crate::document::DocumentValue;
use crate::error::Result;
use crate::property_path::{set_path, PropertyExtractor, PropertyPath};

/// Copies the value found at one path into a named field of the same document.
pub struct ExtractFromProcessor;

impl ExtractFromProcessor {
    /// Returns `doc` with `target` set to the value at `source`. When `source`
    /// is absent the document comes back unchanged.
    pub fn apply(
        doc: &DocumentValue,
        source: &PropertyPath,
        target: &PropertyPath,
    ) -> Result<DocumentValue> {
        match PropertyExtractor::extract(doc, source) {
            Some(value) => set_path(doc, target, value),
            None => Ok(doc.clone()),
        }
    }
}
