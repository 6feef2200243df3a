use super::{PathSegment, PropertyPath};
use crate::document::DocumentValue;

/// Evaluates property paths against document values.
///
/// A missing key, or a key looked up on something that is not a mapping,
/// yields `None` ("absent"). Absence is never an error here; callers decide
/// whether it is fatal.
pub struct PropertyExtractor;

impl PropertyExtractor {
    pub fn extract(value: &DocumentValue, path: &PropertyPath) -> Option<DocumentValue> {
        extract_segments(value, path.segments())
    }

    /// Like [`extract`](Self::extract), but always returns a list: absent
    /// becomes empty and a single value becomes a one-element list.
    pub fn extract_list(value: &DocumentValue, path: &PropertyPath) -> Vec<DocumentValue> {
        match Self::extract(value, path) {
            None => Vec::new(),
            Some(DocumentValue::Array(items)) => items,
            Some(other) => vec![other],
        }
    }

    pub fn exists(value: &DocumentValue, path: &PropertyPath) -> bool {
        Self::extract(value, path).is_some()
    }
}

fn extract_segments(value: &DocumentValue, segments: &[PathSegment]) -> Option<DocumentValue> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    let next = value.as_object()?.get(first.key())?;

    match first {
        PathSegment::Key(_) => extract_segments(next, rest),
        PathSegment::Expand(_) => {
            // A lone value behaves as a one-element list.
            let elements: Vec<&DocumentValue> = match next {
                DocumentValue::Array(items) => items.iter().collect(),
                other => vec![other],
            };

            if rest.is_empty() {
                return Some(DocumentValue::Array(
                    elements.into_iter().cloned().collect(),
                ));
            }

            let mut out = Vec::new();
            for element in elements {
                match extract_segments(element, rest) {
                    Some(DocumentValue::Array(items)) => out.extend(items),
                    Some(item) => out.push(item),
                    None => {}
                }
            }
            Some(DocumentValue::Array(out))
        }
    }
}
