// Property paths - parsing `a.b[].c` expressions and writing values at plain paths

mod extractor;

pub use extractor::PropertyExtractor;

use crate::document::DocumentValue;
use crate::error::{FrontschemaError, Result};
use std::fmt;

/// A parsed property path such as `commands[].options.input`.
///
/// Paths are immutable once parsed and are reused across every document a
/// directive or template placeholder is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Descend into the named key of a mapping.
    Key(String),
    /// Descend into the named key, then expand every element of the list found there.
    Expand(String),
}

impl PathSegment {
    pub fn key(&self) -> &str {
        match self {
            PathSegment::Key(k) | PathSegment::Expand(k) => k,
        }
    }

    pub fn is_expand(&self) -> bool {
        matches!(self, PathSegment::Expand(_))
    }
}

impl PropertyPath {
    /// Parse a dotted path. A trailing `[]` on a segment marks it for array expansion.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(FrontschemaError::invalid_path(raw, "path is empty"));
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            if part.is_empty() {
                return Err(FrontschemaError::invalid_path(raw, "empty segment"));
            }

            let (key, expand) = match part.strip_suffix("[]") {
                Some(key) => (key, true),
                None => (part, false),
            };

            if key.is_empty() {
                return Err(FrontschemaError::invalid_path(
                    raw,
                    format!("segment '{part}' has no key"),
                ));
            }
            if key.contains('[') || key.contains(']') {
                return Err(FrontschemaError::invalid_path(
                    raw,
                    format!("unexpected bracket in segment '{part}'"),
                ));
            }

            segments.push(if expand {
                PathSegment::Expand(key.to_string())
            } else {
                PathSegment::Key(key.to_string())
            });
        }

        Ok(PropertyPath { segments })
    }

    /// The empty path, addressing the value itself. Only constructed
    /// internally; `parse` never yields it.
    pub fn root() -> Self {
        PropertyPath {
            segments: Vec::new(),
        }
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        PropertyPath { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when no segment expands an array.
    pub fn is_plain(&self) -> bool {
        self.segments.iter().all(|s| !s.is_expand())
    }

    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.to_string()));
        PropertyPath { segments }
    }

    /// The same path with its last segment marked for expansion.
    /// The root path has no segment to mark and is returned unchanged.
    pub fn expanded(&self) -> Self {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.pop() {
            segments.push(PathSegment::Expand(last.key().to_string()));
        }
        PropertyPath { segments }
    }

    /// If `prefix` is a leading part of this path, the remainder after it.
    pub fn strip_prefix(&self, prefix: &PropertyPath) -> Option<PropertyPath> {
        if prefix.segments.len() > self.segments.len() {
            return None;
        }
        if self.segments[..prefix.segments.len()] != prefix.segments[..] {
            return None;
        }
        Some(PropertyPath {
            segments: self.segments[prefix.segments.len()..].to_vec(),
        })
    }

    pub fn starts_with(&self, prefix: &PropertyPath) -> bool {
        self.strip_prefix(prefix).is_some()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment.key())?;
            if segment.is_expand() {
                f.write_str("[]")?;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for PropertyPath {
    type Err = FrontschemaError;

    fn from_str(s: &str) -> Result<Self> {
        PropertyPath::parse(s)
    }
}

/// Return a copy of `value` with `new_value` stored at the plain path `path`,
/// creating intermediate mappings as needed. Existing values are overwritten.
pub fn set_path(
    value: &DocumentValue,
    path: &PropertyPath,
    new_value: DocumentValue,
) -> Result<DocumentValue> {
    if !path.is_plain() {
        return Err(FrontschemaError::invalid_path(
            &path.to_string(),
            "cannot assign through an array expansion",
        ));
    }
    let mut out = value.clone();
    set_in_place(&mut out, path.segments(), new_value, path)?;
    Ok(out)
}

fn set_in_place(
    target: &mut DocumentValue,
    segments: &[PathSegment],
    new_value: DocumentValue,
    full: &PropertyPath,
) -> Result<()> {
    let Some((first, rest)) = segments.split_first() else {
        *target = new_value;
        return Ok(());
    };

    if target.is_null() {
        *target = DocumentValue::Object(serde_json::Map::new());
    }

    let map = target.as_object_mut().ok_or_else(|| {
        FrontschemaError::invalid_path(
            &full.to_string(),
            format!("'{}' is not inside a mapping", first.key()),
        )
    })?;

    let slot = map
        .entry(first.key().to_string())
        .or_insert(DocumentValue::Null);
    set_in_place(slot, rest, new_value, full)
}
