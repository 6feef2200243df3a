use crate::error::{FrontschemaError, Result};
use crate::property_path::PropertyPath;
use regex::Regex;
use std::fmt;
use std::ops::Range;

const PLACEHOLDER_PATTERN: &str =
    r"\{(@?)([A-Za-z0-9_$-]+(?:\[\])?(?:\.[A-Za-z0-9_$-]+(?:\[\])?)*)\}";

/// A template variable: `{path}` or the array expansion `{@path}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder {
    Scalar(PropertyPath),
    Expand(PropertyPath),
}

impl Placeholder {
    pub fn path(&self) -> &PropertyPath {
        match self {
            Placeholder::Scalar(p) | Placeholder::Expand(p) => p,
        }
    }

    pub fn is_expand(&self) -> bool {
        matches!(self, Placeholder::Expand(_))
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::Scalar(p) => write!(f, "{p}"),
            Placeholder::Expand(p) => write!(f, "@{p}"),
        }
    }
}

/// One placeholder occurrence and its byte range in the scanned text.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderMatch {
    pub range: Range<usize>,
    pub placeholder: Placeholder,
}

/// Finds placeholders in template text. Braces that do not enclose a valid
/// property path are left alone as literal text.
#[derive(Debug, Clone)]
pub struct PlaceholderScanner {
    pattern: Regex,
}

impl PlaceholderScanner {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(PLACEHOLDER_PATTERN).map_err(|e| {
            FrontschemaError::processing("compile placeholder pattern", e.to_string())
        })?;
        Ok(PlaceholderScanner { pattern })
    }

    pub fn scan(&self, text: &str) -> Result<Vec<PlaceholderMatch>> {
        let mut found = Vec::new();
        for caps in self.pattern.captures_iter(text) {
            let (Some(whole), Some(raw_path)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            let path = PropertyPath::parse(raw_path.as_str())?;
            let expand = caps.get(1).map(|m| !m.as_str().is_empty()).unwrap_or(false);
            found.push(PlaceholderMatch {
                range: whole.range(),
                placeholder: if expand {
                    Placeholder::Expand(path)
                } else {
                    Placeholder::Scalar(path)
                },
            });
        }
        Ok(found)
    }

    /// The placeholder when `text` consists of exactly one, and nothing else.
    pub fn exact(&self, text: &str) -> Result<Option<Placeholder>> {
        let mut found = self.scan(text)?;
        if found.len() == 1 && found[0].range == (0..text.len()) {
            return Ok(found.pop().map(|m| m.placeholder));
        }
        Ok(None)
    }
}
