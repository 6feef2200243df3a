// Documents - the value model and frontmatter extraction

mod frontmatter;

pub use frontmatter::FrontmatterProcessor;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The recursive value every document, schema, and template decodes into.
///
/// Mappings preserve insertion order so rendered output is stable.
pub type DocumentValue = serde_json::Value;

pub type DocumentMap = serde_json::Map<String, DocumentValue>;

/// A document split into its decoded header and remaining body text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub header: DocumentValue,
    pub body: String,
    /// False when the text carried no delimited header block.
    pub has_frontmatter: bool,
}

/// A document loaded during a run, tagged with its position in the input list.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub index: usize,
    pub path: PathBuf,
    pub parsed: ParsedDocument,
}

/// Short type name for messages.
pub fn type_name(value: &DocumentValue) -> &'static str {
    match value {
        DocumentValue::Null => "null",
        DocumentValue::Bool(_) => "boolean",
        DocumentValue::Number(_) => "number",
        DocumentValue::String(_) => "string",
        DocumentValue::Array(_) => "array",
        DocumentValue::Object(_) => "object",
    }
}

/// Render a value as plain text: strings unquoted, scalars via their
/// literal form, lists and mappings as compact JSON.
pub fn to_display_string(value: &DocumentValue) -> String {
    match value {
        DocumentValue::String(s) => s.clone(),
        DocumentValue::Null => "null".to_string(),
        DocumentValue::Bool(b) => b.to_string(),
        DocumentValue::Number(n) => n.to_string(),
        DocumentValue::Array(_) | DocumentValue::Object(_) => value.to_string(),
    }
}

pub fn empty_map() -> DocumentValue {
    DocumentValue::Object(DocumentMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_string() {
        assert_eq!(to_display_string(&json!("REQ-001")), "REQ-001");
        assert_eq!(to_display_string(&json!(3)), "3");
        assert_eq!(to_display_string(&json!(1.5)), "1.5");
        assert_eq!(to_display_string(&json!(true)), "true");
        assert_eq!(to_display_string(&json!(["a", 1])), r#"["a",1]"#);
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name(&json!({})), "object");
        assert_eq!(type_name(&json!([])), "array");
        assert_eq!(type_name(&json!(null)), "null");
    }
}
