use crate::document::{to_display_string, DocumentValue};
use crate::error::Result;
use crate::io::DataFormat;

const XML_ROOT: &str = "root";
const XML_ITEM: &str = "item";
const INDENT: &str = "  ";

/// Serialize a rendered value in the chosen output format.
///
/// `Text` writes strings verbatim and anything else as pretty JSON.
pub fn serialize(value: &DocumentValue, format: DataFormat) -> Result<String> {
    match format {
        DataFormat::Json => {
            let mut out = serde_json::to_string_pretty(value)?;
            out.push('\n');
            Ok(out)
        }
        DataFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        DataFormat::Xml => Ok(to_xml(value)),
        DataFormat::Text => match value {
            DocumentValue::String(s) => Ok(s.clone()),
            other => {
                let mut out = serde_json::to_string_pretty(other)?;
                out.push('\n');
                Ok(out)
            }
        },
    }
}

/// Mapping keys become child elements and list elements become `<item>`.
pub fn to_xml(value: &DocumentValue) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_element(&mut out, XML_ROOT, value, 0);
    out
}

fn write_element(out: &mut String, name: &str, value: &DocumentValue, depth: usize) {
    let indent = INDENT.repeat(depth);
    match value {
        DocumentValue::Null => {
            out.push_str(&format!("{indent}<{name}/>\n"));
        }
        DocumentValue::Object(map) if map.is_empty() => {
            out.push_str(&format!("{indent}<{name}/>\n"));
        }
        DocumentValue::Array(items) if items.is_empty() => {
            out.push_str(&format!("{indent}<{name}/>\n"));
        }
        DocumentValue::Object(map) => {
            out.push_str(&format!("{indent}<{name}>\n"));
            for (key, child) in map {
                write_element(out, &element_name(key), child, depth + 1);
            }
            out.push_str(&format!("{indent}</{name}>\n"));
        }
        DocumentValue::Array(items) => {
            out.push_str(&format!("{indent}<{name}>\n"));
            for item in items {
                write_element(out, XML_ITEM, item, depth + 1);
            }
            out.push_str(&format!("{indent}</{name}>\n"));
        }
        scalar => {
            let text = escape_xml(&to_display_string(scalar));
            out.push_str(&format!("{indent}<{name}>{text}</{name}>\n"));
        }
    }
}

/// Map a key onto a legal XML element name.
fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let starts_ok = name
        .chars()
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false);
    if !starts_ok {
        name.insert(0, '_');
    }
    name
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
