use crate::document::{type_name, DocumentValue};
use crate::error::{FrontschemaError, Result};
use crate::schema::SchemaType;

/// Result of validating a document header
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Validate a document header against the item schema.
/// In strict mode issues are errors; otherwise they are warnings only.
/// Only `type`, `required`, `enum`, `properties`, `items`, and
/// `additionalProperties: false` are interpreted.
pub fn validate_document(
    schema: &DocumentValue,
    data: &DocumentValue,
    strict: bool,
) -> ValidationResult {
    let mut result = ValidationResult::default();
    validate_node(schema, data, "", strict, &mut result);
    result
}

fn validate_node(
    schema: &DocumentValue,
    value: &DocumentValue,
    location: &str,
    strict: bool,
    result: &mut ValidationResult,
) {
    let types = declared_types(schema);
    if !types.is_empty() && !types.iter().any(|t| t.matches(value)) {
        let expected: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
        add_issue(
            result,
            strict,
            format!(
                "{} expected {}, got {}",
                describe(location),
                expected.join(" or "),
                type_name(value)
            ),
        );
        return;
    }

    if let Some(allowed) = schema.get("enum").and_then(|e| e.as_array()) {
        if !allowed.contains(value) {
            add_issue(
                result,
                strict,
                format!(
                    "{} value {} is not in enum: {}",
                    describe(location),
                    value,
                    DocumentValue::Array(allowed.clone())
                ),
            );
        }
    }

    match value {
        DocumentValue::Object(map) => {
            if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
                for key in required.iter().filter_map(|k| k.as_str()) {
                    let present = map.get(key).map(|v| !v.is_null()).unwrap_or(false);
                    if !present {
                        add_issue(
                            result,
                            strict,
                            format!("Required field '{}' is missing", join(location, key)),
                        );
                    }
                }
            }

            let properties = schema.get("properties").and_then(|p| p.as_object());
            if let Some(properties) = properties {
                for (key, child_schema) in properties {
                    if let Some(child) = map.get(key).filter(|v| !v.is_null()) {
                        validate_node(child_schema, child, &join(location, key), strict, result);
                    }
                }
            }

            if schema.get("additionalProperties") == Some(&DocumentValue::Bool(false)) {
                for key in map.keys() {
                    let declared = properties.map(|p| p.contains_key(key)).unwrap_or(false);
                    if !declared {
                        add_issue(
                            result,
                            strict,
                            format!(
                                "Unexpected field '{}' (additionalProperties is false)",
                                join(location, key)
                            ),
                        );
                    }
                }
            }
        }
        DocumentValue::Array(items) => {
            if let Some(item_schema) = schema.get("items").filter(|i| i.is_object()) {
                for (i, item) in items.iter().enumerate() {
                    validate_node(item_schema, item, &format!("{location}[{i}]"), strict, result);
                }
            }
        }
        _ => {}
    }
}

fn declared_types(schema: &DocumentValue) -> Vec<SchemaType> {
    match schema.get("type") {
        Some(DocumentValue::String(s)) => SchemaType::parse(s).into_iter().collect(),
        Some(DocumentValue::Array(list)) => list
            .iter()
            .filter_map(|t| t.as_str())
            .filter_map(SchemaType::parse)
            .collect(),
        _ => Vec::new(),
    }
}

fn join(location: &str, key: &str) -> String {
    if location.is_empty() {
        key.to_string()
    } else {
        format!("{location}.{key}")
    }
}

fn describe(location: &str) -> String {
    if location.is_empty() {
        "Document".to_string()
    } else {
        format!("Field '{location}'")
    }
}

fn add_issue(result: &mut ValidationResult, strict: bool, message: String) {
    if strict {
        result.errors.push(message);
    } else {
        result.warnings.push(message);
    }
}

/// Validate and return the warnings. Returns an error if strict validation fails.
pub fn validate_or_reject(
    schema: &DocumentValue,
    data: &DocumentValue,
    strict: bool,
) -> Result<Vec<String>> {
    let result = validate_document(schema, data, strict);

    if !result.is_ok() {
        return Err(FrontschemaError::InvalidFormat(format!(
            "Document validation failed:\n  - {}",
            result.errors.join("\n  - ")
        )));
    }

    Ok(result.warnings)
}
