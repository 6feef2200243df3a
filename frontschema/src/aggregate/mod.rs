// Aggregation - combining per-document records into one composite record

mod circuit_breaker;
mod populator;

pub use circuit_breaker::{BreakerState, CircuitBreaker, CircuitBreakerConfig};
pub use populator::BasePropertyPopulator;

use crate::document::{empty_map, type_name, DocumentMap, DocumentValue};
use crate::error::{FrontschemaError, Result};
use crate::property_path::set_path;
use crate::schema::SchemaDefinition;

/// Combines shaped document headers into the aggregate record.
pub struct Aggregator<'a> {
    schema: &'a SchemaDefinition,
}

impl<'a> Aggregator<'a> {
    pub fn new(schema: &'a SchemaDefinition) -> Self {
        Aggregator { schema }
    }

    /// With an `x-frontmatter-part` node, the documents become that array in
    /// input order. Without one, they are shallow-merged and later keys win.
    pub fn aggregate(&self, documents: &[DocumentValue]) -> Result<DocumentValue> {
        match self.schema.frontmatter_part() {
            Some(part) => {
                log::debug!("Aggregating {} document(s) into '{part}'", documents.len());
                set_path(&empty_map(), part, DocumentValue::Array(documents.to_vec()))
            }
            None => {
                let mut merged = DocumentMap::new();
                for (i, doc) in documents.iter().enumerate() {
                    let map = doc.as_object().ok_or_else(|| {
                        FrontschemaError::DataCompositionFailed(format!(
                            "document {i} is a {}, expected a mapping",
                            type_name(doc)
                        ))
                    })?;
                    for (key, value) in map {
                        merged.insert(key.clone(), value.clone());
                    }
                }
                Ok(DocumentValue::Object(merged))
            }
        }
    }
}

/// Deep-merge `base` under `record`. Values present in `record` win; keys that
/// are missing or null in `record` take the base value.
pub fn merge_with_base(record: &DocumentValue, base: &DocumentValue) -> DocumentValue {
    match (record, base) {
        (DocumentValue::Object(over), DocumentValue::Object(under)) => {
            let mut out = over.clone();
            for (key, base_value) in under {
                let merged = match over.get(key) {
                    None | Some(DocumentValue::Null) => base_value.clone(),
                    Some(value) => merge_with_base(value, base_value),
                };
                out.insert(key.clone(), merged);
            }
            DocumentValue::Object(out)
        }
        (DocumentValue::Null, _) => base.clone(),
        _ => record.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema_str;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_aggregate_into_frontmatter_part() {
        let schema = parse_schema_str(
            "properties:\n  tools:\n    properties:\n      commands:\n        type: array\n        x-frontmatter-part: true\n",
        )
        .unwrap();
        let docs = vec![json!({ "c1": "git" }), json!({ "c1": "spec" })];
        let aggregate = Aggregator::new(&schema).aggregate(&docs).unwrap();
        assert_eq!(
            aggregate,
            json!({ "tools": { "commands": [{ "c1": "git" }, { "c1": "spec" }] } })
        );
    }

    #[test]
    fn test_aggregate_empty_batch_keeps_part_array() {
        let schema =
            parse_schema_str("properties:\n  items:\n    type: array\n    x-frontmatter-part: true\n")
                .unwrap();
        let aggregate = Aggregator::new(&schema).aggregate(&[]).unwrap();
        assert_eq!(aggregate, json!({ "items": [] }));
    }

    #[test]
    fn test_aggregate_without_part_merges() {
        let schema = parse_schema_str("type: object\n").unwrap();
        let docs = vec![json!({ "a": 1, "b": 1 }), json!({ "b": 2, "c": { "d": 3 } })];
        let aggregate = Aggregator::new(&schema).aggregate(&docs).unwrap();
        assert_eq!(aggregate, json!({ "a": 1, "b": 2, "c": { "d": 3 } }));

        let err = Aggregator::new(&schema)
            .aggregate(&[json!(["not", "a", "map"])])
            .unwrap_err();
        assert!(matches!(err, FrontschemaError::DataCompositionFailed(_)));
    }

    #[test]
    fn test_merge_with_base() {
        let record = json!({ "version": "2.0", "meta": { "owner": "me", "license": null } });
        let base = json!({ "version": "1.0", "meta": { "license": "MIT" }, "tags": [] });
        assert_eq!(
            merge_with_base(&record, &base),
            json!({
                "version": "2.0",
                "meta": { "owner": "me", "license": "MIT" },
                "tags": []
            })
        );
    }

    #[test]
    fn test_merge_with_base_keeps_record_shape() {
        // a scalar in the record is never replaced by a base mapping
        let merged = merge_with_base(&json!({ "a": 1 }), &json!({ "a": { "b": 2 } }));
        assert_eq!(merged, json!({ "a": 1 }));
    }
}
