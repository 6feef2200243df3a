use super::merge_with_base;
use crate::document::{empty_map, DocumentValue};
use crate::property_path::{set_path, PropertyExtractor};
use crate::schema::SchemaDefinition;

/// Fills properties the aggregate lacks from the schema's `default` values.
/// A property that is present keeps its value whole, even when its default
/// is an object.
pub struct BasePropertyPopulator;

impl BasePropertyPopulator {
    pub fn populate(aggregate: &DocumentValue, schema: &SchemaDefinition) -> DocumentValue {
        let mut populated = aggregate.clone();
        for (path, default) in schema.defaults() {
            match PropertyExtractor::extract(&populated, &path) {
                None | Some(DocumentValue::Null) => {}
                Some(_) => continue,
            }
            match set_path(&empty_map(), &path, default) {
                // an ancestor that is a scalar in the aggregate keeps its value
                Ok(base) => populated = merge_with_base(&populated, &base),
                Err(e) => log::debug!("Skipping default for '{path}': {e}"),
            }
        }
        populated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema_str;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SCHEMA: &str = r#"
type: object
properties:
  version: { type: string, default: "1.0.0" }
  description: { type: string, default: "Command registry" }
  meta:
    type: object
    properties:
      license: { type: string, default: MIT }
  commands:
    type: array
    x-frontmatter-part: true
    items:
      properties:
        priority: { type: integer, default: 3 }
"#;

    #[test]
    fn test_populate_missing_defaults() {
        let schema = parse_schema_str(SCHEMA).unwrap();
        let aggregate = json!({ "version": "2.0.0", "commands": [{ "c1": "git" }] });
        let populated = BasePropertyPopulator::populate(&aggregate, &schema);
        assert_eq!(
            populated,
            json!({
                "version": "2.0.0",
                "commands": [{ "c1": "git" }],
                "description": "Command registry",
                "meta": { "license": "MIT" }
            })
        );
    }

    #[test]
    fn test_populate_without_defaults_is_identity() {
        let schema = parse_schema_str("type: object\n").unwrap();
        let aggregate = json!({ "a": [1, 2] });
        assert_eq!(BasePropertyPopulator::populate(&aggregate, &schema), aggregate);
    }

    #[test]
    fn test_conflicting_nested_default() {
        let schema = parse_schema_str(
            "properties:\n  a:\n    default: 1\n    properties:\n      b: { default: 2 }\n",
        )
        .unwrap();
        let populated = BasePropertyPopulator::populate(&json!({}), &schema);
        assert_eq!(populated, json!({ "a": 1 }));
    }

    #[test]
    fn test_object_default_does_not_merge_into_present_value() {
        let schema = parse_schema_str(
            "properties:\n  config:\n    type: object\n    default: { a: 1, b: 2 }\n",
        )
        .unwrap();

        let populated = BasePropertyPopulator::populate(&json!({ "config": { "a": 5 } }), &schema);
        assert_eq!(populated, json!({ "config": { "a": 5 } }));

        let populated = BasePropertyPopulator::populate(&json!({ "config": null }), &schema);
        assert_eq!(populated, json!({ "config": { "a": 1, "b": 2 } }));

        let populated = BasePropertyPopulator::populate(&json!({}), &schema);
        assert_eq!(populated, json!({ "config": { "a": 1, "b": 2 } }));
    }

    #[test]
    fn test_nested_default_fills_existing_parent() {
        let schema = parse_schema_str(SCHEMA).unwrap();
        let aggregate = json!({ "meta": { "owner": "docs" }, "commands": [] });
        let populated = BasePropertyPopulator::populate(&aggregate, &schema);
        assert_eq!(populated["meta"], json!({ "owner": "docs", "license": "MIT" }));
    }
}
