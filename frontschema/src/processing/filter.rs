use crate::document::DocumentValue;
use crate::error::{FrontschemaError, Result};
use std::collections::HashMap;

/// Evaluates a query expression against a value.
pub trait FilterEvaluator {
    fn evaluate(&self, expression: &str, data: &DocumentValue) -> Result<DocumentValue>;
}

/// JMESPath evaluation backed by the `jmespath` crate.
///
/// The crate hands mappings back with sorted keys. Keys that also appear in
/// the input are put back in the order they were first seen there; keys the
/// expression introduced follow in sorted order.
#[derive(Debug, Default, Clone, Copy)]
pub struct JmesPathEvaluator;

impl FilterEvaluator for JmesPathEvaluator {
    fn evaluate(&self, expression: &str, data: &DocumentValue) -> Result<DocumentValue> {
        let compiled = jmespath::compile(expression).map_err(|e| {
            FrontschemaError::processing("jmespath", format!("invalid expression '{expression}': {e}"))
        })?;
        let result = compiled.search(data).map_err(|e| {
            FrontschemaError::processing("jmespath", format!("evaluating '{expression}': {e}"))
        })?;
        let result = serde_json::to_value(&*result)?;

        let mut order = HashMap::new();
        collect_key_order(data, &mut order);
        Ok(restore_key_order(result, &order))
    }
}

fn collect_key_order(value: &DocumentValue, order: &mut HashMap<String, usize>) {
    match value {
        DocumentValue::Object(map) => {
            for (key, child) in map {
                let next = order.len();
                order.entry(key.clone()).or_insert(next);
                collect_key_order(child, order);
            }
        }
        DocumentValue::Array(items) => {
            for item in items {
                collect_key_order(item, order);
            }
        }
        _ => {}
    }
}

fn restore_key_order(value: DocumentValue, order: &HashMap<String, usize>) -> DocumentValue {
    match value {
        DocumentValue::Object(map) => {
            let mut entries: Vec<(String, DocumentValue)> = map.into_iter().collect();
            entries.sort_by_key(|(key, _)| order.get(key).copied().unwrap_or(usize::MAX));
            DocumentValue::Object(
                entries
                    .into_iter()
                    .map(|(key, child)| (key, restore_key_order(child, order)))
                    .collect(),
            )
        }
        DocumentValue::Array(items) => DocumentValue::Array(
            items
                .into_iter()
                .map(|item| restore_key_order(item, order))
                .collect(),
        ),
        other => other,
    }
}
