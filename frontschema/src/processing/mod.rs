// Schema processing - evaluates x-* directives against documents and the aggregate

mod extract_from;
mod filter;

pub use extract_from::ExtractFromProcessor;
pub use filter::{FilterEvaluator, JmesPathEvaluator};

use crate::document::DocumentValue;
use crate::error::{FrontschemaError, Result};
use crate::property_path::{set_path, PropertyExtractor, PropertyPath};
use crate::schema::{Directive, DirectiveNode, DirectiveScope, SchemaDefinition};
use std::path::PathBuf;

/// Order in which directive kinds run within a shaping pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    ExtractFrom,
    DerivedFrom,
    FlattenArrays,
    Filter,
}

const DOCUMENT_PASSES: [Pass; 3] = [Pass::ExtractFrom, Pass::DerivedFrom, Pass::FlattenArrays];
const AGGREGATE_PASSES: [Pass; 4] = [
    Pass::ExtractFrom,
    Pass::DerivedFrom,
    Pass::FlattenArrays,
    Pass::Filter,
];

/// Interprets the directives collected from a schema.
pub struct SchemaProcessingService {
    filter: Box<dyn FilterEvaluator>,
}

impl Default for SchemaProcessingService {
    fn default() -> Self {
        SchemaProcessingService::new(Box::new(JmesPathEvaluator))
    }
}

impl SchemaProcessingService {
    pub fn new(filter: Box<dyn FilterEvaluator>) -> Self {
        SchemaProcessingService { filter }
    }

    /// The `x-template` reference, as written in the schema.
    pub fn resolve_template_path(&self, schema: &SchemaDefinition) -> Result<PathBuf> {
        schema
            .template_ref()
            .map(PathBuf::from)
            .ok_or(FrontschemaError::TemplateNotDefined)
    }

    /// The `x-template-items` reference, as written in the schema.
    pub fn resolve_items_template_path(&self, schema: &SchemaDefinition) -> Result<PathBuf> {
        schema
            .items_template_ref()
            .map(PathBuf::from)
            .ok_or(FrontschemaError::TemplateItemsNotDefined)
    }

    /// Apply the document-scoped directives to one document header.
    pub fn shape_per_document(
        &self,
        schema: &SchemaDefinition,
        doc: &DocumentValue,
    ) -> Result<DocumentValue> {
        let mut shaped = doc.clone();
        for pass in DOCUMENT_PASSES {
            for node in schema.directive_nodes() {
                if let DirectiveScope::Document { target } = &node.scope {
                    shaped = self.apply_node(pass, node, target, &shaped)?;
                }
            }
        }
        Ok(shaped)
    }

    /// Apply the aggregate-scoped directives once all documents are combined.
    /// Any failure here is fatal to the run.
    pub fn shape_aggregate(
        &self,
        schema: &SchemaDefinition,
        aggregate: &DocumentValue,
    ) -> Result<DocumentValue> {
        let mut shaped = aggregate.clone();
        for pass in AGGREGATE_PASSES {
            for node in schema.directive_nodes() {
                if node.scope == DirectiveScope::Aggregate {
                    shaped = self.apply_node(pass, node, &node.path, &shaped)?;
                }
            }
        }
        Ok(shaped)
    }

    fn apply_node(
        &self,
        pass: Pass,
        node: &DirectiveNode,
        target: &PropertyPath,
        data: &DocumentValue,
    ) -> Result<DocumentValue> {
        let mut out = data.clone();
        for directive in &node.directives {
            out = match (pass, directive) {
                (Pass::ExtractFrom, Directive::ExtractFrom { source }) => {
                    ExtractFromProcessor::apply(&out, source, target)?
                }
                (Pass::DerivedFrom, Directive::DerivedFrom { source, unique }) => {
                    let values = derive(&out, source, *unique);
                    log::debug!("Derived {} value(s) for '{target}' from '{source}'", values.len());
                    set_path(&out, target, DocumentValue::Array(values))?
                }
                (Pass::FlattenArrays, Directive::FlattenArrays { source }) => {
                    let current = match source {
                        Some(source) => Some(PropertyExtractor::extract_list(&out, source)),
                        None => PropertyExtractor::extract(&out, target).map(|v| match v {
                            DocumentValue::Array(items) => items,
                            other => vec![other],
                        }),
                    };
                    match current {
                        Some(items) => {
                            set_path(&out, target, DocumentValue::Array(flatten_one_level(items)))?
                        }
                        None => out,
                    }
                }
                (Pass::Filter, Directive::JmesPathFilter { expression }) => {
                    let filtered = self.filter.evaluate(expression, &out).map_err(|e| {
                        FrontschemaError::processing(
                            &format!("x-jmespath-filter at '{}'", node.path),
                            e.to_string(),
                        )
                    })?;
                    if target.is_root() {
                        filtered
                    } else {
                        set_path(&out, target, filtered)?
                    }
                }
                _ => out,
            };
        }
        Ok(out)
    }
}

/// Extract `source` as a list, optionally dropping repeats while keeping
/// first-occurrence order.
pub fn derive(data: &DocumentValue, source: &PropertyPath, unique: bool) -> Vec<DocumentValue> {
    let values = PropertyExtractor::extract_list(data, source);
    if !unique {
        return values;
    }
    let mut seen: Vec<DocumentValue> = Vec::with_capacity(values.len());
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// Splice nested lists into their parent; other elements keep their shape.
pub fn flatten_one_level(items: Vec<DocumentValue>) -> Vec<DocumentValue> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            DocumentValue::Array(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
    out
}
