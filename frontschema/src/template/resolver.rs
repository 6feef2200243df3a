use super::placeholder::{Placeholder, PlaceholderScanner};
use super::{TemplateContent, TemplateDefinition};
use crate::document::{to_display_string, DocumentMap, DocumentValue};
use crate::error::{FrontschemaError, Result};
use crate::property_path::{PropertyExtractor, PropertyPath};

/// Resolves `{path}` and `{@path}` placeholders against the final data.
pub struct TemplateVariableResolver<'t> {
    scanner: PlaceholderScanner,
    items_template: Option<&'t TemplateDefinition>,
}

impl<'t> TemplateVariableResolver<'t> {
    pub fn new() -> Result<Self> {
        Ok(TemplateVariableResolver {
            scanner: PlaceholderScanner::new()?,
            items_template: None,
        })
    }

    /// Render every element of an `{@path}` expansion through `template`.
    pub fn with_items_template(mut self, template: &'t TemplateDefinition) -> Self {
        self.items_template = Some(template);
        self
    }

    pub fn resolve_scalar(
        &self,
        data: &DocumentValue,
        path: &PropertyPath,
    ) -> Result<DocumentValue> {
        PropertyExtractor::extract(data, path).ok_or_else(|| FrontschemaError::VariableNotFound {
            variable: path.to_string(),
        })
    }

    /// The list an `{@path}` expands to. A single value expands to itself.
    pub fn resolve_array(
        &self,
        data: &DocumentValue,
        path: &PropertyPath,
    ) -> Result<Vec<DocumentValue>> {
        match PropertyExtractor::extract(data, path) {
            Some(DocumentValue::Array(items)) => Ok(items),
            Some(other) => Ok(vec![other]),
            None => Err(FrontschemaError::VariableNotFound {
                variable: format!("@{path}"),
            }),
        }
    }

    /// Resolve a structured template value. Strings that are exactly one
    /// `{path}` take the resolved value with its type; an array whose only
    /// element is `{@path}` becomes the expanded list.
    pub fn resolve_value(
        &self,
        template: &DocumentValue,
        data: &DocumentValue,
    ) -> Result<DocumentValue> {
        match template {
            DocumentValue::String(text) => match self.scanner.exact(text)? {
                Some(Placeholder::Scalar(path)) => self.resolve_scalar(data, &path),
                Some(Placeholder::Expand(path)) => Err(misplaced_expansion(&path)),
                None => self.resolve_text(text, data).map(DocumentValue::String),
            },
            DocumentValue::Array(items) => {
                if let [DocumentValue::String(only)] = items.as_slice() {
                    if let Some(Placeholder::Expand(path)) = self.scanner.exact(only)? {
                        return self.expand(data, &path).map(DocumentValue::Array);
                    }
                }
                items
                    .iter()
                    .map(|item| self.resolve_value(item, data))
                    .collect::<Result<Vec<_>>>()
                    .map(DocumentValue::Array)
            }
            DocumentValue::Object(map) => {
                let mut out = DocumentMap::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(self.resolve_text(key, data)?, self.resolve_value(value, data)?);
                }
                Ok(DocumentValue::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    /// Substitute scalar placeholders in free text. Array expansion has no
    /// textual form, so `{@path}` fails here.
    pub fn resolve_text(&self, text: &str, data: &DocumentValue) -> Result<String> {
        let found = self.scanner.scan(text)?;
        if found.is_empty() {
            return Ok(text.to_string());
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in found {
            let path = match &m.placeholder {
                Placeholder::Scalar(path) => path,
                Placeholder::Expand(path) => return Err(misplaced_expansion(path)),
            };
            out.push_str(&text[last..m.range.start]);
            out.push_str(&to_display_string(&self.resolve_scalar(data, path)?));
            last = m.range.end;
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn expand(&self, data: &DocumentValue, path: &PropertyPath) -> Result<Vec<DocumentValue>> {
        let items = self.resolve_array(data, path)?;
        let Some(template) = self.items_template else {
            return Ok(items);
        };

        // items render without the items template, so expansions inside it stay flat
        let item_resolver = TemplateVariableResolver {
            scanner: self.scanner.clone(),
            items_template: None,
        };
        items
            .iter()
            .map(|item| match template.content() {
                TemplateContent::Structured(value) => item_resolver.resolve_value(value, item),
                TemplateContent::Text(text) => item_resolver
                    .resolve_text(text, item)
                    .map(DocumentValue::String),
            })
            .collect()
    }
}

fn misplaced_expansion(path: &PropertyPath) -> FrontschemaError {
    FrontschemaError::VariableResolutionFailed {
        variable: format!("@{path}"),
        reason: "array expansion must be the only element of an array".to_string(),
    }
}
