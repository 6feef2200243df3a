// Templates - loading, placeholder resolution, and output rendering

mod output;
mod placeholder;
mod renderer;
mod resolver;

pub use output::{serialize, to_xml};
pub use placeholder::{Placeholder, PlaceholderMatch, PlaceholderScanner};
pub use renderer::{select_output_format, TemplateRenderer};
pub use resolver::TemplateVariableResolver;

use crate::document::DocumentValue;
use crate::error::{FrontschemaError, Result};
use crate::io::{DataFormat, Reader, StructuredDecoder};
use std::path::{Path, PathBuf};

/// Template body: a decoded value for JSON/YAML templates, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateContent {
    Structured(DocumentValue),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    source: Option<PathBuf>,
    format: DataFormat,
    content: TemplateContent,
}

impl TemplateDefinition {
    /// Load a template file; its extension decides whether it is structured.
    pub fn load(
        path: &Path,
        reader: &dyn Reader,
        decoder: &dyn StructuredDecoder,
    ) -> Result<Self> {
        let text = reader.read(path)?;
        let format = DataFormat::from_path(path);
        let mut template =
            TemplateDefinition::parse(&text, format, decoder).map_err(|e| match e {
                FrontschemaError::InvalidFormat(message) => FrontschemaError::InvalidFormat(
                    format!("template {}: {message}", path.display()),
                ),
                other => other,
            })?;
        template.source = Some(path.to_path_buf());
        log::debug!("Loaded {format} template from {}", path.display());
        Ok(template)
    }

    pub fn parse(text: &str, format: DataFormat, decoder: &dyn StructuredDecoder) -> Result<Self> {
        let content = if format.is_structured() {
            let value = decoder.decode(text, format).map_err(|e| match e {
                FrontschemaError::Parse { format, message, .. } => {
                    FrontschemaError::InvalidFormat(format!("{format} template: {message}"))
                }
                other => other,
            })?;
            TemplateContent::Structured(value)
        } else {
            TemplateContent::Text(text.to_string())
        };
        Ok(TemplateDefinition {
            source: None,
            format,
            content,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn content(&self) -> &TemplateContent {
        &self.content
    }

    pub fn is_structured(&self) -> bool {
        matches!(self.content, TemplateContent::Structured(_))
    }
}
