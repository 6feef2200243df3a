use super::resolver::RefResolver;
use super::types::SchemaDefinition;
use crate::error::{FrontschemaError, Result};
use crate::io::{DataFormat, MemoryFs, Reader, SerdeDecoder, StructuredDecoder};
use std::path::Path;

/// Load a schema file, resolve its `$ref`s, and collect its directives.
pub fn parse_schema(
    path: &Path,
    reader: &dyn Reader,
    decoder: &dyn StructuredDecoder,
) -> Result<SchemaDefinition> {
    let content = reader.read(path)?;
    let root = decoder
        .decode(&content, schema_format(path))
        .map_err(|e| match e {
            FrontschemaError::Parse { .. } => {
                FrontschemaError::SchemaNotLoaded(format!("{}: {e}", path.display()))
            }
            other => other,
        })?;

    let resolved = RefResolver::new(reader, decoder).resolve(root, path)?;
    SchemaDefinition::from_value(resolved)
}

/// Parse a schema from a JSON or YAML string. Only local `#/...` refs resolve.
pub fn parse_schema_str(content: &str) -> Result<SchemaDefinition> {
    let format = if content.trim_start().starts_with('{') {
        DataFormat::Json
    } else {
        DataFormat::Yaml
    };
    let root = SerdeDecoder.decode(content, format)?;
    let resolved = RefResolver::new(&MemoryFs::new(), &SerdeDecoder)
        .resolve(root, Path::new("<inline>"))?;
    SchemaDefinition::from_value(resolved)
}

/// Schemas are JSON when the extension says so and YAML otherwise.
fn schema_format(path: &Path) -> DataFormat {
    match DataFormat::from_path(path) {
        DataFormat::Json => DataFormat::Json,
        _ => DataFormat::Yaml,
    }
}
