use crate::document::DocumentValue;
use crate::error::{FrontschemaError, Result};
use crate::io::{DataFormat, Reader, StructuredDecoder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const REF: &str = "$ref";

/// Inlines `$ref` nodes: local JSON pointers and refs to sibling files.
pub struct RefResolver<'a> {
    reader: &'a dyn Reader,
    decoder: &'a dyn StructuredDecoder,
    loaded: HashMap<PathBuf, DocumentValue>,
}

impl<'a> RefResolver<'a> {
    pub fn new(reader: &'a dyn Reader, decoder: &'a dyn StructuredDecoder) -> Self {
        RefResolver {
            reader,
            decoder,
            loaded: HashMap::new(),
        }
    }

    /// Resolve every `$ref` in `root`, which was loaded from `source`.
    pub fn resolve(&mut self, root: DocumentValue, source: &Path) -> Result<DocumentValue> {
        self.loaded.insert(source.to_path_buf(), root.clone());
        let mut stack = Vec::new();
        self.resolve_node(&root, source, &mut stack)
    }

    fn resolve_node(
        &mut self,
        node: &DocumentValue,
        source: &Path,
        stack: &mut Vec<String>,
    ) -> Result<DocumentValue> {
        match node {
            DocumentValue::Object(map) => {
                if let Some(reference) = map.get(REF) {
                    let reference = reference.as_str().ok_or_else(|| {
                        FrontschemaError::InvalidFormat(format!(
                            "$ref in {} must be a string",
                            source.display()
                        ))
                    })?;
                    let mut resolved = self.follow(reference, source, stack)?;

                    // sibling keywords override the referenced node
                    if let DocumentValue::Object(target) = &mut resolved {
                        for (key, value) in map {
                            if key != REF {
                                target.insert(key.clone(), self.resolve_node(value, source, stack)?);
                            }
                        }
                    }
                    return Ok(resolved);
                }

                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(key.clone(), self.resolve_node(value, source, stack)?);
                }
                Ok(DocumentValue::Object(out))
            }
            DocumentValue::Array(items) => items
                .iter()
                .map(|item| self.resolve_node(item, source, stack))
                .collect::<Result<Vec<_>>>()
                .map(DocumentValue::Array),
            other => Ok(other.clone()),
        }
    }

    fn follow(
        &mut self,
        reference: &str,
        source: &Path,
        stack: &mut Vec<String>,
    ) -> Result<DocumentValue> {
        if reference.contains("://") {
            return Err(FrontschemaError::InvalidFormat(format!(
                "remote $ref '{reference}' is not supported"
            )));
        }

        let (file_part, pointer) = match reference.split_once('#') {
            Some((file, pointer)) => (file, pointer),
            None => (reference, ""),
        };

        let target_file = if file_part.is_empty() {
            source.to_path_buf()
        } else {
            source
                .parent()
                .map(|dir| dir.join(file_part))
                .unwrap_or_else(|| PathBuf::from(file_part))
        };

        let key = format!("{}#{}", target_file.display(), pointer);
        if stack.contains(&key) {
            let mut chain = stack.clone();
            chain.push(key);
            return Err(FrontschemaError::CircularReference {
                chain: chain.join(" -> "),
            });
        }

        let document = self.load(&target_file)?;
        let target = document
            .pointer(pointer)
            .cloned()
            .ok_or_else(|| FrontschemaError::PathNotFound(format!("$ref '{reference}'")))?;

        stack.push(key);
        let resolved = self.resolve_node(&target, &target_file, stack);
        stack.pop();
        resolved
    }

    fn load(&mut self, path: &Path) -> Result<DocumentValue> {
        if let Some(doc) = self.loaded.get(path) {
            return Ok(doc.clone());
        }
        let text = self.reader.read(path)?;
        let format = match DataFormat::from_path(path) {
            DataFormat::Json => DataFormat::Json,
            _ => DataFormat::Yaml,
        };
        let doc = self.decoder.decode(&text, format)?;
        self.loaded.insert(path.to_path_buf(), doc.clone());
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{MemoryFs, SerdeDecoder};
    use serde_json::json;

    fn resolve(fs: &MemoryFs, path: &str) -> Result<DocumentValue> {
        let text = fs.read(Path::new(path)).unwrap();
        let root = SerdeDecoder.decode(&text, DataFormat::Json).unwrap();
        RefResolver::new(fs, &SerdeDecoder).resolve(root, Path::new(path))
    }

    #[test]
    fn test_local_pointer() {
        let fs = MemoryFs::new();
        fs.insert(
            "schemas/root.json",
            r##"{
                "definitions": { "id": { "type": "string", "pattern": "^REQ" } },
                "properties": { "id": { "$ref": "#/definitions/id", "description": "req id" } }
            }"##,
        );
        let resolved = resolve(&fs, "schemas/root.json").unwrap();
        assert_eq!(
            resolved["properties"]["id"],
            json!({ "type": "string", "pattern": "^REQ", "description": "req id" })
        );
    }

    #[test]
    fn test_file_ref_relative_to_source() {
        let fs = MemoryFs::new();
        fs.insert(
            "schemas/root.json",
            r#"{ "properties": { "cmd": { "$ref": "command.yaml" } } }"#,
        );
        fs.insert(
            "schemas/command.yaml",
            "type: object\nproperties:\n  c1: { $ref: '#/definitions/name' }\ndefinitions:\n  name: { type: string }\n",
        );
        let resolved = resolve(&fs, "schemas/root.json").unwrap();
        assert_eq!(
            resolved["properties"]["cmd"]["properties"]["c1"],
            json!({ "type": "string" })
        );
    }

    #[test]
    fn test_circular_reference() {
        let fs = MemoryFs::new();
        fs.insert(
            "a.json",
            r##"{ "definitions": { "x": { "$ref": "#/definitions/y" }, "y": { "$ref": "#/definitions/x" } },
                 "properties": { "p": { "$ref": "#/definitions/x" } } }"##,
        );
        let err = resolve(&fs, "a.json").unwrap_err();
        match err {
            FrontschemaError::CircularReference { chain } => {
                assert!(chain.contains("#/definitions/x"));
                assert!(chain.contains("#/definitions/y"));
            }
            other => panic!("expected CircularReference, got {other:?}"),
        }
    }

    #[test]
    fn test_repeated_non_circular_refs() {
        let fs = MemoryFs::new();
        fs.insert(
            "a.json",
            r##"{ "definitions": { "s": { "type": "string" } },
                 "properties": { "a": { "$ref": "#/definitions/s" }, "b": { "$ref": "#/definitions/s" } } }"##,
        );
        let resolved = resolve(&fs, "a.json").unwrap();
        assert_eq!(resolved["properties"]["b"], json!({ "type": "string" }));
    }

    #[test]
    fn test_missing_pointer_and_remote_refs() {
        let fs = MemoryFs::new();
        fs.insert("a.json", r##"{ "properties": { "a": { "$ref": "#/definitions/nope" } } }"##);
        assert!(matches!(
            resolve(&fs, "a.json").unwrap_err(),
            FrontschemaError::PathNotFound(_)
        ));

        fs.insert("b.json", r#"{ "properties": { "a": { "$ref": "https://example.com/s.json" } } }"#);
        assert!(matches!(
            resolve(&fs, "b.json").unwrap_err(),
            FrontschemaError::InvalidFormat(_)
        ));
    }
}
