// I/O collaborators - reading, writing, listing, and decoding structured text

mod format;
mod memory;

pub use format::DataFormat;
pub use memory::MemoryFs;

use crate::document::DocumentValue;
use crate::error::{FrontschemaError, Result};
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Pattern appended to directory inputs so they expand to every document beneath them.
pub const DOCUMENT_GLOB: &str = "**/*.md";

pub trait Reader {
    fn read(&self, path: &Path) -> Result<String>;
}

pub trait Writer {
    fn write(&self, path: &Path, content: &str) -> Result<()>;
}

pub trait Lister {
    /// Expand a glob pattern or directory into the document paths it names.
    fn list(&self, pattern: &str) -> Result<Vec<PathBuf>>;
}

pub trait StructuredDecoder {
    fn decode(&self, text: &str, format: DataFormat) -> Result<DocumentValue>;
}

/// Reads from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl Reader for FsReader {
    fn read(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| io_error(path, e))
    }
}

/// Writes to the local filesystem. Each write goes to a temp file in the
/// destination directory first and is then persisted over the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWriter;

impl Writer for FsWriter {
    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| io_error(&parent, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| io_error(&parent, e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| io_error(path, e))?;
        tmp.persist(path).map_err(|e| io_error(path, e.error))?;
        Ok(())
    }
}

/// Expands glob patterns on the local filesystem. A pattern naming an
/// existing directory expands to every Markdown file beneath it.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobLister;

impl Lister for GlobLister {
    fn list(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = if Path::new(pattern).is_dir() {
            format!("{}/{}", pattern.trim_end_matches('/'), DOCUMENT_GLOB)
        } else {
            pattern.to_string()
        };

        let entries = glob::glob(&pattern).map_err(|e| {
            FrontschemaError::InvalidFormat(format!("Invalid glob pattern '{pattern}': {e}"))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().to_path_buf();
                    return Err(io_error(&path, e.into_error()));
                }
            }
        }
        Ok(files)
    }
}

/// Decodes YAML and JSON text with serde.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeDecoder;

impl StructuredDecoder for SerdeDecoder {
    fn decode(&self, text: &str, format: DataFormat) -> Result<DocumentValue> {
        let decoded = match format {
            DataFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            DataFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            DataFormat::Xml | DataFormat::Text => {
                return Err(FrontschemaError::InvalidFormat(format!(
                    "cannot decode {format} into a structured value"
                )))
            }
        };

        decoded.map_err(|message| FrontschemaError::Parse {
            format: format.as_str().to_uppercase(),
            message,
            raw: text.to_string(),
        })
    }
}

fn io_error(path: &Path, err: std::io::Error) -> FrontschemaError {
    match err.kind() {
        std::io::ErrorKind::NotFound => FrontschemaError::FileNotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => {
            FrontschemaError::PermissionDenied(path.to_path_buf())
        }
        _ => FrontschemaError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_fs_reader_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = FsReader.read(&tmp.path().join("missing.md")).unwrap_err();
        assert!(matches!(err, FrontschemaError::FileNotFound(_)));
    }

    #[test]
    fn test_fs_writer_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("out/nested/registry.json");
        FsWriter.write(&target, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{}");

        FsWriter.write(&target, "{\"a\":1}").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_glob_lister_expands_directories() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("docs/sub")).unwrap();
        std::fs::write(tmp.path().join("docs/a.md"), "a").unwrap();
        std::fs::write(tmp.path().join("docs/sub/b.md"), "b").unwrap();
        std::fs::write(tmp.path().join("docs/notes.txt"), "c").unwrap();

        let dir = tmp.path().join("docs");
        let mut files = GlobLister.list(dir.to_str().unwrap()).unwrap();
        files.sort();
        assert_eq!(files, vec![dir.join("a.md"), dir.join("sub/b.md")]);
    }

    #[test]
    fn test_glob_lister_invalid_pattern() {
        let err = GlobLister.list("docs/[").unwrap_err();
        assert!(matches!(err, FrontschemaError::InvalidFormat(_)));
    }

    #[test]
    fn test_serde_decoder_yaml_and_json() {
        let yaml = SerdeDecoder
            .decode("title: Hello\ntags: [a, b]\n", DataFormat::Yaml)
            .unwrap();
        assert_eq!(yaml, json!({ "title": "Hello", "tags": ["a", "b"] }));

        let json = SerdeDecoder
            .decode(r#"{"b": 1, "a": 2}"#, DataFormat::Json)
            .unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_serde_decoder_parse_error_keeps_raw_text() {
        let err = SerdeDecoder
            .decode("title: [unclosed", DataFormat::Yaml)
            .unwrap_err();
        match err {
            FrontschemaError::Parse { format, raw, .. } => {
                assert_eq!(format, "YAML");
                assert_eq!(raw, "title: [unclosed");
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }
}
