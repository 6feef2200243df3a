use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Serialization format of a schema, template, header block, or output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    Json,
    Yaml,
    Xml,
    Text,
}

impl DataFormat {
    /// Pick a format from a file extension. Unknown or missing extensions are `Text`.
    pub fn from_path(path: &Path) -> Self {
        DataFormat::from_extension(path).unwrap_or(DataFormat::Text)
    }

    /// The format a file extension names, if it names one.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(DataFormat::Json),
            "yaml" | "yml" => Some(DataFormat::Yaml),
            "xml" => Some(DataFormat::Xml),
            "txt" | "text" | "md" => Some(DataFormat::Text),
            _ => None,
        }
    }

    /// Whether content in this format decodes to a structured value.
    pub fn is_structured(self) -> bool {
        matches!(self, DataFormat::Json | DataFormat::Yaml)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Yaml => "yaml",
            DataFormat::Xml => "xml",
            DataFormat::Text => "text",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(DataFormat::Json),
            "yaml" | "yml" => Ok(DataFormat::Yaml),
            "xml" => Ok(DataFormat::Xml),
            "text" | "txt" => Ok(DataFormat::Text),
            other => Err(format!("unknown format '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(DataFormat::from_path(Path::new("out/registry.json")), DataFormat::Json);
        assert_eq!(DataFormat::from_path(Path::new("schema.YML")), DataFormat::Yaml);
        assert_eq!(DataFormat::from_path(Path::new("report.xml")), DataFormat::Xml);
        assert_eq!(DataFormat::from_path(Path::new("README.md")), DataFormat::Text);
        assert_eq!(DataFormat::from_path(Path::new("noext")), DataFormat::Text);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(DataFormat::from_extension(Path::new("notes.txt")), Some(DataFormat::Text));
        assert_eq!(DataFormat::from_extension(Path::new("out.yaml")), Some(DataFormat::Yaml));
        assert_eq!(DataFormat::from_extension(Path::new("out.toml")), None);
        assert_eq!(DataFormat::from_extension(Path::new("out")), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("yml".parse::<DataFormat>().unwrap(), DataFormat::Yaml);
        assert!("toml".parse::<DataFormat>().is_err());
    }
}
