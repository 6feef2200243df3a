use crate::aggregate::CircuitBreakerConfig;
use crate::error::{FrontschemaError, Result};
use crate::io::{DataFormat, FsReader, Reader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything one pipeline run needs, loadable from a YAML or JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub schema: PathBuf,
    /// Glob patterns or directories naming the input documents.
    pub inputs: Vec<String>,
    pub output: PathBuf,
    /// Overrides the schema's `x-template`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<DataFormat>,
    /// Fail documents that do not match the item schema instead of warning.
    #[serde(default)]
    pub strict: bool,
    /// Skip documents that carry no frontmatter block.
    #[serde(default)]
    pub require_frontmatter: bool,
    /// Render without writing the output file.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

impl PipelineConfig {
    pub fn new(
        schema: impl Into<PathBuf>,
        inputs: Vec<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        PipelineConfig {
            schema: schema.into(),
            inputs,
            output: output.into(),
            template: None,
            output_format: None,
            strict: false,
            require_frontmatter: false,
            dry_run: false,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema.as_os_str().is_empty() {
            return Err(FrontschemaError::EmptyInput("schema path".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(FrontschemaError::EmptyInput("output path".into()));
        }
        if self.inputs.iter().all(|i| i.trim().is_empty()) {
            return Err(FrontschemaError::EmptyInput("no input patterns configured".into()));
        }
        self.circuit_breaker.validate()
    }
}

/// Load a pipeline config file (JSON by extension, YAML otherwise).
pub fn parse_config(path: &Path) -> Result<PipelineConfig> {
    let content = FsReader.read(path)?;
    let config = match DataFormat::from_path(path) {
        DataFormat::Json => serde_json::from_str(&content)?,
        _ => parse_config_str(&content)?,
    };
    Ok(config)
}

/// Parse a pipeline config from YAML (JSON is accepted too).
pub fn parse_config_str(content: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig = serde_yaml::from_str(content)?;
    Ok(config)
}
