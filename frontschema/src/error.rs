use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontschemaError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid property path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Schema not loaded: {0}")]
    SchemaNotLoaded(String),

    #[error("Schema does not define x-template")]
    TemplateNotDefined,

    #[error("Schema does not define x-template-items")]
    TemplateItemsNotDefined,

    #[error("Circular $ref: {chain}")]
    CircularReference { chain: String },

    #[error("No frontmatter found in {0}")]
    NoFrontmatter(String),

    #[error("Malformed frontmatter: {message}")]
    MalformedFrontmatter { message: String, raw: String },

    #[error("{format} parse error: {message}")]
    Parse {
        format: String,
        message: String,
        raw: String,
    },

    #[error("Template variable not found: {{{variable}}}")]
    VariableNotFound { variable: String },

    #[error("Cannot resolve template variable '{variable}': {reason}")]
    VariableResolutionFailed { variable: String, reason: String },

    #[error("Data composition failed: {0}")]
    DataCompositionFailed(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} failed: {message}")]
    ProcessingFailed { operation: String, message: String },

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse grouping of errors, for callers that branch on the kind of failure
/// rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Schema,
    Frontmatter,
    Template,
    FileSystem,
    Processing,
}

impl FrontschemaError {
    pub fn category(&self) -> ErrorCategory {
        use FrontschemaError::*;
        match self {
            EmptyInput(_) | InvalidFormat(_) | OutOfRange(_) | InvalidPath { .. } => {
                ErrorCategory::Validation
            }
            SchemaNotLoaded(_)
            | TemplateNotDefined
            | TemplateItemsNotDefined
            | CircularReference { .. } => ErrorCategory::Schema,
            NoFrontmatter(_) | MalformedFrontmatter { .. } | Parse { .. } | Yaml(_) | Json(_) => {
                ErrorCategory::Frontmatter
            }
            VariableNotFound { .. }
            | VariableResolutionFailed { .. }
            | DataCompositionFailed(_) => ErrorCategory::Template,
            FileNotFound(_) | PathNotFound(_) | PermissionDenied(_) | Io(_) => {
                ErrorCategory::FileSystem
            }
            ProcessingFailed { .. } | Cancelled => ErrorCategory::Processing,
        }
    }

    /// Shorthand for a `ProcessingFailed` tagged with the operation name.
    pub(crate) fn processing(operation: &str, message: impl Into<String>) -> Self {
        FrontschemaError::ProcessingFailed {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        FrontschemaError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrontschemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            FrontschemaError::TemplateNotDefined.category(),
            ErrorCategory::Schema
        );
        assert_eq!(
            FrontschemaError::VariableNotFound {
                variable: "id.full".into()
            }
            .category(),
            ErrorCategory::Template
        );
        assert_eq!(
            FrontschemaError::FileNotFound(PathBuf::from("a.md")).category(),
            ErrorCategory::FileSystem
        );
        assert_eq!(FrontschemaError::Cancelled.category(), ErrorCategory::Processing);
    }

    #[test]
    fn test_variable_not_found_message_keeps_braces() {
        let err = FrontschemaError::VariableNotFound {
            variable: "id.full".into(),
        };
        assert_eq!(err.to_string(), "Template variable not found: {id.full}");
    }
}
