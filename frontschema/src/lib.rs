pub mod aggregate;
pub mod document;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod processing;
pub mod property_path;
pub mod schema;
pub mod template;
pub mod validation;

pub use document::{DocumentValue, FrontmatterProcessor, ParsedDocument};
pub use error::{ErrorCategory, FrontschemaError, Result};
pub use pipeline::{PipelineConfig, PipelineOrchestrator, PipelineReport, PipelineState};
pub use property_path::{PropertyExtractor, PropertyPath};
pub use schema::{SchemaCache, SchemaDefinition};
pub use template::{TemplateDefinition, TemplateRenderer};
