// Pipeline orchestration - sequencing the stages of one run

mod cancel;
mod config;
mod report;
mod state;

pub use cancel::CancellationToken;
pub use config::{parse_config, parse_config_str, PipelineConfig};
pub use report::{DocumentOutcome, DocumentStatus, PipelineReport};
pub use state::{PipelineState, StateMachine};

use crate::aggregate::{Aggregator, BasePropertyPopulator, CircuitBreaker};
use crate::document::{DocumentValue, FrontmatterProcessor, SourceDocument};
use crate::error::{FrontschemaError, Result};
use crate::io::{
    FsReader, FsWriter, GlobLister, Lister, MemoryFs, Reader, SerdeDecoder, StructuredDecoder,
    Writer,
};
use crate::processing::SchemaProcessingService;
use crate::schema::{parse_schema, SchemaCache, SchemaDefinition};
use crate::template::{
    select_output_format, TemplateDefinition, TemplateRenderer, TemplateVariableResolver,
};
use crate::validation::validate_or_reject;
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SKIP_CIRCUIT_OPEN: &str = "circuit-open";
const SKIP_NO_FRONTMATTER: &str = "no-frontmatter";

enum DocumentResult {
    Shaped {
        value: DocumentValue,
        warnings: Vec<String>,
    },
    Skipped(String),
}

/// Runs schema loading, per-document shaping, aggregation, and rendering in
/// sequence. Per-document failures are recorded and the run continues;
/// failures in any other stage end the run in `Failed`.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    reader: Box<dyn Reader>,
    writer: Box<dyn Writer>,
    lister: Box<dyn Lister>,
    decoder: Box<dyn StructuredDecoder>,
    processing: SchemaProcessingService,
    cache: SchemaCache,
    machine: StateMachine,
    cancel: CancellationToken,
}

impl PipelineOrchestrator {
    /// An orchestrator working on the local filesystem.
    pub fn new(config: PipelineConfig) -> Self {
        PipelineOrchestrator::with_collaborators(
            config,
            Box::new(FsReader),
            Box::new(FsWriter),
            Box::new(GlobLister),
            Box::new(SerdeDecoder),
        )
    }

    /// An orchestrator reading from and writing to an in-memory file tree.
    pub fn in_memory(config: PipelineConfig, fs: &MemoryFs) -> Self {
        PipelineOrchestrator::with_collaborators(
            config,
            Box::new(fs.clone()),
            Box::new(fs.clone()),
            Box::new(fs.clone()),
            Box::new(SerdeDecoder),
        )
    }

    pub fn with_collaborators(
        config: PipelineConfig,
        reader: Box<dyn Reader>,
        writer: Box<dyn Writer>,
        lister: Box<dyn Lister>,
        decoder: Box<dyn StructuredDecoder>,
    ) -> Self {
        PipelineOrchestrator {
            config,
            reader,
            writer,
            lister,
            decoder,
            processing: SchemaProcessingService::default(),
            cache: SchemaCache::new(),
            machine: StateMachine::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Reuse schemas resolved by an earlier run.
    pub fn with_cache(mut self, cache: SchemaCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_processing(mut self, processing: SchemaProcessingService) -> Self {
        self.processing = processing;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> &PipelineState {
        self.machine.current()
    }

    /// States visited by the latest run, starting at `Idle`.
    pub fn history(&self) -> &[PipelineState] {
        self.machine.history()
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn into_cache(self) -> SchemaCache {
        self.cache
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop before the next document. The document in flight finishes first.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn run(&mut self) -> Result<PipelineReport> {
        self.machine = StateMachine::new();
        let result = self.execute();
        if let Err(e) = &result {
            let reason = match e {
                FrontschemaError::Cancelled => "cancelled".to_string(),
                other => other.to_string(),
            };
            log::warn!("Pipeline failed: {reason}");
            self.machine.fail(reason);
        }
        // a cancel only applies to the run it interrupted
        self.cancel.reset();
        result
    }

    fn execute(&mut self) -> Result<PipelineReport> {
        let started_at = Utc::now();

        self.machine.transition(PipelineState::Initializing)?;
        self.config.validate()?;

        self.machine.transition(PipelineState::LoadingSchema)?;
        let schema = self.load_schema()?;

        self.machine.transition(PipelineState::LoadingTemplate)?;
        let template = self.load_template(&schema)?;
        let items_template = self.load_items_template(&schema)?;
        let paths = self.discover()?;

        let total = paths.len();
        log::info!("Processing {total} document(s)");
        self.machine
            .transition(PipelineState::ProcessingDocuments { current: 0, total })?;

        let mut breaker = CircuitBreaker::new(self.config.circuit_breaker.clone());
        let mut outcomes = Vec::with_capacity(total);
        let mut shaped = Vec::with_capacity(total);

        for (index, path) in paths.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::info!("Cancelled before {}", path.display());
                return Err(FrontschemaError::Cancelled);
            }

            let outcome = if !breaker.allows_attempt() {
                log::warn!("Skipping {}: circuit breaker is open", path.display());
                DocumentOutcome {
                    path,
                    status: DocumentStatus::Skipped(SKIP_CIRCUIT_OPEN.into()),
                    warnings: Vec::new(),
                }
            } else {
                match self.process_document(&schema, index, &path) {
                    Ok(DocumentResult::Shaped { value, warnings }) => {
                        breaker.record_success();
                        shaped.push(value);
                        log::debug!("Processed {}", path.display());
                        DocumentOutcome {
                            path,
                            status: DocumentStatus::Success,
                            warnings,
                        }
                    }
                    Ok(DocumentResult::Skipped(reason)) => {
                        log::warn!("Skipping {}: {reason}", path.display());
                        DocumentOutcome {
                            path,
                            status: DocumentStatus::Skipped(reason),
                            warnings: Vec::new(),
                        }
                    }
                    Err(e) => {
                        breaker.record_failure();
                        log::warn!("Failed to process {}: {e}", path.display());
                        DocumentOutcome {
                            path,
                            status: DocumentStatus::Failed(e.to_string()),
                            warnings: Vec::new(),
                        }
                    }
                }
            };
            outcomes.push(outcome);

            self.machine.transition(PipelineState::ProcessingDocuments {
                current: index + 1,
                total,
            })?;
        }

        if self.cancel.is_cancelled() {
            log::info!("Cancelled after the last document");
            return Err(FrontschemaError::Cancelled);
        }

        self.machine.transition(PipelineState::Aggregating)?;
        let aggregate = Aggregator::new(&schema).aggregate(&shaped)?;
        let aggregate = self.processing.shape_aggregate(&schema, &aggregate)?;
        let data = BasePropertyPopulator::populate(&aggregate, &schema);

        self.machine.transition(PipelineState::GeneratingOutput)?;
        let format = select_output_format(self.config.output_format, &self.config.output, &template);
        let mut resolver = TemplateVariableResolver::new()?;
        if let Some(items) = &items_template {
            resolver = resolver.with_items_template(items);
        }
        let rendered = TemplateRenderer::new(resolver).render(&template, &data, format)?;

        let written = if self.config.dry_run {
            log::info!("Dry run: not writing {}", self.config.output.display());
            false
        } else {
            self.writer.write(&self.config.output, &rendered)?;
            log::info!("Wrote {} ({format})", self.config.output.display());
            true
        };

        self.machine.transition(PipelineState::Completed)?;

        Ok(PipelineReport {
            output: self.config.output.clone(),
            format,
            rendered,
            written,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn load_schema(&mut self) -> Result<Arc<SchemaDefinition>> {
        let reader = self.reader.as_ref();
        let decoder = self.decoder.as_ref();
        self.cache
            .get_or_load(&self.config.schema, |path| parse_schema(path, reader, decoder))
    }

    fn load_template(&self, schema: &SchemaDefinition) -> Result<TemplateDefinition> {
        let path = match &self.config.template {
            Some(path) => path.clone(),
            None => self.relative_to_schema(&self.processing.resolve_template_path(schema)?),
        };
        TemplateDefinition::load(&path, self.reader.as_ref(), self.decoder.as_ref())
    }

    fn load_items_template(&self, schema: &SchemaDefinition) -> Result<Option<TemplateDefinition>> {
        match self.processing.resolve_items_template_path(schema) {
            Ok(path) => {
                let path = self.relative_to_schema(&path);
                TemplateDefinition::load(&path, self.reader.as_ref(), self.decoder.as_ref())
                    .map(Some)
            }
            Err(FrontschemaError::TemplateItemsNotDefined) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Template refs in a schema are relative to the schema file.
    fn relative_to_schema(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.config.schema.parent() {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    /// Expand every input pattern in the order given. Each pattern's matches
    /// are sorted; a path matched by an earlier pattern is not repeated.
    fn discover(&self) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for pattern in self.config.inputs.iter().filter(|p| !p.trim().is_empty()) {
            let mut paths = self.lister.list(pattern)?;
            paths.sort();
            log::debug!("Input '{pattern}' matched {} document(s)", paths.len());
            found.extend(paths.into_iter().filter(|p| seen.insert(p.clone())));
        }

        if found.is_empty() {
            return Err(FrontschemaError::EmptyInput(format!(
                "no documents matched inputs: {}",
                self.config.inputs.join(", ")
            )));
        }
        Ok(found)
    }

    fn process_document(
        &self,
        schema: &SchemaDefinition,
        index: usize,
        path: &Path,
    ) -> Result<DocumentResult> {
        let raw = self.reader.read(path)?;
        let frontmatter = FrontmatterProcessor::new(self.decoder.as_ref());
        let parsed = if self.config.require_frontmatter {
            match frontmatter.extract_required(&raw, &path.display().to_string()) {
                Err(FrontschemaError::NoFrontmatter(_)) => {
                    return Ok(DocumentResult::Skipped(SKIP_NO_FRONTMATTER.into()))
                }
                other => other?,
            }
        } else {
            frontmatter.extract(&raw)?
        };

        let document = SourceDocument {
            index,
            path: path.to_path_buf(),
            parsed,
        };

        let warnings =
            validate_or_reject(schema.item_schema(), &document.parsed.header, self.config.strict)?;
        for warning in &warnings {
            log::warn!("{}: {warning}", document.path.display());
        }

        let value = self
            .processing
            .shape_per_document(schema, &document.parsed.header)?;
        log::debug!("Shaped document #{} ({})", document.index, document.path.display());
        Ok(DocumentResult::Shaped { value, warnings })
    }
}
