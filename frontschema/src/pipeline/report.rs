use crate::io::DataFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Per-document result of the shaping stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DocumentStatus {
    Success,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub output: PathBuf,
    pub format: DataFormat,
    #[serde(skip)]
    pub rendered: String,
    /// False for dry runs.
    pub written: bool,
    pub outcomes: Vec<DocumentOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Success))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&DocumentStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    /// Counts and the documents that need attention.
    pub fn summary(&self) -> serde_json::Value {
        let issues: Vec<&DocumentOutcome> = self
            .outcomes
            .iter()
            .filter(|o| o.status != DocumentStatus::Success || !o.warnings.is_empty())
            .collect();

        serde_json::json!({
            "output": self.output,
            "format": self.format,
            "written": self.written,
            "total": self.outcomes.len(),
            "succeeded": self.succeeded(),
            "skipped": self.skipped(),
            "failed": self.failed(),
            "issues": issues,
            "duration_ms": (self.finished_at - self.started_at).num_milliseconds(),
        })
    }
}
