use crate::error::{FrontschemaError, Result};
use serde::Serialize;
use std::fmt;

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Initializing,
    LoadingSchema,
    LoadingTemplate,
    ProcessingDocuments { current: usize, total: usize },
    Aggregating,
    GeneratingOutput,
    Completed,
    Failed(String),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed(_))
    }

    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Completed | Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Idle, Initializing)
            | (Initializing, LoadingSchema)
            | (LoadingSchema, LoadingTemplate)
            | (ProcessingDocuments { .. }, Aggregating)
            | (Aggregating, GeneratingOutput)
            | (GeneratingOutput, Completed) => true,
            (LoadingTemplate, ProcessingDocuments { current, total }) => {
                *current == 0 && *total > 0
            }
            (
                ProcessingDocuments { current, total },
                ProcessingDocuments {
                    current: next_current,
                    total: next_total,
                },
            ) => total == next_total && next_current > current && next_current <= next_total,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Initializing => write!(f, "initializing"),
            PipelineState::LoadingSchema => write!(f, "loading-schema"),
            PipelineState::LoadingTemplate => write!(f, "loading-template"),
            PipelineState::ProcessingDocuments { current, total } => {
                write!(f, "processing-documents({current}/{total})")
            }
            PipelineState::Aggregating => write!(f, "aggregating"),
            PipelineState::GeneratingOutput => write!(f, "generating-output"),
            PipelineState::Completed => write!(f, "completed"),
            PipelineState::Failed(reason) => write!(f, "failed({reason})"),
        }
    }
}

/// Current state plus every state visited, in order.
#[derive(Debug, Clone)]
pub struct StateMachine {
    history: Vec<PipelineState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        StateMachine::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        StateMachine {
            history: vec![PipelineState::Idle],
        }
    }

    pub fn current(&self) -> &PipelineState {
        // history is never empty
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Move to `next`. An illegal move forces `Failed` and reports the attempt.
    pub fn transition(&mut self, next: PipelineState) -> Result<()> {
        if !self.current().can_transition_to(&next) {
            let message = format!("illegal transition {} -> {next}", self.current());
            if !self.current().is_terminal() {
                self.history.push(PipelineState::Failed(message.clone()));
            }
            return Err(FrontschemaError::processing("state transition", message));
        }
        log::debug!("Pipeline state: {} -> {next}", self.current());
        self.history.push(next);
        Ok(())
    }

    /// Enter `Failed` unless the run already ended.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.current().is_terminal() {
            let reason = reason.into();
            log::debug!("Pipeline state: {} -> failed({reason})", self.current());
            self.history.push(PipelineState::Failed(reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState::*;

    #[test]
    fn test_happy_path() {
        let mut machine = StateMachine::new();
        for next in [
            Initializing,
            LoadingSchema,
            LoadingTemplate,
            ProcessingDocuments { current: 0, total: 2 },
            ProcessingDocuments { current: 1, total: 2 },
            ProcessingDocuments { current: 2, total: 2 },
            Aggregating,
            GeneratingOutput,
            Completed,
        ] {
            machine.transition(next).unwrap();
        }
        assert_eq!(machine.current(), &Completed);
        assert_eq!(machine.history().len(), 10);
        assert_eq!(machine.history()[0], Idle);
    }

    #[test]
    fn test_illegal_transition_forces_failed() {
        let mut machine = StateMachine::new();
        machine.transition(Initializing).unwrap();
        let err = machine.transition(Aggregating).unwrap_err();
        assert!(matches!(err, FrontschemaError::ProcessingFailed { .. }));
        assert!(matches!(
            machine.current(),
            Failed(reason) if reason.contains("initializing -> aggregating")
        ));
    }

    #[test]
    fn test_document_counter_only_advances() {
        let processing = ProcessingDocuments { current: 2, total: 3 };
        assert!(!processing.can_transition_to(&ProcessingDocuments { current: 1, total: 3 }));
        assert!(!processing.can_transition_to(&ProcessingDocuments { current: 2, total: 3 }));
        assert!(!processing.can_transition_to(&ProcessingDocuments { current: 4, total: 3 }));
        assert!(!processing.can_transition_to(&ProcessingDocuments { current: 3, total: 4 }));
        assert!(processing.can_transition_to(&ProcessingDocuments { current: 3, total: 3 }));
    }

    #[test]
    fn test_failed_reachable_from_any_live_state() {
        for state in [Idle, Initializing, LoadingTemplate, Aggregating, GeneratingOutput] {
            assert!(state.can_transition_to(&Failed("x".into())), "{state}");
        }
        assert!(!Completed.can_transition_to(&Failed("x".into())));
        assert!(!Failed("a".into()).can_transition_to(&Idle));
    }

    #[test]
    fn test_fail_is_sticky() {
        let mut machine = StateMachine::new();
        machine.fail("cancelled");
        machine.fail("later");
        assert_eq!(machine.current(), &Failed("cancelled".into()));
        assert!(machine.transition(Initializing).is_err());
        assert_eq!(machine.history().len(), 2);
    }
}
