use thiserror::Error;

use super::definition::StageId;

/// Errors raised by the workflow core. None of them are fatal; callers re-fetch
/// and re-render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("Invalid transition on stage '{stage}': {reason}")]
    InvalidTransition { stage: StageId, reason: String },

    #[error("No reviewer assigned to stage '{stage}'")]
    UnassignedStage { stage: StageId },

    #[error("Submission {submission_id} was modified concurrently")]
    ConcurrentModification { submission_id: String },
}

impl WorkflowError {
    pub(crate) fn invalid(stage: &StageId, reason: impl Into<String>) -> Self {
        WorkflowError::InvalidTransition {
            stage: stage.clone(),
            reason: reason.into(),
        }
    }

    /// Message suitable for showing to the person who attempted the action
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::InvalidTransition { .. } => {
                "This request is no longer awaiting your action.".to_string()
            }
            WorkflowError::UnassignedStage { stage } => {
                format!("No reviewer assigned for the {} stage.", stage.display_name())
            }
            WorkflowError::ConcurrentModification { .. } => {
                "Someone else acted on this request first. Reload and try again.".to_string()
            }
        }
    }
}

/// Errors raised while building a workflow definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Workflow must contain at least one stage")]
    Empty,

    #[error("Stage '{0}' appears more than once")]
    DuplicateStage(StageId),
}
