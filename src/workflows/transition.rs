// Decision Transition - applies one approve/decline to the current stage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::definition::{StageId, WorkflowDefinition};
use super::errors::WorkflowError;
use super::state::{CurrentStage, Signature, StageStatus, SubmissionWorkflowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Approve,
    Decline,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Approve => f.write_str("approve"),
            Outcome::Decline => f.write_str("decline"),
        }
    }
}

/// A signed decision from a reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub by: String,
    pub name: String,
    pub signature: Signature,
    #[serde(default)]
    pub comments: Option<String>,
}

impl Decision {
    pub fn new(by: impl Into<String>, name: impl Into<String>, signature: Signature) -> Self {
        Self {
            by: by.into(),
            name: name.into(),
            signature,
            comments: None,
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

/// Apply `decision` to `stage`, stamped with the current time
pub fn apply_decision(
    state: &SubmissionWorkflowState,
    definition: &WorkflowDefinition,
    stage: &StageId,
    decision: &Decision,
    outcome: Outcome,
) -> Result<SubmissionWorkflowState, WorkflowError> {
    apply_decision_at(state, definition, stage, decision, outcome, Utc::now())
}

/// Apply `decision` to `stage` and return the resulting state. The input
/// state is never modified, so a failed call leaves it exactly as it was.
pub fn apply_decision_at(
    state: &SubmissionWorkflowState,
    definition: &WorkflowDefinition,
    stage: &StageId,
    decision: &Decision,
    outcome: Outcome,
    decided_at: DateTime<Utc>,
) -> Result<SubmissionWorkflowState, WorkflowError> {
    if let Err(e) = check_preconditions(state, definition, stage, decision) {
        tracing::warn!(
            stage = %stage,
            by = %decision.by,
            outcome = %outcome,
            error = %e,
            "Rejected workflow decision"
        );
        return Err(e);
    }

    let mut next = state.clone();
    let entry = next
        .progress_mut(stage)
        .ok_or_else(|| WorkflowError::UnassignedStage {
            stage: stage.clone(),
        })?;

    entry.status = match outcome {
        Outcome::Approve => StageStatus::Approved,
        Outcome::Decline => StageStatus::Declined,
    };
    if !decision.name.trim().is_empty() {
        entry.name = decision.name.trim().to_string();
    }
    entry.signature = Some(decision.signature.clone());
    entry.comments = decision
        .comments
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    entry.decided_at = Some(decided_at);

    tracing::info!(
        stage = %stage,
        by = %decision.by,
        outcome = %outcome,
        status = %next.overall_status(definition),
        "Workflow decision recorded"
    );

    Ok(next)
}

fn check_preconditions(
    state: &SubmissionWorkflowState,
    definition: &WorkflowDefinition,
    stage: &StageId,
    decision: &Decision,
) -> Result<(), WorkflowError> {
    if definition.position_of(stage).is_none() {
        return Err(WorkflowError::invalid(stage, "stage is not part of this workflow"));
    }

    match state.current_stage(definition) {
        CurrentStage::Rejected => {
            return Err(WorkflowError::invalid(stage, "workflow has already been rejected"));
        }
        CurrentStage::Complete => {
            return Err(WorkflowError::invalid(stage, "workflow is already complete"));
        }
        CurrentStage::Stage(current) if &current != stage => {
            return Err(WorkflowError::invalid(
                stage,
                format!("stage is not current (awaiting '{current}')"),
            ));
        }
        CurrentStage::Stage(_) => {}
    }

    if decision.signature.is_blank() {
        return Err(WorkflowError::invalid(stage, "a signature is required"));
    }

    let entry = state
        .progress(stage)
        .ok_or_else(|| WorkflowError::UnassignedStage {
            stage: stage.clone(),
        })?;

    if entry.uid != decision.by {
        return Err(WorkflowError::invalid(
            stage,
            "stage is assigned to a different reviewer",
        ));
    }

    Ok(())
}
