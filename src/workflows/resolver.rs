// Eligibility Resolver - who may act on a submission right now

use super::definition::{StageId, WorkflowDefinition};
use super::errors::WorkflowError;
use super::roles::ActingUser;
use super::state::{CurrentStage, StageProgress, SubmissionWorkflowState};

/// True only for the pre-assigned reviewer of the current, still pending stage.
/// A missing assignee means nobody may act.
pub fn can_act(
    state: &SubmissionWorkflowState,
    definition: &WorkflowDefinition,
    acting_user: &ActingUser,
) -> bool {
    actionable_stage(state, definition, acting_user).is_some()
}

/// The stage `acting_user` may decide, if any
pub fn actionable_stage(
    state: &SubmissionWorkflowState,
    definition: &WorkflowDefinition,
    acting_user: &ActingUser,
) -> Option<StageId> {
    let CurrentStage::Stage(stage) = state.current_stage(definition) else {
        return None;
    };

    match state.progress(&stage) {
        Some(entry) if entry.uid == acting_user.uid && entry.is_pending() => Some(stage),
        Some(_) => None,
        None => {
            tracing::warn!(stage = %stage, "Current stage has no assigned reviewer");
            None
        }
    }
}

/// Assignee of the current stage, or `None` once the workflow is terminal
pub fn current_reviewer<'a>(
    state: &'a SubmissionWorkflowState,
    definition: &WorkflowDefinition,
) -> Result<Option<&'a StageProgress>, WorkflowError> {
    match state.current_stage(definition) {
        CurrentStage::Stage(stage) => state
            .progress(&stage)
            .map(Some)
            .ok_or(WorkflowError::UnassignedStage { stage }),
        CurrentStage::Complete | CurrentStage::Rejected => Ok(None),
    }
}
