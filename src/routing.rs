// Reviewer routing - pre-assigns one reviewer per stage when a submission is filed

use thiserror::Error;

use crate::submission::Submitter;
use crate::workflows::{ActingUser, RolePolicy, StageAssignments, StageId, WorkflowDefinition};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("No eligible reviewer for stage(s): {}", format_stages(.unfilled))]
    NoEligibleReviewer { unfilled: Vec<StageId> },
}

fn format_stages(stages: &[StageId]) -> String {
    stages
        .iter()
        .map(StageId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pick the first directory user satisfying each stage's role criterion.
///
/// Fails listing every stage that could not be filled, so one bad rule does
/// not hide another.
pub fn assign_reviewers(
    definition: &WorkflowDefinition,
    submitter: &Submitter,
    directory: &[ActingUser],
    policy: &dyn RolePolicy,
) -> Result<StageAssignments, RoutingError> {
    let mut assignments = StageAssignments::new();
    let mut unfilled = Vec::new();

    for step in definition.steps() {
        let candidate = directory
            .iter()
            .find(|user| policy.satisfies(&step.role_criteria, user, &submitter.department));

        match candidate {
            Some(user) => {
                tracing::debug!(
                    stage = %step.stage,
                    criterion = %step.role_criteria,
                    reviewer = %user.uid,
                    "Routed stage to reviewer"
                );
                assignments.insert(step.stage.clone(), user.clone());
            }
            None => unfilled.push(step.stage.clone()),
        }
    }

    if unfilled.is_empty() {
        Ok(assignments)
    } else {
        tracing::warn!(unfilled = ?unfilled, "Could not route every stage");
        Err(RoutingError::NoEligibleReviewer { unfilled })
    }
}
