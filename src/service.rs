// Approval service - loads, decides, and persists submissions through a store

use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, Instrument};

use crate::routing::{assign_reviewers, RoutingError};
use crate::store::{StoreError, SubmissionStore};
use crate::submission::{Submission, Submitter};
use crate::telemetry::{create_decision_span, generate_correlation_id};
use crate::workflows::{
    actionable_stage, apply_decision, current_reviewer, ActingUser, Decision, Outcome,
    OverallStatus, RolePolicy, StageId, StageProgress, SubmissionWorkflowState,
    WorkflowDefinition, WorkflowError,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("No workflow configured for form '{0}'")]
    UnknownForm(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(submission_id) => {
                ServiceError::Workflow(WorkflowError::ConcurrentModification { submission_id })
            }
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Workflow(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Narrows a submission list, matching the approvals screen's search box and
/// status dropdown
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    /// Case-insensitive match on form slug, submitter department, or id
    pub search: Option<String>,
    /// Exact status code, e.g. `pending_recommendation`
    pub status: Option<String>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                submission.form_slug.to_lowercase().contains(&term)
                    || submission
                        .submitted_by
                        .department
                        .to_lowercase()
                        .contains(&term)
                    || submission.id.to_lowercase().contains(&term)
            }
        };

        let status_ok = match self.status.as_deref() {
            None | Some("all") => true,
            Some(status) => submission.status.eq_ignore_ascii_case(status),
        };

        search_ok && status_ok
    }
}

/// Status snapshot for rendering one submission
#[derive(Debug, Clone)]
pub struct SubmissionStatus {
    pub submission: Submission,
    pub overall: OverallStatus,
    pub current_reviewer: Option<StageProgress>,
    pub decisions: Vec<(StageId, StageProgress)>,
}

pub struct ApprovalService<S> {
    store: S,
    forms: HashMap<String, WorkflowDefinition>,
    policy: Box<dyn RolePolicy>,
}

impl<S: SubmissionStore> ApprovalService<S> {
    pub fn new(
        store: S,
        forms: HashMap<String, WorkflowDefinition>,
        policy: Box<dyn RolePolicy>,
    ) -> Self {
        Self {
            store,
            forms,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn forms(&self) -> &HashMap<String, WorkflowDefinition> {
        &self.forms
    }

    pub fn definition(&self, form_slug: &str) -> Result<&WorkflowDefinition, ServiceError> {
        self.forms
            .get(form_slug)
            .ok_or_else(|| ServiceError::UnknownForm(form_slug.to_string()))
    }

    /// File a new submission with every stage pending and pre-assigned
    pub async fn submit(
        &self,
        form_slug: &str,
        submitter: Submitter,
        directory: &[ActingUser],
    ) -> Result<Submission, ServiceError> {
        let definition = self.definition(form_slug)?;
        let assignments = assign_reviewers(definition, &submitter, directory, self.policy.as_ref())?;
        let workflow = SubmissionWorkflowState::initialize(definition, &assignments);
        let submission = Submission::new(form_slug, submitter, workflow, definition);

        self.store.insert_submission(&submission).await?;
        info!(
            submission_id = %submission.id,
            form = %form_slug,
            submitted_by = %submission.submitted_by.uid,
            "Submission created"
        );
        Ok(submission)
    }

    /// Record `acting_user`'s decision on `stage` and persist it with
    /// compare-and-swap against the state that was read
    pub async fn decide(
        &self,
        submission_id: &str,
        acting_user: &ActingUser,
        stage: &StageId,
        decision: Decision,
        outcome: Outcome,
    ) -> Result<Submission, ServiceError> {
        let correlation_id = generate_correlation_id();
        let span = create_decision_span(
            "decide",
            submission_id,
            Some(stage.as_str()),
            Some(&acting_user.uid),
            &correlation_id,
        );

        self.record_decision(submission_id, acting_user, stage, decision, outcome)
            .instrument(span)
            .await
    }

    async fn record_decision(
        &self,
        submission_id: &str,
        acting_user: &ActingUser,
        stage: &StageId,
        decision: Decision,
        outcome: Outcome,
    ) -> Result<Submission, ServiceError> {
        let mut submission = self.store.load_submission(submission_id).await?;
        let definition = self.definition(&submission.form_slug)?;

        if decision.by != acting_user.uid {
            return Err(WorkflowError::InvalidTransition {
                stage: stage.clone(),
                reason: "decision must be signed by the acting user".to_string(),
            }
            .into());
        }

        let prior = submission.workflow.clone();
        let next = apply_decision(&prior, definition, stage, &decision, outcome)?;
        let status = next.overall_status(definition).code();

        self.store
            .save_workflow_state(submission_id, &prior, &next, &status)
            .await?;

        submission.workflow = next;
        submission.status = status;
        info!(status = %submission.status, "Decision persisted");
        Ok(submission)
    }

    /// Submissions `acting_user` may act on now, in filing order
    pub async fn pending_for(
        &self,
        acting_user: &ActingUser,
        filter: &SubmissionFilter,
    ) -> Result<Vec<(Submission, StageId)>, ServiceError> {
        let mut actionable = Vec::new();
        for submission in self.store.list_submissions().await? {
            let Some(definition) = self.forms.get(&submission.form_slug) else {
                tracing::warn!(
                    submission_id = %submission.id,
                    form = %submission.form_slug,
                    "Skipping submission for unconfigured form"
                );
                continue;
            };
            if !filter.matches(&submission) {
                continue;
            }
            if let Some(stage) = actionable_stage(&submission.workflow, definition, acting_user) {
                actionable.push((submission, stage));
            }
        }
        Ok(actionable)
    }

    pub async fn status_of(&self, submission_id: &str) -> Result<SubmissionStatus, ServiceError> {
        let submission = self.store.load_submission(submission_id).await?;
        let definition = self.definition(&submission.form_slug)?;

        let overall = submission.overall_status(definition);
        let reviewer = current_reviewer(&submission.workflow, definition)?.cloned();
        let decisions = submission
            .workflow
            .decisions(definition)
            .into_iter()
            .map(|(stage, progress)| (stage.clone(), progress.clone()))
            .collect();

        Ok(SubmissionStatus {
            submission,
            overall,
            current_reviewer: reviewer,
            decisions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(form_slug: &str, department: &str, status: &str) -> Submission {
        let definition = WorkflowDefinition::standard();
        let mut submission = Submission::new(
            form_slug,
            Submitter {
                uid: "u".to_string(),
                department: department.to_string(),
                role: "user".to_string(),
            },
            SubmissionWorkflowState::default(),
            &definition,
        );
        submission.status = status.to_string();
        submission
    }

    #[test]
    fn test_filter_search_and_status() {
        let leave = submission("leave_request", "Legal Affairs", "pending_recommendation");

        assert!(SubmissionFilter::default().matches(&leave));
        assert!(SubmissionFilter {
            search: Some("LEAVE".to_string()),
            status: None
        }
        .matches(&leave));
        assert!(SubmissionFilter {
            search: Some("legal".to_string()),
            status: Some("all".to_string())
        }
        .matches(&leave));
        assert!(!SubmissionFilter {
            search: Some("finance".to_string()),
            status: None
        }
        .matches(&leave));
        assert!(!SubmissionFilter {
            search: None,
            status: Some("recommended".to_string())
        }
        .matches(&leave));
    }

    #[test]
    fn test_store_conflict_maps_to_concurrent_modification() {
        let err = ServiceError::from(StoreError::Conflict("abc".to_string()));
        assert!(matches!(
            err,
            ServiceError::Workflow(WorkflowError::ConcurrentModification { ref submission_id })
                if submission_id == "abc"
        ));
        assert_eq!(
            err.user_message(),
            "Someone else acted on this request first. Reload and try again."
        );
    }
}
