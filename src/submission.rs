use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::{OverallStatus, SubmissionWorkflowState, WorkflowDefinition};

/// Who raised a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    pub uid: String,
    pub department: String,
    pub role: String,
}

/// A filed form together with its approval progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub form_slug: String,
    pub submitted_by: Submitter,
    pub submitted_at: DateTime<Utc>,
    /// Status code derived from `workflow`; see [`Submission::refresh_status`]
    pub status: String,
    pub workflow: SubmissionWorkflowState,
}

impl Submission {
    pub fn new(
        form_slug: impl Into<String>,
        submitted_by: Submitter,
        workflow: SubmissionWorkflowState,
        definition: &WorkflowDefinition,
    ) -> Self {
        let status = workflow.overall_status(definition).code();
        Self {
            id: Uuid::new_v4().to_string(),
            form_slug: form_slug.into(),
            submitted_by,
            submitted_at: Utc::now(),
            status,
            workflow,
        }
    }

    pub fn overall_status(&self, definition: &WorkflowDefinition) -> OverallStatus {
        self.workflow.overall_status(definition)
    }

    /// Recompute the stored status code from the workflow state
    pub fn refresh_status(&mut self, definition: &WorkflowDefinition) {
        self.status = self.workflow.overall_status(definition).code();
    }
}

/// Title-cased form name for display, e.g. `leave_request` → `Leave Request`
pub fn form_display_name(form_slug: &str) -> String {
    form_slug
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::StageAssignments;

    #[test]
    fn test_form_display_name() {
        assert_eq!(form_display_name("leave_request"), "Leave Request");
        assert_eq!(form_display_name("ict_equipment__loan"), "Ict Equipment Loan");
        assert_eq!(form_display_name(""), "");
    }

    #[test]
    fn test_new_submission_status_and_wire_shape() {
        let definition = WorkflowDefinition::standard();
        let workflow = SubmissionWorkflowState::initialize(&definition, &StageAssignments::new());
        let submission = Submission::new(
            "leave_request",
            Submitter {
                uid: "u-9".to_string(),
                department: "Drivers".to_string(),
                role: "user".to_string(),
            },
            workflow,
            &definition,
        );

        assert_eq!(submission.status, "pending_recommendation");

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["formSlug"], "leave_request");
        assert_eq!(json["submittedBy"]["department"], "Drivers");
    }
}
