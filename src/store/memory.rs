use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{swap_workflow, StoreError, SubmissionStore};
use crate::submission::Submission;
use crate::workflows::SubmissionWorkflowState;

/// Process-local store, used by tests and the `memory` store kind
#[derive(Debug, Default)]
pub struct InMemorySubmissionStore {
    submissions: RwLock<HashMap<String, Submission>>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn load_submission(&self, id: &str) -> Result<Submission, StoreError> {
        self.submissions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        let mut submissions = self.submissions.write().await;
        if submissions.contains_key(&submission.id) {
            return Err(StoreError::AlreadyExists(submission.id.clone()));
        }
        submissions.insert(submission.id.clone(), submission.clone());
        Ok(())
    }

    async fn save_workflow_state(
        &self,
        id: &str,
        expected: &SubmissionWorkflowState,
        new_state: &SubmissionWorkflowState,
        new_status: &str,
    ) -> Result<(), StoreError> {
        let mut submissions = self.submissions.write().await;
        let submission = submissions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        swap_workflow(submission, expected, new_state, new_status)
    }

    async fn list_submissions(&self) -> Result<Vec<Submission>, StoreError> {
        let mut all: Vec<Submission> = self.submissions.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(all)
    }
}
