// Persistence collaborators for submissions
// Every workflow write is a compare-and-swap against the state the caller read

pub mod filesystem;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::submission::Submission;
use crate::workflows::SubmissionWorkflowState;

pub use filesystem::FileSystemSubmissionStore;
pub use memory::InMemorySubmissionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Submission {0} not found")]
    NotFound(String),

    #[error("Submission {0} already exists")]
    AlreadyExists(String),

    #[error("Submission {0} changed since it was read")]
    Conflict(String),
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn load_submission(&self, id: &str) -> Result<Submission, StoreError>;

    async fn insert_submission(&self, submission: &Submission) -> Result<(), StoreError>;

    /// Replace the workflow of `id` with `new_state` only if the stored
    /// workflow still equals `expected`. Fails with [`StoreError::Conflict`]
    /// otherwise, leaving the stored record untouched.
    async fn save_workflow_state(
        &self,
        id: &str,
        expected: &SubmissionWorkflowState,
        new_state: &SubmissionWorkflowState,
        new_status: &str,
    ) -> Result<(), StoreError>;

    async fn list_submissions(&self) -> Result<Vec<Submission>, StoreError>;
}

/// Shared compare-and-swap step used by both stores
fn swap_workflow(
    submission: &mut Submission,
    expected: &SubmissionWorkflowState,
    new_state: &SubmissionWorkflowState,
    new_status: &str,
) -> Result<(), StoreError> {
    if &submission.workflow != expected {
        tracing::warn!(submission_id = %submission.id, "Workflow compare-and-swap failed");
        return Err(StoreError::Conflict(submission.id.clone()));
    }
    submission.workflow = new_state.clone();
    submission.status = new_status.to_string();
    Ok(())
}
