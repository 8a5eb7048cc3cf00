use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{swap_workflow, StoreError, SubmissionStore};
use crate::submission::Submission;
use crate::workflows::SubmissionWorkflowState;

/// One pretty-printed JSON file per submission under `directory`.
///
/// Writes hold an async mutex across read-compare-write, so compare-and-swap
/// is atomic within one process.
#[derive(Debug)]
pub struct FileSystemSubmissionStore {
    directory: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSystemSubmissionStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn submission_path(&self, id: &str) -> PathBuf {
        self.directory.join(format!("{id}.submission.json"))
    }

    async fn read(&self, id: &str) -> Result<Submission, StoreError> {
        let path = self.submission_path(id);
        if !fs::try_exists(&path).await? {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let contents = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn write(&self, submission: &Submission) -> Result<(), StoreError> {
        fs::create_dir_all(&self.directory).await?;
        let path = self.submission_path(&submission.id);
        let serialized = serde_json::to_string_pretty(submission)?;

        // Write to a temporary file, then rename over the original
        let temp_file = path.with_extension("json.tmp");
        fs::write(&temp_file, serialized).await?;
        fs::rename(&temp_file, &path).await?;

        debug!(submission_id = %submission.id, file = ?path, "Submission written");
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for FileSystemSubmissionStore {
    async fn load_submission(&self, id: &str) -> Result<Submission, StoreError> {
        self.read(id).await
    }

    async fn insert_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        if fs::try_exists(self.submission_path(&submission.id)).await? {
            return Err(StoreError::AlreadyExists(submission.id.clone()));
        }
        self.write(submission).await?;
        info!(submission_id = %submission.id, form = %submission.form_slug, "Submission stored");
        Ok(())
    }

    async fn save_workflow_state(
        &self,
        id: &str,
        expected: &SubmissionWorkflowState,
        new_state: &SubmissionWorkflowState,
        new_status: &str,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut submission = self.read(id).await?;
        swap_workflow(&mut submission, expected, new_state, new_status)?;
        self.write(&submission).await
    }

    async fn list_submissions(&self) -> Result<Vec<Submission>, StoreError> {
        if !fs::try_exists(&self.directory).await? {
            return Ok(Vec::new());
        }

        let mut submissions = Vec::new();
        let mut entries = fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_submission = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".submission.json"));
            if !is_submission {
                continue;
            }
            let contents = fs::read_to_string(&path).await?;
            submissions.push(serde_json::from_str::<Submission>(&contents)?);
        }

        submissions.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(submissions)
    }
}
