// Submission Workflow State - progress of one submission through its definition

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::definition::{StageId, WorkflowDefinition};
use super::roles::ActingUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Approved,
    Declined,
}

/// Captured signature image, usually a `data:image/png;base64,...` URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn new(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no image data was captured. A data URL with an empty
    /// payload counts as blank.
    pub fn is_blank(&self) -> bool {
        let data = self.0.trim();
        if data.is_empty() {
            return true;
        }
        if let Some(rest) = data.strip_prefix("data:") {
            return match rest.split_once(',') {
                Some((_, payload)) => payload.trim().is_empty(),
                None => true,
            };
        }
        false
    }
}

/// One stage's assignee and, once decided, the recorded decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub uid: String,
    pub name: String,
    pub role: String,
    pub department: String,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl StageProgress {
    pub fn pending_for(assignee: &ActingUser) -> Self {
        Self {
            uid: assignee.uid.clone(),
            name: assignee.name.clone(),
            role: assignee.role.clone(),
            department: assignee.department.clone(),
            status: StageStatus::Pending,
            signature: None,
            comments: None,
            decided_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == StageStatus::Pending
    }
}

/// Where a submission currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentStage {
    Stage(StageId),
    Complete,
    Rejected,
}

/// Overall status shown as a badge. Serialized as its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverallStatus {
    /// No stage has been decided yet
    Pending(StageId),
    /// Last approved stage, with later stages still open
    Progressed(StageId),
    Approved,
    Rejected,
}

impl OverallStatus {
    /// Machine code, e.g. `pending_recommendation` or `recommended`
    pub fn code(&self) -> String {
        match self {
            OverallStatus::Pending(stage) => format!("pending_{}", stage.as_str()).replace(' ', "_"),
            OverallStatus::Progressed(stage) => stage.completed_label(),
            OverallStatus::Approved => "approved".to_string(),
            OverallStatus::Rejected => "rejected".to_string(),
        }
    }

    /// Badge text with underscores shown as spaces
    pub fn display_label(&self) -> String {
        self.code().replace('_', " ")
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OverallStatus::Approved | OverallStatus::Rejected)
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl Serialize for OverallStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

/// Pre-assigned reviewer per stage, produced by routing
pub type StageAssignments = BTreeMap<StageId, ActingUser>;

/// Per-submission progress keyed by stage.
///
/// Ordering always comes from the [`WorkflowDefinition`]; the map carries no
/// order of its own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionWorkflowState {
    stages: BTreeMap<StageId, StageProgress>,
}

impl SubmissionWorkflowState {
    /// Fresh state with every assigned stage pending. Assignments for stages
    /// outside the definition are ignored.
    pub fn initialize(definition: &WorkflowDefinition, assignments: &StageAssignments) -> Self {
        let stages = definition
            .stages()
            .filter_map(|stage| {
                assignments
                    .get(stage)
                    .map(|assignee| (stage.clone(), StageProgress::pending_for(assignee)))
            })
            .collect();
        Self { stages }
    }

    pub fn progress(&self, stage: &StageId) -> Option<&StageProgress> {
        self.stages.get(stage)
    }

    pub(crate) fn progress_mut(&mut self, stage: &StageId) -> Option<&mut StageProgress> {
        self.stages.get_mut(stage)
    }

    fn status_of(&self, stage: &StageId) -> StageStatus {
        self.stages
            .get(stage)
            .map_or(StageStatus::Pending, |progress| progress.status)
    }

    /// First pending stage in definition order. A stage with no recorded
    /// entry counts as pending.
    pub fn current_stage(&self, definition: &WorkflowDefinition) -> CurrentStage {
        if definition
            .stages()
            .any(|stage| self.status_of(stage) == StageStatus::Declined)
        {
            return CurrentStage::Rejected;
        }

        definition
            .stages()
            .find(|stage| self.status_of(stage) == StageStatus::Pending)
            .map_or(CurrentStage::Complete, |stage| CurrentStage::Stage(stage.clone()))
    }

    pub fn is_complete(&self, definition: &WorkflowDefinition) -> bool {
        definition
            .stages()
            .all(|stage| self.status_of(stage) == StageStatus::Approved)
    }

    pub fn is_rejected(&self, definition: &WorkflowDefinition) -> bool {
        self.current_stage(definition) == CurrentStage::Rejected
    }

    pub fn overall_status(&self, definition: &WorkflowDefinition) -> OverallStatus {
        match self.current_stage(definition) {
            CurrentStage::Rejected => OverallStatus::Rejected,
            CurrentStage::Complete => OverallStatus::Approved,
            CurrentStage::Stage(current) => {
                let last_approved = definition
                    .stages()
                    .take_while(|stage| **stage != current)
                    .last();
                match last_approved {
                    Some(stage) => OverallStatus::Progressed(stage.clone()),
                    None => OverallStatus::Pending(current),
                }
            }
        }
    }

    /// Resolved stages in definition order
    pub fn decisions<'a>(
        &'a self,
        definition: &'a WorkflowDefinition,
    ) -> Vec<(&'a StageId, &'a StageProgress)> {
        definition
            .stages()
            .filter_map(|stage| self.stages.get(stage).map(|progress| (stage, progress)))
            .filter(|(_, progress)| !progress.is_pending())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignments() -> StageAssignments {
        let mut map = StageAssignments::new();
        map.insert(
            StageId::Recommendation,
            ActingUser::new("hod-1", "Ama Mensah", "hod", "Legal Affairs"),
        );
        map.insert(
            StageId::Issuance,
            ActingUser::new("ict-1", "Kofi Boateng", "ict_officer", "Information Technology"),
        );
        map.insert(
            StageId::Approval,
            ActingUser::new("fin-1", "Efua Owusu", "hod", "Finance & Procurement"),
        );
        map
    }

    fn set_status(state: &mut SubmissionWorkflowState, stage: &StageId, status: StageStatus) {
        state.progress_mut(stage).unwrap().status = status;
    }

    #[test]
    fn test_fresh_state_is_pending_first_stage() {
        let definition = WorkflowDefinition::standard();
        let state = SubmissionWorkflowState::initialize(&definition, &assignments());

        assert_eq!(
            state.current_stage(&definition),
            CurrentStage::Stage(StageId::Recommendation)
        );
        assert_eq!(state.overall_status(&definition).code(), "pending_recommendation");
        assert_eq!(
            state.overall_status(&definition).display_label(),
            "pending recommendation"
        );
        assert!(!state.is_complete(&definition));
        assert!(state.decisions(&definition).is_empty());
    }

    #[test]
    fn test_progressed_status_names_last_approved_stage() {
        let definition = WorkflowDefinition::standard();
        let mut state = SubmissionWorkflowState::initialize(&definition, &assignments());

        set_status(&mut state, &StageId::Recommendation, StageStatus::Approved);
        assert_eq!(state.overall_status(&definition).code(), "recommended");

        set_status(&mut state, &StageId::Issuance, StageStatus::Approved);
        assert_eq!(state.overall_status(&definition).code(), "issued");
        assert_eq!(
            state.current_stage(&definition),
            CurrentStage::Stage(StageId::Approval)
        );
        assert_eq!(state.decisions(&definition).len(), 2);
    }

    #[test]
    fn test_decline_is_terminal() {
        let definition = WorkflowDefinition::standard();
        let mut state = SubmissionWorkflowState::initialize(&definition, &assignments());

        set_status(&mut state, &StageId::Recommendation, StageStatus::Declined);
        assert_eq!(state.current_stage(&definition), CurrentStage::Rejected);
        assert_eq!(state.overall_status(&definition), OverallStatus::Rejected);
        assert!(state.overall_status(&definition).is_terminal());
    }

    #[test]
    fn test_missing_entry_counts_as_pending() {
        let definition = WorkflowDefinition::standard();
        let mut partial = assignments();
        partial.remove(&StageId::Issuance);
        let mut state = SubmissionWorkflowState::initialize(&definition, &partial);
        set_status(&mut state, &StageId::Recommendation, StageStatus::Approved);
        set_status(&mut state, &StageId::Approval, StageStatus::Approved);

        assert_eq!(
            state.current_stage(&definition),
            CurrentStage::Stage(StageId::Issuance)
        );
        assert!(!state.is_complete(&definition));
    }

    #[test]
    fn test_signature_blank_detection() {
        assert!(Signature::new("").is_blank());
        assert!(Signature::new("   ").is_blank());
        assert!(Signature::new("data:image/png;base64,").is_blank());
        assert!(Signature::new("data:image/png;base64").is_blank());
        assert!(!Signature::new("data:image/png;base64,iVBORw0KGgo=").is_blank());
        assert!(!Signature::new("sig1").is_blank());
    }

    #[test]
    fn test_state_serializes_as_stage_keyed_map() {
        let definition = WorkflowDefinition::standard();
        let state = SubmissionWorkflowState::initialize(&definition, &assignments());

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["recommendation"]["uid"], "hod-1");
        assert_eq!(json["issuance"]["status"], "pending");
        assert!(json["approval"].get("signature").is_none());

        let back: SubmissionWorkflowState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
