// Approval Flow Library - multi-stage approval workflows for form submissions
// This exposes the core components for testing and integration

pub mod config;
pub mod routing;
pub mod service;
pub mod store;
pub mod submission;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use config::{config, init_config, ApprovalFlowConfig};
pub use routing::{assign_reviewers, RoutingError};
pub use service::{ApprovalService, ServiceError, SubmissionFilter, SubmissionStatus};
pub use store::{
    FileSystemSubmissionStore, InMemorySubmissionStore, StoreError, SubmissionStore,
};
pub use submission::{form_display_name, Submission, Submitter};
pub use telemetry::{create_decision_span, generate_correlation_id, init_telemetry};
pub use workflows::{
    actionable_stage, apply_decision, can_act, current_reviewer, ActingUser, CurrentStage,
    Decision, Outcome, OverallStatus, RoleCriterion, RolePolicy, RuleBasedPolicy, Signature,
    StageId, StageProgress, StageStatus, SubmissionWorkflowState, WorkflowDefinition,
    WorkflowError,
};
