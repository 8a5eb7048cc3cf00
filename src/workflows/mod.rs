// Approval workflow core
// Pure state transitions over in-memory records; persistence lives in `store`

pub mod definition;
pub mod errors;
pub mod resolver;
pub mod roles;
pub mod state;
pub mod transition;

pub use definition::{StageId, StageStep, WorkflowDefinition};
pub use errors::{DefinitionError, WorkflowError};
pub use resolver::{actionable_stage, can_act, current_reviewer};
pub use roles::{ActingUser, DepartmentScope, RoleCriterion, RolePolicy, RoleRule, RuleBasedPolicy};
pub use state::{
    CurrentStage, OverallStatus, Signature, StageAssignments, StageProgress, StageStatus,
    SubmissionWorkflowState,
};
pub use transition::{apply_decision, apply_decision_at, Decision, Outcome};
