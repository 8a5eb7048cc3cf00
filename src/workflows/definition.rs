// Workflow Definition - the ordered approval pipeline for a form type

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::errors::DefinitionError;
use super::roles::RoleCriterion;

/// Named step in an approval pipeline.
///
/// Serialized as its snake_case name so it can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StageId {
    Recommendation,
    Issuance,
    Approval,
    Review,
    Verification,
    Authorization,
    Custom(String),
}

impl StageId {
    pub fn as_str(&self) -> &str {
        match self {
            StageId::Recommendation => "recommendation",
            StageId::Issuance => "issuance",
            StageId::Approval => "approval",
            StageId::Review => "review",
            StageId::Verification => "verification",
            StageId::Authorization => "authorization",
            StageId::Custom(name) => name,
        }
    }

    /// Status label once this stage has been approved, e.g. `recommended`
    pub fn completed_label(&self) -> String {
        let label = match self {
            StageId::Recommendation => "recommended".to_string(),
            StageId::Issuance => "issued".to_string(),
            StageId::Approval => "approved".to_string(),
            StageId::Review => "reviewed".to_string(),
            StageId::Verification => "verified".to_string(),
            StageId::Authorization => "authorized".to_string(),
            StageId::Custom(name) => format!("{} completed", name.trim()),
        };
        label.replace(' ', "_")
    }

    pub fn display_name(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl From<String> for StageId {
    fn from(value: String) -> Self {
        match value.as_str() {
            "recommendation" => StageId::Recommendation,
            "issuance" => StageId::Issuance,
            "approval" => StageId::Approval,
            "review" => StageId::Review,
            "verification" => StageId::Verification,
            "authorization" => StageId::Authorization,
            _ => StageId::Custom(value),
        }
    }
}

impl From<&str> for StageId {
    fn from(value: &str) -> Self {
        StageId::from(value.to_string())
    }
}

impl From<StageId> for String {
    fn from(value: StageId) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStep {
    pub stage: StageId,
    pub role_criteria: RoleCriterion,
    #[serde(default)]
    pub description: String,
}

impl StageStep {
    pub fn new(stage: StageId, role_criteria: RoleCriterion, description: impl Into<String>) -> Self {
        Self {
            stage,
            role_criteria,
            description: description.into(),
        }
    }
}

/// Ordered list of stages a submission must pass through.
///
/// Read-only once built: stages can be neither reordered nor skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDefinition")]
pub struct WorkflowDefinition {
    steps: Vec<StageStep>,
}

#[derive(Deserialize)]
struct RawDefinition {
    steps: Vec<StageStep>,
}

impl TryFrom<RawDefinition> for WorkflowDefinition {
    type Error = DefinitionError;

    fn try_from(raw: RawDefinition) -> Result<Self, Self::Error> {
        WorkflowDefinition::new(raw.steps)
    }
}

impl WorkflowDefinition {
    pub fn new(steps: Vec<StageStep>) -> Result<Self, DefinitionError> {
        if steps.is_empty() {
            return Err(DefinitionError::Empty);
        }

        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(&step.stage) {
                return Err(DefinitionError::DuplicateStage(step.stage.clone()));
            }
        }

        Ok(Self { steps })
    }

    /// The recommendation → issuance → approval pipeline most forms use
    pub fn standard() -> Self {
        Self {
            steps: vec![
                StageStep::new(
                    StageId::Recommendation,
                    RoleCriterion::HodOrAssistant,
                    "Head of department recommends the request",
                ),
                StageStep::new(
                    StageId::Issuance,
                    RoleCriterion::IctOfficer,
                    "ICT officer confirms the request can be issued",
                ),
                StageStep::new(
                    StageId::Approval,
                    RoleCriterion::HeadOfFinance,
                    "Head of finance gives final approval",
                ),
            ],
        }
    }

    pub fn steps(&self) -> &[StageStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn stage_at(&self, index: usize) -> Option<&StageStep> {
        self.steps.get(index)
    }

    /// True when `index` is one past the last stage
    pub fn is_terminal_index(&self, index: usize) -> bool {
        index == self.steps.len()
    }

    pub fn position_of(&self, stage: &StageId) -> Option<usize> {
        self.steps.iter().position(|step| &step.stage == stage)
    }

    pub fn first_stage(&self) -> &StageId {
        // Construction guarantees at least one step
        &self.steps[0].stage
    }

    pub fn stages(&self) -> impl Iterator<Item = &StageId> {
        self.steps.iter().map(|step| &step.stage)
    }
}
