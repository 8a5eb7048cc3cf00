// Role criteria and the pluggable policy that resolves them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of the person acting on a submission, taken from the caller's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    pub role: String,
    pub department: String,
}

impl ActingUser {
    pub fn new(
        uid: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            role: role.into(),
            department: department.into(),
        }
    }
}

/// Rule naming which users qualify to act on a stage
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleCriterion {
    HodOrAssistant,
    IctOfficer,
    HeadOfFinance,
    Custom(String),
}

impl RoleCriterion {
    pub fn as_str(&self) -> &str {
        match self {
            RoleCriterion::HodOrAssistant => "hod_or_assistant",
            RoleCriterion::IctOfficer => "ict_officer",
            RoleCriterion::HeadOfFinance => "head_of_finance",
            RoleCriterion::Custom(name) => name,
        }
    }
}

impl From<String> for RoleCriterion {
    fn from(value: String) -> Self {
        match value.as_str() {
            "hod_or_assistant" => RoleCriterion::HodOrAssistant,
            "ict_officer" => RoleCriterion::IctOfficer,
            "head_of_finance" => RoleCriterion::HeadOfFinance,
            _ => RoleCriterion::Custom(value),
        }
    }
}

impl From<&str> for RoleCriterion {
    fn from(value: &str) -> Self {
        RoleCriterion::from(value.to_string())
    }
}

impl From<RoleCriterion> for String {
    fn from(value: RoleCriterion) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RoleCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability check deciding whether a candidate satisfies a criterion for a
/// submission raised from `submitter_department`.
///
/// Closures of the same shape implement this too, so new criteria can be
/// plugged in without touching routing or transitions.
pub trait RolePolicy: Send + Sync {
    fn satisfies(
        &self,
        criterion: &RoleCriterion,
        candidate: &ActingUser,
        submitter_department: &str,
    ) -> bool;
}

impl<F> RolePolicy for F
where
    F: Fn(&RoleCriterion, &ActingUser, &str) -> bool + Send + Sync,
{
    fn satisfies(
        &self,
        criterion: &RoleCriterion,
        candidate: &ActingUser,
        submitter_department: &str,
    ) -> bool {
        self(criterion, candidate, submitter_department)
    }
}

/// Which departments a rule accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "scope", content = "names")]
pub enum DepartmentScope {
    #[default]
    Any,
    /// Must belong to the same department as the submitter
    Submitter,
    Named(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    /// Accepted role names, compared case-insensitively
    pub roles: Vec<String>,
    #[serde(default)]
    pub departments: DepartmentScope,
}

impl RoleRule {
    pub fn new(roles: &[&str], departments: DepartmentScope) -> Self {
        Self {
            roles: roles.iter().map(|r| r.to_string()).collect(),
            departments,
        }
    }

    fn matches(&self, candidate: &ActingUser, submitter_department: &str) -> bool {
        let role_ok = self
            .roles
            .iter()
            .any(|role| role.eq_ignore_ascii_case(candidate.role.trim()));
        if !role_ok {
            return false;
        }

        match &self.departments {
            DepartmentScope::Any => true,
            DepartmentScope::Submitter => candidate
                .department
                .trim()
                .eq_ignore_ascii_case(submitter_department.trim()),
            DepartmentScope::Named(names) => names
                .iter()
                .any(|name| name.eq_ignore_ascii_case(candidate.department.trim())),
        }
    }
}

/// Table-driven policy; criteria without a rule are never satisfied
#[derive(Debug, Clone, Default)]
pub struct RuleBasedPolicy {
    rules: HashMap<RoleCriterion, RoleRule>,
}

impl RuleBasedPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the criteria built into the standard pipeline
    pub fn standard() -> Self {
        let mut policy = Self::new();
        policy.register(
            RoleCriterion::HodOrAssistant,
            RoleRule::new(&["hod", "assistant_hod"], DepartmentScope::Submitter),
        );
        policy.register(
            RoleCriterion::IctOfficer,
            RoleRule::new(
                &["ict_officer"],
                DepartmentScope::Named(vec!["Information Technology".to_string()]),
            ),
        );
        policy.register(
            RoleCriterion::HeadOfFinance,
            RoleRule::new(
                &["hod"],
                DepartmentScope::Named(vec!["Finance & Procurement".to_string()]),
            ),
        );
        policy
    }

    pub fn register(&mut self, criterion: RoleCriterion, rule: RoleRule) {
        self.rules.insert(criterion, rule);
    }

    pub fn rule(&self, criterion: &RoleCriterion) -> Option<&RoleRule> {
        self.rules.get(criterion)
    }
}

impl RolePolicy for RuleBasedPolicy {
    fn satisfies(
        &self,
        criterion: &RoleCriterion,
        candidate: &ActingUser,
        submitter_department: &str,
    ) -> bool {
        match self.rules.get(criterion) {
            Some(rule) => rule.matches(candidate, submitter_department),
            None => {
                tracing::debug!(criterion = %criterion, "No rule registered for role criterion");
                false
            }
        }
    }
}
