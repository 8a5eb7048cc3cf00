use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::workflows::{RoleCriterion, RoleRule, RuleBasedPolicy, StageStep, WorkflowDefinition};

/// Main configuration structure for the approval flow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApprovalFlowConfig {
    /// Where submissions are persisted
    pub store: StoreConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Approval pipelines, one per form
    pub workflows: Vec<FormWorkflowConfig>,
    /// Role criterion name → rule
    pub roles: BTreeMap<String, RoleRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Directory for the file store
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or filter directive, e.g. `info` or `approval_flow=debug`
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable output
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormWorkflowConfig {
    pub form_slug: String,
    pub steps: Vec<StageStep>,
}

impl Default for ApprovalFlowConfig {
    fn default() -> Self {
        let standard = RuleBasedPolicy::standard();
        let roles = [
            RoleCriterion::HodOrAssistant,
            RoleCriterion::IctOfficer,
            RoleCriterion::HeadOfFinance,
        ]
        .into_iter()
        .filter_map(|criterion| {
            standard
                .rule(&criterion)
                .map(|rule| (criterion.as_str().to_string(), rule.clone()))
        })
        .collect();

        Self {
            store: StoreConfig {
                kind: StoreKind::File,
                directory: PathBuf::from(".approval-flow/submissions"),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
            workflows: vec![FormWorkflowConfig {
                form_slug: "general_request".to_string(),
                steps: WorkflowDefinition::standard().steps().to_vec(),
            }],
            roles,
        }
    }
}

impl ApprovalFlowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (approval-flow.toml)
    /// 3. Environment variables (prefixed with APPROVAL_FLOW__)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("approval-flow.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&ApprovalFlowConfig::default())?);

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("APPROVAL_FLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let loaded: ApprovalFlowConfig = config
            .try_deserialize()
            .context("Invalid approval flow configuration")?;
        Ok(loaded)
    }

    /// Validated workflow definitions keyed by form slug
    pub fn definitions(&self) -> Result<HashMap<String, WorkflowDefinition>> {
        let mut forms = HashMap::new();
        for form in &self.workflows {
            let definition = WorkflowDefinition::new(form.steps.clone())
                .with_context(|| format!("Invalid workflow for form '{}'", form.form_slug))?;
            if forms.insert(form.form_slug.clone(), definition).is_some() {
                anyhow::bail!("Form '{}' is configured more than once", form.form_slug);
            }
        }
        Ok(forms)
    }

    /// Role policy built from the `roles` table
    pub fn role_policy(&self) -> RuleBasedPolicy {
        let mut policy = RuleBasedPolicy::new();
        for (name, rule) in &self.roles {
            policy.register(RoleCriterion::from(name.as_str()), rule.clone());
        }
        policy
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ApprovalFlowConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = ApprovalFlowConfig::load_env_file();
        ApprovalFlowConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ApprovalFlowConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
