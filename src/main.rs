use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};

use approval_flow::config::StoreKind;
use approval_flow::{
    config, form_display_name, init_telemetry, ActingUser, ApprovalService, Decision,
    FileSystemSubmissionStore, InMemorySubmissionStore, Outcome, ServiceError, Signature,
    StageId, SubmissionFilter, SubmissionStore, Submitter,
};

#[derive(Parser)]
#[command(name = "approval-flow")]
#[command(about = "Multi-stage approval workflows for form submissions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct Identity {
    /// User id of the person acting
    #[arg(long)]
    uid: String,
    /// Role of the person acting
    #[arg(long, default_value = "user")]
    role: String,
    /// Department of the person acting
    #[arg(long, default_value = "")]
    department: String,
    /// Display name recorded alongside decisions
    #[arg(long, default_value = "")]
    name: String,
}

impl Identity {
    fn acting_user(&self) -> ActingUser {
        ActingUser::new(&self.uid, &self.name, &self.role, &self.department)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List configured forms and their approval stages
    Forms,
    /// File a new submission, routing each stage to a reviewer
    Submit {
        /// Form slug, e.g. general_request
        #[arg(long)]
        form: String,
        #[command(flatten)]
        identity: Identity,
        /// JSON file listing candidate reviewers
        #[arg(long)]
        directory: PathBuf,
    },
    /// Show a submission's status and current reviewer
    Status {
        /// Submission id
        id: String,
    },
    /// List submissions awaiting your decision
    Pending {
        #[command(flatten)]
        identity: Identity,
        /// Match form, department or id
        #[arg(long)]
        search: Option<String>,
        /// Status code filter, e.g. pending_recommendation
        #[arg(long)]
        status: Option<String>,
    },
    /// Approve or decline the current stage of a submission
    #[command(group(ArgGroup::new("outcome").required(true).args(["approve", "decline"])))]
    Decide {
        /// Submission id
        id: String,
        #[command(flatten)]
        identity: Identity,
        /// Stage being decided
        #[arg(long)]
        stage: String,
        #[arg(long)]
        approve: bool,
        #[arg(long)]
        decline: bool,
        /// File holding the signature image data URL
        #[arg(long)]
        signature_file: PathBuf,
        #[arg(long)]
        comments: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config()?;
    init_telemetry(&config.observability)?;

    let forms = config.definitions()?;
    let policy = Box::new(config.role_policy());

    tokio::runtime::Runtime::new()?.block_on(async {
        match config.store.kind {
            StoreKind::File => {
                let store = FileSystemSubmissionStore::new(&config.store.directory);
                run(ApprovalService::new(store, forms, policy), cli.command).await
            }
            StoreKind::Memory => {
                let store = InMemorySubmissionStore::new();
                run(ApprovalService::new(store, forms, policy), cli.command).await
            }
        }
    })
}

async fn run<S: SubmissionStore>(service: ApprovalService<S>, command: Commands) -> Result<()> {
    let outcome = match command {
        Commands::Forms => {
            forms_command(&service);
            Ok(())
        }
        Commands::Submit {
            form,
            identity,
            directory,
        } => submit_command(&service, &form, &identity, &directory).await,
        Commands::Status { id } => status_command(&service, &id).await,
        Commands::Pending {
            identity,
            search,
            status,
        } => {
            let filter = SubmissionFilter { search, status };
            pending_command(&service, &identity, &filter).await
        }
        Commands::Decide {
            id,
            identity,
            stage,
            approve,
            decline: _,
            signature_file,
            comments,
        } => {
            let outcome = if approve { Outcome::Approve } else { Outcome::Decline };
            let signature = std::fs::read_to_string(&signature_file).with_context(|| {
                format!("Failed to read signature file {}", signature_file.display())
            })?;
            decide_command(
                &service,
                &id,
                &identity,
                StageId::from(stage),
                Signature::new(signature.trim()),
                comments,
                outcome,
            )
            .await
        }
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(CommandError::Service(e)) => {
            println!("❌ {}", e.user_message());
            tracing::debug!(error = %e, "Command failed");
            std::process::exit(1);
        }
        Err(CommandError::Other(e)) => Err(e),
    }
}

enum CommandError {
    Service(ServiceError),
    Other(anyhow::Error),
}

impl From<ServiceError> for CommandError {
    fn from(err: ServiceError) -> Self {
        CommandError::Service(err)
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        CommandError::Other(err)
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::Other(err.into())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::Other(err.into())
    }
}

fn forms_command<S: SubmissionStore>(service: &ApprovalService<S>) {
    let mut slugs: Vec<&String> = service.forms().keys().collect();
    slugs.sort();

    if slugs.is_empty() {
        println!("📋 No workflows configured");
        return;
    }

    for slug in slugs {
        let definition = &service.forms()[slug];
        println!("📄 {} ({})", form_display_name(slug), slug);
        for (index, step) in definition.steps().iter().enumerate() {
            println!(
                "   {}. {} → {}{}",
                index + 1,
                step.stage,
                step.role_criteria,
                if step.description.is_empty() {
                    String::new()
                } else {
                    format!(" - {}", step.description)
                }
            );
        }
    }
}

async fn submit_command<S: SubmissionStore>(
    service: &ApprovalService<S>,
    form: &str,
    identity: &Identity,
    directory: &Path,
) -> Result<(), CommandError> {
    let contents = std::fs::read_to_string(directory)?;
    let reviewers: Vec<ActingUser> = serde_json::from_str(&contents)?;

    let submitter = Submitter {
        uid: identity.uid.clone(),
        department: identity.department.clone(),
        role: identity.role.clone(),
    };
    let submission = service.submit(form, submitter, &reviewers).await?;

    println!("✅ Submitted {}", form_display_name(&submission.form_slug));
    println!("   🆔 {}", submission.id);
    println!("   📌 Status: {}", submission.status.replace('_', " "));
    Ok(())
}

async fn status_command<S: SubmissionStore>(
    service: &ApprovalService<S>,
    id: &str,
) -> Result<(), CommandError> {
    let status = service.status_of(id).await?;
    let submission = &status.submission;

    println!("📄 {} ({})", form_display_name(&submission.form_slug), submission.id);
    println!(
        "   👤 Submitted by {} ({})",
        submission.submitted_by.uid, submission.submitted_by.department
    );
    println!("   📌 Status: {}", status.overall.display_label());

    match &status.current_reviewer {
        Some(reviewer) => println!(
            "   ⏳ Current reviewer: {} ({}, {})",
            if reviewer.name.is_empty() { &reviewer.uid } else { &reviewer.name },
            reviewer.role,
            reviewer.department
        ),
        None => println!("   🏁 No further action required"),
    }

    for (stage, progress) in &status.decisions {
        println!(
            "   • {}: {:?} by {}{}",
            stage.display_name(),
            progress.status,
            progress.name,
            progress
                .comments
                .as_deref()
                .map(|c| format!(" - \"{c}\""))
                .unwrap_or_default()
        );
    }
    Ok(())
}

async fn pending_command<S: SubmissionStore>(
    service: &ApprovalService<S>,
    identity: &Identity,
    filter: &SubmissionFilter,
) -> Result<(), CommandError> {
    let pending = service.pending_for(&identity.acting_user(), filter).await?;

    if pending.is_empty() {
        println!("📋 Nothing awaiting your decision");
        return Ok(());
    }

    println!("📋 {} submission(s) awaiting your decision:", pending.len());
    for (submission, stage) in pending {
        println!(
            "   🎯 {} - {} stage ({}) [{}]",
            submission.id,
            stage.display_name(),
            form_display_name(&submission.form_slug),
            submission.status.replace('_', " ")
        );
    }
    Ok(())
}

async fn decide_command<S: SubmissionStore>(
    service: &ApprovalService<S>,
    id: &str,
    identity: &Identity,
    stage: StageId,
    signature: Signature,
    comments: Option<String>,
    outcome: Outcome,
) -> Result<(), CommandError> {
    let acting_user = identity.acting_user();
    let mut decision = Decision::new(&acting_user.uid, &acting_user.name, signature);
    if let Some(comments) = comments {
        decision = decision.with_comments(comments);
    }

    let submission = service
        .decide(id, &acting_user, &stage, decision, outcome)
        .await?;

    let verb = match outcome {
        Outcome::Approve => "Approved",
        Outcome::Decline => "Declined",
    };
    println!("✅ {} {} stage of {}", verb, stage.display_name(), submission.id);
    println!("   📌 Status: {}", submission.status.replace('_', " "));
    Ok(())
}
