// Approval service integration tests against the in-memory and file stores

use approval_flow::{
    ActingUser, ApprovalService, Decision, FileSystemSubmissionStore, InMemorySubmissionStore,
    Outcome, RuleBasedPolicy, ServiceError, Signature, StageId, StoreError, SubmissionFilter,
    SubmissionStore, Submitter, WorkflowDefinition, WorkflowError,
};
use std::collections::HashMap;

fn directory() -> Vec<ActingUser> {
    vec![
        ActingUser::new("hod-legal", "Abena Asante", "hod", "Legal Affairs"),
        ActingUser::new("ict-1", "Kwame Mensah", "ict_officer", "Information Technology"),
        ActingUser::new("fin-1", "Akua Darko", "hod", "Finance & Procurement"),
    ]
}

fn submitter() -> Submitter {
    Submitter {
        uid: "staff-7".to_string(),
        department: "Legal Affairs".to_string(),
        role: "user".to_string(),
    }
}

fn approval_service<S: SubmissionStore>(store: S) -> ApprovalService<S> {
    let mut forms = HashMap::new();
    forms.insert("general_request".to_string(), WorkflowDefinition::standard());
    ApprovalService::new(store, forms, Box::new(RuleBasedPolicy::standard()))
}

fn signed(user: &ActingUser) -> Decision {
    Decision::new(&user.uid, &user.name, Signature::new("data:image/png;base64,AAAA"))
}

#[tokio::test]
async fn test_submit_routes_and_lists_pending() {
    let service = approval_service(InMemorySubmissionStore::new());
    let users = directory();

    let submission = service
        .submit("general_request", submitter(), &users)
        .await
        .unwrap();
    assert_eq!(submission.status, "pending_recommendation");

    let pending = service
        .pending_for(&users[0], &SubmissionFilter::default())
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].1, StageId::Recommendation);

    let nothing = service
        .pending_for(&users[1], &SubmissionFilter::default())
        .await
        .unwrap();
    assert!(nothing.is_empty());

    let filtered = service
        .pending_for(
            &users[0],
            &SubmissionFilter {
                search: Some("vehicle".to_string()),
                status: None,
            },
        )
        .await
        .unwrap();
    assert!(filtered.is_empty());
}

#[tokio::test]
async fn test_full_approval_through_service() {
    let service = approval_service(InMemorySubmissionStore::new());
    let users = directory();
    let submission = service
        .submit("general_request", submitter(), &users)
        .await
        .unwrap();

    let stages = [StageId::Recommendation, StageId::Issuance, StageId::Approval];
    for (stage, user) in stages.iter().zip(users.iter()) {
        service
            .decide(&submission.id, user, stage, signed(user), Outcome::Approve)
            .await
            .unwrap();
    }

    let status = service.status_of(&submission.id).await.unwrap();
    assert_eq!(status.submission.status, "approved");
    assert!(status.current_reviewer.is_none());
    assert_eq!(status.decisions.len(), 3);
}

#[tokio::test]
async fn test_stale_state_is_reported_as_concurrent_modification() {
    let service = approval_service(InMemorySubmissionStore::new());
    let users = directory();
    let submission = service
        .submit("general_request", submitter(), &users)
        .await
        .unwrap();

    let stale = submission.workflow.clone();
    service
        .decide(
            &submission.id,
            &users[0],
            &StageId::Recommendation,
            signed(&users[0]),
            Outcome::Approve,
        )
        .await
        .unwrap();

    // A racer that read the old state loses the compare-and-swap
    let result = service
        .store()
        .save_workflow_state(&submission.id, &stale, &stale, "pending_recommendation")
        .await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));

    // And a repeated decision through the service is refused outright
    let err = service
        .decide(
            &submission.id,
            &users[0],
            &StageId::Recommendation,
            signed(&users[0]),
            Outcome::Approve,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Workflow(WorkflowError::InvalidTransition { .. })
    ));
    assert_eq!(err.user_message(), "This request is no longer awaiting your action.");
}

#[tokio::test]
async fn test_decision_must_be_signed_by_acting_user() {
    let service = approval_service(InMemorySubmissionStore::new());
    let users = directory();
    let submission = service
        .submit("general_request", submitter(), &users)
        .await
        .unwrap();

    let err = service
        .decide(
            &submission.id,
            &users[1],
            &StageId::Recommendation,
            signed(&users[0]),
            Outcome::Approve,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Workflow(WorkflowError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_unknown_form_and_unroutable_submission() {
    let service = approval_service(InMemorySubmissionStore::new());

    let err = service
        .submit("vehicle_request", submitter(), &directory())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnknownForm(slug) if slug == "vehicle_request"));

    let err = service
        .submit("general_request", submitter(), &directory()[..1])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Routing(_)));
}

#[tokio::test]
async fn test_file_store_persists_decisions() {
    let dir = tempfile::tempdir().unwrap();
    let users = directory();

    let id = {
        let service = approval_service(FileSystemSubmissionStore::new(dir.path()));
        let submission = service
            .submit("general_request", submitter(), &users)
            .await
            .unwrap();
        service
            .decide(
                &submission.id,
                &users[0],
                &StageId::Recommendation,
                signed(&users[0]).with_comments("Recommended for issuance"),
                Outcome::Approve,
            )
            .await
            .unwrap();
        submission.id
    };

    // Fresh service over the same directory sees the decision
    let service = approval_service(FileSystemSubmissionStore::new(dir.path()));
    let status = service.status_of(&id).await.unwrap();
    assert_eq!(status.submission.status, "recommended");
    assert_eq!(status.current_reviewer.unwrap().uid, "ict-1");
    assert_eq!(
        status.decisions[0].1.comments.as_deref(),
        Some("Recommended for issuance")
    );

    let pending = service
        .pending_for(&users[1], &SubmissionFilter::default())
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
}
