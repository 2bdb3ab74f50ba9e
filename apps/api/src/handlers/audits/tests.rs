use axum::extract::{Extension, Path, Query, State};
use chrono::Utc;
use demodeck_core::{AppError, AuditId};
use demodeck_domain::{
    AuditOutcome, AuditStatus, BranchName, DeploymentAudit, DeploymentSummary, DeploymentTrigger,
};

use crate::dto::{AuditListParams, AuditStatsParams};
use crate::error::ApiError;
use crate::handlers::test_support::TestApp;

use super::{
    audit_stats_handler, get_audit_handler, list_audits_handler, re_execute_audit_handler,
};

async fn seed_audit(app: &TestApp, outcome: Option<AuditOutcome>) -> DeploymentAudit {
    let project = match app.store.projects.lock().await.first().cloned() {
        Some(project) => project,
        None => unreachable!(),
    };
    let mut audit = DeploymentAudit::pending(
        project.id(),
        BranchName::new("main").unwrap_or_else(|_| unreachable!()),
        DeploymentTrigger::Push,
        project.repository_full_name().as_str(),
        Utc::now(),
    )
    .unwrap_or_else(|_| unreachable!());
    if let Some(outcome) = outcome {
        audit
            .complete(outcome, Utc::now())
            .unwrap_or_else(|_| unreachable!());
    }
    app.store.audits.lock().await.push(audit.clone());
    audit
}

#[tokio::test]
async fn list_filters_by_status_and_reports_paging() {
    let app = TestApp::new();
    app.store.add_project("demo", "org/demo").await;
    seed_audit(
        &app,
        Some(AuditOutcome::Success(DeploymentSummary::from_outcomes(Vec::new()))),
    )
    .await;
    seed_audit(&app, Some(AuditOutcome::Failed("git exited 128".to_owned()))).await;
    seed_audit(&app, None).await;

    let all = list_audits_handler(State(app.state.clone()), Query(AuditListParams::default()))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(all.0.total, 3);
    assert_eq!(all.0.page, 1);
    assert_eq!(all.0.total_pages, 1);

    let failed = list_audits_handler(
        State(app.state.clone()),
        Query(AuditListParams {
            status: Some("failed".to_owned()),
            limit: Some(1),
            ..AuditListParams::default()
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    assert_eq!(failed.0.total, 1);
    assert_eq!(failed.0.entries[0].status, "failed");
    assert_eq!(
        failed.0.entries[0].error_message.as_deref(),
        Some("git exited 128")
    );

    let invalid = list_audits_handler(
        State(app.state.clone()),
        Query(AuditListParams {
            status: Some("exploded".to_owned()),
            ..AuditListParams::default()
        }),
    )
    .await;
    assert!(matches!(invalid, Err(ApiError(AppError::Validation(_)))));
}

#[tokio::test]
async fn stats_count_statuses_over_the_window() {
    let app = TestApp::new();
    app.store.add_project("demo", "org/demo").await;
    seed_audit(
        &app,
        Some(AuditOutcome::Success(DeploymentSummary::from_outcomes(Vec::new()))),
    )
    .await;
    seed_audit(&app, Some(AuditOutcome::Failed("boom".to_owned()))).await;

    let stats = audit_stats_handler(
        State(app.state.clone()),
        Query(AuditStatsParams {
            project_id: None,
            days: Some(1),
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(stats.0.total, 2);
    assert_eq!(stats.0.success, 1);
    assert_eq!(stats.0.failed, 1);
    assert!((stats.0.success_rate - 50.0).abs() < f64::EPSILON);
    assert_eq!(stats.0.period_days, 1);
}

#[tokio::test]
async fn unknown_audit_is_not_found() {
    let app = TestApp::new();

    let result = get_audit_handler(
        State(app.state.clone()),
        Path(AuditId::new().to_string()),
    )
    .await;

    assert!(matches!(result, Err(ApiError(AppError::NotFound(_)))));
}

#[tokio::test]
async fn re_execute_creates_a_new_record_and_leaves_the_prior_one() {
    let app = TestApp::new();
    let admin = app.store.add_user("root", true).await;
    let project = app.store.add_project("demo", "org/demo").await;
    app.store.add_demo_config(project.id(), "main").await;
    let prior = seed_audit(&app, Some(AuditOutcome::Failed("network down".to_owned()))).await;

    let response = re_execute_audit_handler(
        State(app.state.clone()),
        Extension(admin),
        Path(prior.id().to_string()),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    assert_ne!(response.0.audit_id, prior.id().to_string());
    assert_eq!(response.0.event, "re_execute");
    assert_eq!(response.0.branch, "main");

    let stored_prior = get_audit_handler(State(app.state.clone()), Path(prior.id().to_string()))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(stored_prior.0.status, AuditStatus::Failed.as_str());
    assert_eq!(stored_prior.0.error_message.as_deref(), Some("network down"));
}
