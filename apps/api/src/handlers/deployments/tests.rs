use std::time::Duration;

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use demodeck_core::{AppError, ProjectId, UserIdentity};
use demodeck_domain::{AuditStatus, Project, ProjectRole, UserProjectGrant};

use crate::dto::TriggerDeploymentRequest;
use crate::error::ApiError;
use crate::handlers::test_support::TestApp;

use super::trigger_deployment_handler;

fn request(project_id: &str, branch: Option<&str>) -> Json<TriggerDeploymentRequest> {
    Json(TriggerDeploymentRequest {
        project_id: project_id.to_owned(),
        branch: branch.map(ToOwned::to_owned),
    })
}

async fn grant(app: &TestApp, user: &UserIdentity, project_id: ProjectId, role: ProjectRole) {
    app.store.user_grants.lock().await.push(UserProjectGrant {
        user_id: user.user_id(),
        project_id,
        role,
    });
}

async fn wait_until_terminal(app: &TestApp) -> AuditStatus {
    for _ in 0..100 {
        let status = app.store.audits.lock().await.first().map(|audit| audit.status());
        if let Some(status) = status
            && status.is_terminal()
        {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    AuditStatus::Pending
}

#[tokio::test]
async fn editor_trigger_returns_pending_audit_and_defaults_to_main() {
    let app = TestApp::new();
    let editor = app.store.add_user("editor", false).await;
    let project = app.store.add_project("demo", "org/demo").await;
    app.store.add_demo_config(project.id(), "main").await;
    grant(&app, &editor, project.id(), ProjectRole::Editor).await;

    let response = trigger_deployment_handler(
        State(app.state.clone()),
        Extension(editor),
        request(&project.id().to_string(), None),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.0.status, "pending");
    assert_eq!(response.0.branch, "main");
    assert_eq!(response.0.event, "manual_trigger");
    assert_eq!(wait_until_terminal(&app).await, AuditStatus::Success);
    assert!(app.published_root().join("demo/main/index.html").is_file());
}

#[tokio::test]
async fn viewer_cannot_trigger() {
    let app = TestApp::new();
    let viewer = app.store.add_user("viewer", false).await;
    let project = app.store.add_project("demo", "org/demo").await;
    grant(&app, &viewer, project.id(), ProjectRole::Viewer).await;

    let result = trigger_deployment_handler(
        State(app.state.clone()),
        Extension(viewer),
        request(&project.id().to_string(), Some("main")),
    )
    .await;

    assert!(matches!(result, Err(ApiError(AppError::Forbidden(_)))));
    assert!(app.store.audits.lock().await.is_empty());
}

#[tokio::test]
async fn unknown_or_inactive_project_and_malformed_id_are_bad_requests() {
    let app = TestApp::new();
    let admin = app.store.add_user("root", true).await;
    let editor = app.store.add_user("editor", false).await;
    let inactive = Project::new(
        ProjectId::new(),
        "retired",
        "https://github.com/org/retired.git",
        "org/retired",
        false,
    )
    .unwrap_or_else(|_| unreachable!());
    app.store.projects.lock().await.push(inactive.clone());
    grant(&app, &editor, inactive.id(), ProjectRole::Editor).await;

    let unknown = trigger_deployment_handler(
        State(app.state.clone()),
        Extension(admin.clone()),
        request(&ProjectId::new().to_string(), Some("main")),
    )
    .await;
    assert!(matches!(unknown, Err(ApiError(AppError::Validation(_)))));

    for user in [admin.clone(), editor] {
        let result = trigger_deployment_handler(
            State(app.state.clone()),
            Extension(user),
            request(&inactive.id().to_string(), Some("main")),
        )
        .await;
        let status = result.map_or_else(
            |error| error.into_response().status(),
            |_| StatusCode::ACCEPTED,
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert!(app.store.audits.lock().await.is_empty());

    let malformed = trigger_deployment_handler(
        State(app.state.clone()),
        Extension(admin),
        request("project-42", None),
    )
    .await;
    assert!(matches!(malformed, Err(ApiError(AppError::Validation(_)))));
}
