use axum::Json;
use axum::extract::{Extension, State};
use demodeck_core::{AppError, ProjectId, UserIdentity};
use demodeck_domain::{BranchName, DEFAULT_BRANCH, ProjectRole};
use tracing::{info, warn};

use crate::dto::{ScheduledDeploymentResponse, TriggerDeploymentRequest};
use crate::error::ApiResult;
use crate::state::AppState;

#[cfg(test)]
mod tests;

pub async fn trigger_deployment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<TriggerDeploymentRequest>,
) -> ApiResult<Json<ScheduledDeploymentResponse>> {
    let project_id = payload.project_id.parse::<ProjectId>()?;
    let branch = BranchName::new(
        payload
            .branch
            .filter(|branch| !branch.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BRANCH.to_owned()),
    )?;

    state
        .deployment_service
        .deployable_project(project_id)
        .await?;
    if !state
        .access_service
        .check_access(user.user_id(), project_id, ProjectRole::Editor)
        .await?
    {
        warn!(user_id = %user.user_id(), %project_id, "manual deployment denied");
        return Err(AppError::Forbidden(format!(
            "editor access to project '{project_id}' is required"
        ))
        .into());
    }

    let scheduled = state
        .deployment_service
        .trigger_project(project_id, branch)
        .await?;
    info!(
        audit_id = %scheduled.audit.id(),
        user_id = %user.user_id(),
        "manual deployment scheduled"
    );

    Ok(Json(ScheduledDeploymentResponse::accepted(
        "Deployment triggered",
        &scheduled.audit,
    )))
}
