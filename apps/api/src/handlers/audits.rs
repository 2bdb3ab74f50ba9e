use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use demodeck_application::AuditListQuery;
use demodeck_core::{AuditId, ProjectId, UserIdentity};
use demodeck_domain::AuditStatus;
use tracing::info;

use crate::dto::{
    AuditListParams, AuditListResponse, AuditStatsParams, AuditStatsResponse,
    DeploymentAuditResponse, ScheduledDeploymentResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

#[cfg(test)]
mod tests;

pub async fn list_audits_handler(
    State(state): State<AppState>,
    Query(params): Query<AuditListParams>,
) -> ApiResult<Json<AuditListResponse>> {
    let query = AuditListQuery {
        status: params
            .status
            .as_deref()
            .map(AuditStatus::parse)
            .transpose()?,
        project_id: params
            .project_id
            .as_deref()
            .map(str::parse::<ProjectId>)
            .transpose()?,
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(0),
    };

    let page = state.deployment_service.list_audits(query).await?;
    Ok(Json(AuditListResponse::from(page)))
}

pub async fn audit_stats_handler(
    State(state): State<AppState>,
    Query(params): Query<AuditStatsParams>,
) -> ApiResult<Json<AuditStatsResponse>> {
    let project_id = params
        .project_id
        .as_deref()
        .map(str::parse::<ProjectId>)
        .transpose()?;

    let stats = state
        .deployment_service
        .audit_stats(project_id, params.days)
        .await?;
    Ok(Json(AuditStatsResponse::from(stats)))
}

pub async fn get_audit_handler(
    State(state): State<AppState>,
    Path(audit_id): Path<String>,
) -> ApiResult<Json<DeploymentAuditResponse>> {
    let audit_id = audit_id.parse::<AuditId>()?;
    let audit = state.deployment_service.get_audit(audit_id).await?;

    Ok(Json(DeploymentAuditResponse::from(&audit)))
}

pub async fn re_execute_audit_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<String>,
) -> ApiResult<Json<ScheduledDeploymentResponse>> {
    let audit_id = audit_id.parse::<AuditId>()?;
    let scheduled = state.deployment_service.re_execute(audit_id).await?;
    info!(
        prior_audit_id = %audit_id,
        audit_id = %scheduled.audit.id(),
        user_id = %user.user_id(),
        "deployment re-execution scheduled"
    );

    Ok(Json(ScheduledDeploymentResponse::accepted(
        "Deployment re-execution scheduled",
        &scheduled.audit,
    )))
}
