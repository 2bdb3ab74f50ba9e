use axum::Json;
use axum::extract::{Extension, Path, State};
use demodeck_core::{GroupId, ProjectId, UserId, UserIdentity};
use demodeck_domain::ProjectRole;
use tracing::info;

use crate::dto::{
    GenericMessageResponse, GrantRoleRequest, PermissionCacheEntryResponse,
    PermissionCacheResponse, PermissionCacheStatsResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;


pub async fn permission_cache_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<PermissionCacheResponse>> {
    let stats = state.permission_cache.stats().await?;
    let entries = state.permission_cache.entries().await?;

    Ok(Json(PermissionCacheResponse {
        stats: PermissionCacheStatsResponse::from(stats),
        entries: entries
            .into_iter()
            .map(PermissionCacheEntryResponse::from)
            .collect(),
    }))
}

pub async fn clear_permission_cache_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<GenericMessageResponse>> {
    state.permission_cache.clear().await?;
    info!(user_id = %user.user_id(), "permission cache cleared");

    Ok(Json(GenericMessageResponse {
        message: "Permission cache cleared".to_owned(),
    }))
}

pub async fn grant_user_project_role_handler(
    State(state): State<AppState>,
    Path((project_id, user_id)): Path<(String, String)>,
    Json(payload): Json<GrantRoleRequest>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let project_id = project_id.parse::<ProjectId>()?;
    let user_id = user_id.parse::<UserId>()?;
    let role = ProjectRole::parse(&payload.role)?;

    state
        .grant_service
        .grant_project_role(user_id, project_id, role)
        .await?;

    Ok(Json(GenericMessageResponse {
        message: format!("Granted {} on project", role.as_str()),
    }))
}

pub async fn revoke_user_project_role_handler(
    State(state): State<AppState>,
    Path((project_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let project_id = project_id.parse::<ProjectId>()?;
    let user_id = user_id.parse::<UserId>()?;

    state
        .grant_service
        .revoke_project_role(user_id, project_id)
        .await?;

    Ok(Json(GenericMessageResponse {
        message: "Project role revoked".to_owned(),
    }))
}

pub async fn grant_group_project_role_handler(
    State(state): State<AppState>,
    Path((project_id, group_id)): Path<(String, String)>,
    Json(payload): Json<GrantRoleRequest>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let project_id = project_id.parse::<ProjectId>()?;
    let group_id = group_id.parse::<GroupId>()?;
    let role = ProjectRole::parse(&payload.role)?;

    state
        .grant_service
        .grant_group_project_role(group_id, project_id, role)
        .await?;

    Ok(Json(GenericMessageResponse {
        message: format!("Granted {} on project to group", role.as_str()),
    }))
}

pub async fn revoke_group_project_role_handler(
    State(state): State<AppState>,
    Path((project_id, group_id)): Path<(String, String)>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let project_id = project_id.parse::<ProjectId>()?;
    let group_id = group_id.parse::<GroupId>()?;

    state
        .grant_service
        .revoke_group_project_role(group_id, project_id)
        .await?;

    Ok(Json(GenericMessageResponse {
        message: "Group project role revoked".to_owned(),
    }))
}

pub async fn add_group_member_handler(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(String, String)>,
    Json(payload): Json<GrantRoleRequest>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let group_id = group_id.parse::<GroupId>()?;
    let user_id = user_id.parse::<UserId>()?;
    let role = ProjectRole::parse(&payload.role)?;

    state
        .grant_service
        .add_group_member(user_id, group_id, role)
        .await?;

    Ok(Json(GenericMessageResponse {
        message: "Group member saved".to_owned(),
    }))
}

pub async fn remove_group_member_handler(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let group_id = group_id.parse::<GroupId>()?;
    let user_id = user_id.parse::<UserId>()?;

    state
        .grant_service
        .remove_group_member(user_id, group_id)
        .await?;

    Ok(Json(GenericMessageResponse {
        message: "Group member removed".to_owned(),
    }))
}
