use axum::Json;
use axum::extract::{Extension, State};
use demodeck_core::UserIdentity;

use crate::dto::AccessibleProjectResponse;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn accessible_projects_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<AccessibleProjectResponse>>> {
    let projects = state
        .access_service
        .list_accessible_projects(user.user_id())
        .await?
        .into_iter()
        .map(AccessibleProjectResponse::from)
        .collect();

    Ok(Json(projects))
}
