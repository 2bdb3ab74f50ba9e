use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use demodeck_core::{AppError, UserIdentity};
use tower_sessions::Session;
use tracing::warn;

use crate::error::ApiResult;
use crate::state::AppState;

/// Session key under which the login collaborator stores the [`UserIdentity`].
pub const SESSION_USER_KEY: &str = "user_identity";

pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Lets through global administrators and members of an active admin group.
///
/// Must run after [`require_auth`].
pub async fn require_administrator(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = request
        .extensions()
        .get::<UserIdentity>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    if !state
        .access_service
        .is_administrator(identity.user_id())
        .await?
    {
        warn!(user_id = %identity.user_id(), path = %request.uri().path(), "administrator route denied");
        return Err(AppError::Forbidden("administrator access required".to_owned()).into());
    }

    Ok(next.run(request).await)
}
