use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::{HealthDependencyStatus, HealthResponse};
use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let postgres = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.postgres_pool)
        .await
    {
        Ok(_) => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("postgres check failed: {error}")),
        },
    };

    let ready = postgres.status == "ok";
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: if ready { "ok" } else { "degraded" },
            postgres,
        }),
    )
}
