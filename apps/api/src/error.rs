use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use demodeck_core::AppError;
use serde::Serialize;
use tracing::error;
use ts_rs::TS;

/// JSON body of every failed request.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    pub message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        let payload = Json(ErrorResponse {
            message: self.0.to_string(),
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use demodeck_core::AppError;

    use super::ApiError;

    #[test]
    fn application_errors_map_to_http_statuses() {
        let cases = [
            (AppError::Validation("bad".to_owned()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("gone".to_owned()), StatusCode::NOT_FOUND),
            (AppError::Conflict("done".to_owned()), StatusCode::CONFLICT),
            (AppError::Unauthorized("who".to_owned()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("no".to_owned()), StatusCode::FORBIDDEN),
            (AppError::Transport("git".to_owned()), StatusCode::BAD_GATEWAY),
            (
                AppError::Internal("db".to_owned()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError(error).into_response().status(), expected);
        }
    }
}
