use std::path::Path as FilePath;

use axum::body::Body;
use axum::extract::{Extension, Path, Query, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED,
};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use demodeck_application::ArtifactFile;
use demodeck_core::{AppError, DemoConfigId, UserIdentity};
use tokio_util::io::ReaderStream;

use crate::dto::DemoFileParams;
use crate::error::ApiResult;
use crate::state::AppState;


const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub async fn demo_root_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((project_name, branch)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let file = state
        .artifact_service
        .fetch(&user, &project_name, &branch, "")
        .await?;

    serve_file(&file, &headers).await
}

pub async fn demo_file_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((project_name, branch, sub_path)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let file = state
        .artifact_service
        .fetch(&user, &project_name, &branch, &sub_path)
        .await?;

    serve_file(&file, &headers).await
}

pub async fn demo_config_file_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(demo_config_id): Path<String>,
    Query(params): Query<DemoFileParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let demo_config_id = demo_config_id.parse::<DemoConfigId>()?;
    let file = state
        .artifact_service
        .fetch_by_demo_config(&user, demo_config_id, params.path.as_deref().unwrap_or(""))
        .await?;

    serve_file(&file, &headers).await
}

async fn serve_file(file: &ArtifactFile, headers: &HeaderMap) -> ApiResult<Response> {
    let last_modified = format_http_date(file.modified_at);
    let since = headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_http_date);

    if !file.is_modified_since(since) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(LAST_MODIFIED, last_modified), (CACHE_CONTROL, "no-cache".to_owned())],
        )
            .into_response());
    }

    let handle = tokio::fs::File::open(&file.path)
        .await
        .map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound("requested file no longer exists".to_owned())
            }
            _ => AppError::Internal(format!(
                "failed to open '{}': {error}",
                file.path.display()
            )),
        })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type_for(&file.path))
        .header(CONTENT_LENGTH, file.size)
        .header(LAST_MODIFIED, last_modified)
        .header(CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(ReaderStream::new(handle)))
        .map_err(|error| AppError::Internal(format!("failed to build file response: {error}")).into())
}

fn format_http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn content_type_for(path: &FilePath) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "webmanifest" => "application/manifest+json",
        _ => "application/octet-stream",
    }
}
