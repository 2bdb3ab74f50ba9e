use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use demodeck_application::WebhookDeployment;
use demodeck_core::AppError;
use demodeck_domain::{
    BranchName, DeploymentSummary, DeploymentTrigger, NO_MATCHING_CONFIGS_MESSAGE,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::dto::{
    DeploymentResultResponse, WebhookDeploymentResponse, WebhookIgnoredResponse,
    WebhookNoMatchResponse, WebhookTestResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod signature;

#[cfg(test)]
pub(crate) use signature::sign;
use signature::verify_signature;


const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const EVENT_HEADER: &str = "x-github-event";

#[derive(Debug, Deserialize)]
struct PushPayload {
    repository: Option<RepositoryPayload>,
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    full_name: Option<String>,
}

pub async fn webhook_test_handler(State(state): State<AppState>) -> Json<WebhookTestResponse> {
    Json(WebhookTestResponse {
        message: "GitHub webhook endpoint is working".to_owned(),
        timestamp: Utc::now().to_rfc3339(),
        has_webhook_secret: !state.webhook_secret.is_empty(),
    })
}

pub async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if let Err(error) = verify_signature(&state.webhook_secret, &body, signature) {
        warn!(error = %error, "rejected webhook delivery");
        return Err(error.into());
    }

    let event_type = headers
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned);
    if event_type.as_deref() != Some("push") {
        info!(event_type = event_type.as_deref().unwrap_or("<none>"), "ignoring webhook event");
        return Ok(Json(WebhookIgnoredResponse {
            message: "Event ignored".to_owned(),
            event_type,
        })
        .into_response());
    }

    let payload: PushPayload = serde_json::from_slice(&body)
        .map_err(|error| AppError::Validation(format!("invalid webhook payload: {error}")))?;
    let (Some(repository), Some(git_ref)) = (
        payload
            .repository
            .and_then(|repository| repository.full_name)
            .filter(|name| !name.trim().is_empty()),
        payload.git_ref,
    ) else {
        return Err(
            AppError::Validation("missing required fields in webhook payload".to_owned()).into(),
        );
    };
    let branch = match BranchName::from_ref(&git_ref) {
        Ok(Some(branch)) => branch,
        Ok(None) => {
            info!(
                repository = repository.as_str(),
                git_ref = git_ref.as_str(),
                "ignoring push outside refs/heads"
            );
            return Ok(no_match(repository, git_ref, None));
        }
        Err(error) => {
            warn!(
                repository = repository.as_str(),
                git_ref = git_ref.as_str(),
                error = %error,
                "ignoring push for unusable branch name"
            );
            let branch = git_ref
                .strip_prefix("refs/heads/")
                .unwrap_or(&git_ref)
                .to_owned();
            return Ok(no_match(repository, branch, None));
        }
    };

    let deployment = state
        .deployment_service
        .execute(&repository, &branch, DeploymentTrigger::Push)
        .await?;

    let audit = match deployment {
        WebhookDeployment::NoMatchingProject => {
            return Ok(no_match(repository, branch.to_string(), None));
        }
        WebhookDeployment::Completed(audit) => audit,
    };

    let summary = audit
        .summary()
        .cloned()
        .unwrap_or_else(|| DeploymentSummary::from_outcomes(Vec::new()));
    if summary.total_configs == 0 {
        return Ok(no_match(
            repository,
            branch.to_string(),
            Some(audit.id().to_string()),
        ));
    }

    Ok(Json(WebhookDeploymentResponse {
        message: "Webhook processed successfully".to_owned(),
        repository,
        branch: branch.to_string(),
        audit_id: audit.id().to_string(),
        total_configs: summary.total_configs,
        success_count: summary.success_count,
        failure_count: summary.failure_count,
        results: summary
            .results
            .iter()
            .map(DeploymentResultResponse::from)
            .collect(),
    })
    .into_response())
}

fn no_match(repository: String, branch: String, audit_id: Option<String>) -> Response {
    Json(WebhookNoMatchResponse {
        message: NO_MATCHING_CONFIGS_MESSAGE.to_owned(),
        repository,
        branch,
        audit_id,
    })
    .into_response()
}
