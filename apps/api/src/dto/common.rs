use serde::Serialize;
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub postgres: HealthDependencyStatus,
}

/// State of one dependency checked by the health endpoint.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/generic-message-response.ts"
)]
pub struct GenericMessageResponse {
    pub message: String,
}
