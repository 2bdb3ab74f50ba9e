mod access;
mod artifacts;
mod common;
mod deployments;

pub use access::{
    AccessibleProjectResponse, GrantRoleRequest, PermissionCacheEntryResponse,
    PermissionCacheResponse, PermissionCacheStatsResponse,
};
pub use artifacts::DemoFileParams;
pub use common::{GenericMessageResponse, HealthDependencyStatus, HealthResponse};
pub use deployments::{
    AuditListParams, AuditListResponse, AuditStatsParams, AuditStatsResponse,
    DeploymentAuditResponse, DeploymentResultResponse, ScheduledDeploymentResponse,
    TriggerDeploymentRequest, WebhookDeploymentResponse, WebhookIgnoredResponse,
    WebhookNoMatchResponse, WebhookTestResponse,
};
