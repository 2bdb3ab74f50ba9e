//! Application services and ports.

#![forbid(unsafe_code)]

mod access_ports;
mod access_service;
mod artifact_ports;
mod artifact_service;
mod deployment_ports;
mod deployment_service;
mod grant_service;
mod project_ports;

#[cfg(test)]
mod test_fakes;

pub use access_ports::{
    AccessRepository, GrantRepository, PermissionCache, PermissionCacheEntry,
    PermissionCacheStats,
};
pub use access_service::{AccessService, AuthorizedDemo};
pub use artifact_ports::{ArtifactFile, ArtifactStore};
pub use artifact_service::ArtifactService;
pub use deployment_ports::{
    AuditListQuery, AuditStatusCounts, DeploymentAuditRepository, SiteSynchronizer, SyncReport,
    SyncRequest, SyncStrategy,
};
pub use deployment_service::{
    AuditPage, AuditStats, DEFAULT_AUDIT_PAGE_SIZE, DEFAULT_MAX_CONCURRENT_DEPLOYMENTS,
    DEFAULT_STATS_WINDOW_DAYS, DeploymentService, MAX_AUDIT_PAGE_SIZE, ScheduledDeployment,
    WebhookDeployment,
};
pub use grant_service::GrantService;
pub use project_ports::{DeploymentStatusUpdate, ProjectRepository};
