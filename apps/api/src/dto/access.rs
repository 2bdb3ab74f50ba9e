use demodeck_application::{PermissionCacheEntry, PermissionCacheStats};
use demodeck_domain::Project;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Project visible to the current user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/accessible-project-response.ts"
)]
pub struct AccessibleProjectResponse {
    pub id: String,
    pub name: String,
    pub repository_url: String,
    pub repository_full_name: String,
}

impl From<Project> for AccessibleProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id().to_string(),
            name: project.name().as_str().to_owned(),
            repository_url: project.repository_url().as_str().to_owned(),
            repository_full_name: project.repository_full_name().as_str().to_owned(),
        }
    }
}

/// Incoming role for a grant or membership.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/grant-role-request.ts"
)]
pub struct GrantRoleRequest {
    pub role: String,
}

/// Permission cache size and configuration.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-cache-stats-response.ts"
)]
pub struct PermissionCacheStatsResponse {
    pub size: usize,
    pub capacity: usize,
    #[ts(type = "number")]
    pub ttl_seconds: u64,
}

impl From<PermissionCacheStats> for PermissionCacheStatsResponse {
    fn from(stats: PermissionCacheStats) -> Self {
        Self {
            size: stats.size,
            capacity: stats.capacity,
            ttl_seconds: stats.ttl_seconds,
        }
    }
}

/// One cached access decision.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-cache-entry-response.ts"
)]
pub struct PermissionCacheEntryResponse {
    pub project_id: String,
    pub user_id: String,
    pub allowed: bool,
    #[ts(type = "number")]
    pub age_ms: u64,
}

impl From<PermissionCacheEntry> for PermissionCacheEntryResponse {
    fn from(entry: PermissionCacheEntry) -> Self {
        Self {
            project_id: entry.project_id.to_string(),
            user_id: entry.user_id.to_string(),
            allowed: entry.allowed,
            age_ms: entry.age_ms,
        }
    }
}

/// Permission cache diagnostics.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-cache-response.ts"
)]
pub struct PermissionCacheResponse {
    pub stats: PermissionCacheStatsResponse,
    pub entries: Vec<PermissionCacheEntryResponse>,
}
