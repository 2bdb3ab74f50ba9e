use async_trait::async_trait;
use serde::Serialize;

use demodeck_core::{AppResult, GroupId, ProjectId, UserId};
use demodeck_domain::{
    Group, GroupMembership, GroupProjectGrant, UserAccount, UserProjectGrant,
};

/// Read access to the grant graph.
#[async_trait]
pub trait AccessRepository: Send + Sync {
    /// Finds a user account.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserAccount>>;

    /// Lists every group the user is a member of, active or not.
    async fn list_user_groups(&self, user_id: UserId) -> AppResult<Vec<Group>>;

    /// Lists direct project grants held by a user.
    async fn list_user_project_grants(&self, user_id: UserId) -> AppResult<Vec<UserProjectGrant>>;

    /// Lists project grants held by any of the given groups, optionally for one project.
    async fn list_group_project_grants(
        &self,
        group_ids: &[GroupId],
        project_id: Option<ProjectId>,
    ) -> AppResult<Vec<GroupProjectGrant>>;
}

/// Grant mutations. Only [`crate::GrantService`] should call these.
#[async_trait]
pub trait GrantRepository: Send + Sync {
    /// Creates or updates a direct user grant.
    async fn upsert_user_project_grant(&self, grant: UserProjectGrant) -> AppResult<()>;

    /// Removes a direct user grant.
    async fn delete_user_project_grant(&self, user_id: UserId, project_id: ProjectId)
    -> AppResult<()>;

    /// Creates or updates a group membership.
    async fn upsert_group_membership(&self, membership: GroupMembership) -> AppResult<()>;

    /// Removes a group membership.
    async fn delete_group_membership(&self, user_id: UserId, group_id: GroupId) -> AppResult<()>;

    /// Creates or updates a group grant.
    async fn upsert_group_project_grant(&self, grant: GroupProjectGrant) -> AppResult<()>;

    /// Removes a group grant.
    async fn delete_group_project_grant(
        &self,
        group_id: GroupId,
        project_id: ProjectId,
    ) -> AppResult<()>;
}

/// Size and configuration of the permission cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionCacheStats {
    /// Live entry count.
    pub size: usize,
    /// Maximum entry count before eviction.
    pub capacity: usize,
    /// Entry lifetime in seconds.
    pub ttl_seconds: u64,
}

/// One cached decision, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionCacheEntry {
    /// Cached project.
    pub project_id: ProjectId,
    /// Cached user.
    pub user_id: UserId,
    /// Cached viewer decision.
    pub allowed: bool,
    /// Milliseconds since the decision was written.
    pub age_ms: u64,
}

/// Bounded memo of viewer access decisions keyed by (project, user).
///
/// Writers read [`PermissionCache::generation`] before computing a decision and hand it
/// back to [`PermissionCache::set`]. Every invalidation advances the generation, so a
/// decision computed before a grant change is never stored after it.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Returns a live cached decision.
    async fn get(&self, project_id: ProjectId, user_id: UserId) -> AppResult<Option<bool>>;

    /// Returns the current invalidation generation.
    async fn generation(&self) -> AppResult<u64>;

    /// Stores a decision computed at `generation`.
    ///
    /// Returns `false` without storing when an invalidation happened since.
    async fn set(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        allowed: bool,
        generation: u64,
    ) -> AppResult<bool>;

    /// Drops every entry for a project and advances the generation.
    async fn invalidate_project(&self, project_id: ProjectId) -> AppResult<()>;

    /// Drops every entry for a user and advances the generation.
    async fn invalidate_user(&self, user_id: UserId) -> AppResult<()>;

    /// Drops every entry and advances the generation.
    async fn clear(&self) -> AppResult<()>;

    /// Returns size and configuration.
    async fn stats(&self) -> AppResult<PermissionCacheStats>;

    /// Lists live entries.
    async fn entries(&self) -> AppResult<Vec<PermissionCacheEntry>>;
}
