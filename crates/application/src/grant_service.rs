use std::sync::Arc;

use demodeck_core::{AppResult, GroupId, ProjectId, UserId};
use demodeck_domain::{GroupMembership, GroupProjectGrant, ProjectRole, UserProjectGrant};
use tracing::{info, warn};

use crate::access_ports::{GrantRepository, PermissionCache};


/// Cache scope touched by a grant mutation.
#[derive(Debug, Clone, Copy)]
enum Invalidation {
    Project(ProjectId),
    User(UserId),
}

/// The only write path for grants.
///
/// Every mutation invalidates the permission cache before returning, whether the write
/// succeeded or not.
#[derive(Clone)]
pub struct GrantService {
    repository: Arc<dyn GrantRepository>,
    cache: Arc<dyn PermissionCache>,
}

impl GrantService {
    /// Creates a new grant service.
    #[must_use]
    pub fn new(repository: Arc<dyn GrantRepository>, cache: Arc<dyn PermissionCache>) -> Self {
        Self { repository, cache }
    }

    /// Grants or updates a direct project role.
    pub async fn grant_project_role(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        role: ProjectRole,
    ) -> AppResult<()> {
        let result = self
            .repository
            .upsert_user_project_grant(UserProjectGrant {
                user_id,
                project_id,
                role,
            })
            .await;
        self.finish(result, Invalidation::Project(project_id), "grant_project_role")
            .await
    }

    /// Revokes a direct project role.
    pub async fn revoke_project_role(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> AppResult<()> {
        let result = self
            .repository
            .delete_user_project_grant(user_id, project_id)
            .await;
        self.finish(result, Invalidation::Project(project_id), "revoke_project_role")
            .await
    }

    /// Adds a user to a group.
    pub async fn add_group_member(
        &self,
        user_id: UserId,
        group_id: GroupId,
        role: ProjectRole,
    ) -> AppResult<()> {
        let result = self
            .repository
            .upsert_group_membership(GroupMembership {
                user_id,
                group_id,
                role,
            })
            .await;
        self.finish(result, Invalidation::User(user_id), "add_group_member")
            .await
    }

    /// Removes a user from a group.
    pub async fn remove_group_member(&self, user_id: UserId, group_id: GroupId) -> AppResult<()> {
        let result = self
            .repository
            .delete_group_membership(user_id, group_id)
            .await;
        self.finish(result, Invalidation::User(user_id), "remove_group_member")
            .await
    }

    /// Grants or updates a group's project role.
    pub async fn grant_group_project_role(
        &self,
        group_id: GroupId,
        project_id: ProjectId,
        role: ProjectRole,
    ) -> AppResult<()> {
        let result = self
            .repository
            .upsert_group_project_grant(GroupProjectGrant {
                group_id,
                project_id,
                role,
            })
            .await;
        self.finish(
            result,
            Invalidation::Project(project_id),
            "grant_group_project_role",
        )
        .await
    }

    /// Revokes a group's project role.
    pub async fn revoke_group_project_role(
        &self,
        group_id: GroupId,
        project_id: ProjectId,
    ) -> AppResult<()> {
        let result = self
            .repository
            .delete_group_project_grant(group_id, project_id)
            .await;
        self.finish(
            result,
            Invalidation::Project(project_id),
            "revoke_group_project_role",
        )
        .await
    }

    async fn finish(
        &self,
        result: AppResult<()>,
        scope: Invalidation,
        operation: &'static str,
    ) -> AppResult<()> {
        let invalidated = match scope {
            Invalidation::Project(project_id) => self.cache.invalidate_project(project_id).await,
            Invalidation::User(user_id) => self.cache.invalidate_user(user_id).await,
        };

        if let Err(error) = invalidated {
            // A stale decision would outlive the grant change, so drop everything.
            warn!(operation, ?scope, error = %error, "targeted invalidation failed");
            self.cache.clear().await?;
            return result;
        }

        match &result {
            Ok(()) => info!(operation, ?scope, "grant changed and permission cache invalidated"),
            Err(error) => warn!(operation, ?scope, error = %error, "grant mutation failed"),
        }
        result
    }
}
