use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use demodeck_application::{AccessRepository, GrantRepository};
use demodeck_core::{AppError, AppResult, GroupId, ProjectId, UserId};
use demodeck_domain::{
    Group, GroupMembership, GroupProjectGrant, ProjectRole, UserAccount, UserProjectGrant,
};


/// PostgreSQL-backed grant graph.
#[derive(Clone)]
pub struct PostgresAccessRepository {
    pool: PgPool,
}

impl PostgresAccessRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: uuid::Uuid,
    username: String,
    is_global_admin: bool,
}

#[derive(Debug, FromRow)]
struct GroupRow {
    id: uuid::Uuid,
    name: String,
    is_admin_group: bool,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct UserGrantRow {
    user_id: uuid::Uuid,
    project_id: uuid::Uuid,
    role: String,
}

#[derive(Debug, FromRow)]
struct GroupGrantRow {
    group_id: uuid::Uuid,
    project_id: uuid::Uuid,
    role: String,
}

#[async_trait]
impl AccessRepository for PostgresAccessRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, is_global_admin
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user: {error}")))?;

        row.map(|row| {
            UserAccount::new(UserId::from_uuid(row.id), row.username, row.is_global_admin)
        })
        .transpose()
    }

    async fn list_user_groups(&self, user_id: UserId) -> AppResult<Vec<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT g.id, g.name, g.is_admin_group, g.is_active
            FROM groups g
            INNER JOIN group_memberships gm ON gm.group_id = g.id
            WHERE gm.user_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user groups: {error}")))?;

        rows.into_iter()
            .map(|row| {
                Group::new(
                    GroupId::from_uuid(row.id),
                    row.name,
                    row.is_admin_group,
                    row.is_active,
                )
            })
            .collect()
    }

    async fn list_user_project_grants(&self, user_id: UserId) -> AppResult<Vec<UserProjectGrant>> {
        let rows = sqlx::query_as::<_, UserGrantRow>(
            r#"
            SELECT user_id, project_id, role
            FROM user_project_grants
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list user project grants: {error}"))
        })?;

        rows.into_iter()
            .map(|row| {
                Ok(UserProjectGrant {
                    user_id: UserId::from_uuid(row.user_id),
                    project_id: ProjectId::from_uuid(row.project_id),
                    role: ProjectRole::parse(row.role.as_str())?,
                })
            })
            .collect()
    }

    async fn list_group_project_grants(
        &self,
        group_ids: &[GroupId],
        project_id: Option<ProjectId>,
    ) -> AppResult<Vec<GroupProjectGrant>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let group_ids: Vec<uuid::Uuid> = group_ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, GroupGrantRow>(
            r#"
            SELECT group_id, project_id, role
            FROM group_project_grants
            WHERE group_id = ANY($1)
                AND ($2::UUID IS NULL OR project_id = $2)
            "#,
        )
        .bind(group_ids)
        .bind(project_id.map(|project_id| project_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list group project grants: {error}"))
        })?;

        rows.into_iter()
            .map(|row| {
                Ok(GroupProjectGrant {
                    group_id: GroupId::from_uuid(row.group_id),
                    project_id: ProjectId::from_uuid(row.project_id),
                    role: ProjectRole::parse(row.role.as_str())?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl GrantRepository for PostgresAccessRepository {
    async fn upsert_user_project_grant(&self, grant: UserProjectGrant) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_project_grants (user_id, project_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, project_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(grant.user_id.as_uuid())
        .bind(grant.project_id.as_uuid())
        .bind(grant.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to save user project grant: {error}"))
        })?;

        Ok(())
    }

    async fn delete_user_project_grant(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM user_project_grants
            WHERE user_id = $1 AND project_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(project_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete user project grant: {error}"))
        })?;

        Ok(())
    }

    async fn upsert_group_membership(&self, membership: GroupMembership) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO group_memberships (user_id, group_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, group_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(membership.user_id.as_uuid())
        .bind(membership.group_id.as_uuid())
        .bind(membership.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to save group membership: {error}"))
        })?;

        Ok(())
    }

    async fn delete_group_membership(&self, user_id: UserId, group_id: GroupId) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM group_memberships
            WHERE user_id = $1 AND group_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(group_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete group membership: {error}"))
        })?;

        Ok(())
    }

    async fn upsert_group_project_grant(&self, grant: GroupProjectGrant) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO group_project_grants (group_id, project_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id, project_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(grant.group_id.as_uuid())
        .bind(grant.project_id.as_uuid())
        .bind(grant.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to save group project grant: {error}"))
        })?;

        Ok(())
    }

    async fn delete_group_project_grant(
        &self,
        group_id: GroupId,
        project_id: ProjectId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM group_project_grants
            WHERE group_id = $1 AND project_id = $2
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(project_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete group project grant: {error}"))
        })?;

        Ok(())
    }
}
