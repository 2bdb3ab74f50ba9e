use std::sync::Arc;

use demodeck_application::{
    AccessService, ArtifactService, DeploymentService, GrantService, PermissionCache,
};
use demodeck_infrastructure::{
    FilesystemArtifactStore, GitSiteSynchronizer, GitSiteSynchronizerConfig,
    InMemoryPermissionCache, PostgresAccessRepository, PostgresDeploymentAuditRepository,
    PostgresProjectRepository,
};
use sqlx::PgPool;
use tracing::info;

use crate::api_config::ApiConfig;
use crate::state::AppState;

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> AppState {
    let project_repository = Arc::new(PostgresProjectRepository::new(pool.clone()));
    let access_repository = Arc::new(PostgresAccessRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresDeploymentAuditRepository::new(pool.clone()));

    let permission_cache: Arc<dyn PermissionCache> = Arc::new(InMemoryPermissionCache::new(
        config.permission_cache_ttl,
        config.permission_cache_capacity,
    ));

    let synchronizer = Arc::new(GitSiteSynchronizer::new(GitSiteSynchronizerConfig {
        workspace_root: config.workspace_root.clone(),
        static_root: config.static_root.clone(),
        ssh_private_key_path: config.ssh_private_key_path.clone(),
        command_timeout: config.git_command_timeout,
    }));
    let artifact_store = Arc::new(FilesystemArtifactStore::new(config.static_root.clone()));

    let access_service = AccessService::new(
        project_repository.clone(),
        access_repository.clone(),
        permission_cache.clone(),
    );
    let artifact_service = ArtifactService::new(access_service.clone(), artifact_store);
    let deployment_service = DeploymentService::new(
        project_repository,
        audit_repository,
        synchronizer,
        config.max_concurrent_deployments,
    );
    let grant_service = GrantService::new(access_repository, permission_cache.clone());

    info!(
        static_root = %config.static_root.display(),
        workspace_root = %config.workspace_root.display(),
        max_concurrent_deployments = config.max_concurrent_deployments,
        "deployment services configured"
    );

    AppState {
        deployment_service,
        access_service,
        artifact_service,
        grant_service,
        permission_cache,
        postgres_pool: pool,
        webhook_secret: Arc::from(config.webhook_secret.as_str()),
    }
}
