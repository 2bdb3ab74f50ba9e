use std::sync::Arc;

use demodeck_application::{
    AccessService, ArtifactService, DeploymentService, GrantService, PermissionCache,
};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub deployment_service: DeploymentService,
    pub access_service: AccessService,
    pub artifact_service: ArtifactService,
    pub grant_service: GrantService,
    pub permission_cache: Arc<dyn PermissionCache>,
    pub postgres_pool: PgPool,
    pub webhook_secret: Arc<str>,
}
