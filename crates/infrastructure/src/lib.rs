//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod filesystem_artifact_store;
mod git_site_synchronizer;
mod in_memory_permission_cache;
mod postgres_access_repository;
mod postgres_deployment_audit_repository;
mod postgres_project_repository;

pub use filesystem_artifact_store::FilesystemArtifactStore;
pub use git_site_synchronizer::{
    DEFAULT_GIT_COMMAND_TIMEOUT, GitSiteSynchronizer, GitSiteSynchronizerConfig,
};
pub use in_memory_permission_cache::{
    DEFAULT_PERMISSION_CACHE_CAPACITY, DEFAULT_PERMISSION_CACHE_TTL, InMemoryPermissionCache,
};
pub use postgres_access_repository::PostgresAccessRepository;
pub use postgres_deployment_audit_repository::PostgresDeploymentAuditRepository;
pub use postgres_project_repository::PostgresProjectRepository;
