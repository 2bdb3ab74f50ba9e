//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod artifact;
mod branch;
mod demo_config;
mod deployment;
mod project;

pub use access::{
    AccessSource, EffectiveAccess, Group, GroupMembership, GroupProjectGrant, ProjectRole,
    UserAccount, UserProjectGrant,
};
pub use artifact::ArtifactPath;
pub use branch::{BRANCH_NAME_MAX_LENGTH, BranchName, DEFAULT_BRANCH};
pub use demo_config::{
    DemoConfig, DemoConfigInput, DemoPath, DeploymentStatus, parse_sub_site_folders,
};
pub use deployment::{
    AuditOutcome, AuditStatus, DeploymentAudit, DeploymentAuditParts, DeploymentOutcome,
    DeploymentSummary, DeploymentTrigger, NO_MATCHING_CONFIGS_MESSAGE,
};
pub use project::Project;
