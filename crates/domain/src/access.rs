use std::str::FromStr;

use demodeck_core::{AppError, AppResult, GroupId, NonEmptyString, ProjectId, UserId};
use serde::{Deserialize, Serialize};

/// Role a principal holds on a project. Variants are ordered by rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    /// May view published demos.
    Viewer,
    /// May view demos and trigger deployments.
    Editor,
    /// Full control over the project.
    Admin,
}

impl ProjectRole {
    /// Returns the numeric rank used for comparisons.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Viewer => 1,
            Self::Editor => 2,
            Self::Admin => 3,
        }
    }

    /// Returns whether this role satisfies `required`.
    #[must_use]
    pub fn satisfies(&self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }

    /// Parses a stored role value.
    pub fn parse(value: &str) -> AppResult<Self> {
        Self::from_str(value)
    }
}

impl FromStr for ProjectRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            _ => Err(AppError::Validation(format!(
                "unknown project role '{value}'"
            ))),
        }
    }
}

/// Read-only projection of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    id: UserId,
    username: NonEmptyString,
    is_global_admin: bool,
}

impl UserAccount {
    /// Creates a user account projection.
    pub fn new(id: UserId, username: impl Into<String>, is_global_admin: bool) -> AppResult<Self> {
        Ok(Self {
            id,
            username: NonEmptyString::new(username)?,
            is_global_admin,
        })
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the login name.
    #[must_use]
    pub fn username(&self) -> &NonEmptyString {
        &self.username
    }

    /// Returns whether the user is a global administrator.
    #[must_use]
    pub fn is_global_admin(&self) -> bool {
        self.is_global_admin
    }
}

/// Read-only projection of a user group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,
    name: NonEmptyString,
    is_admin_group: bool,
    is_active: bool,
}

impl Group {
    /// Creates a group projection.
    pub fn new(
        id: GroupId,
        name: impl Into<String>,
        is_admin_group: bool,
        is_active: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            is_admin_group,
            is_active,
        })
    }

    /// Returns the group identifier.
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns whether membership confers access to every active project.
    #[must_use]
    pub fn is_admin_group(&self) -> bool {
        self.is_admin_group
    }

    /// Returns whether the group is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Direct user grant on one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProjectGrant {
    /// Granted user.
    pub user_id: UserId,
    /// Target project.
    pub project_id: ProjectId,
    /// Granted role.
    pub role: ProjectRole,
}

/// Membership of a user in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Member user.
    pub user_id: UserId,
    /// Target group.
    pub group_id: GroupId,
    /// Role inside the group. Project access is decided by the group's project grants.
    pub role: ProjectRole,
}

/// Group grant on one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProjectGrant {
    /// Granted group.
    pub group_id: GroupId,
    /// Target project.
    pub project_id: ProjectId,
    /// Granted role.
    pub role: ProjectRole,
}

/// Where an effective role came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSource {
    /// The principal is a global administrator.
    GlobalAdmin,
    /// The principal belongs to an admin group.
    AdminGroup,
    /// A direct user grant.
    DirectGrant,
    /// A grant held by one of the principal's groups.
    GroupGrant,
}

/// Effective role of a principal on one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveAccess {
    /// Highest role across every grant path.
    pub role: ProjectRole,
    /// Grant path that produced `role`.
    pub source: AccessSource,
}

impl EffectiveAccess {
    /// Keeps the higher of two candidate roles. Ties keep `self`.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if other.role > self.role { other } else { self }
    }
}
