use serde::{Deserialize, Serialize};

use crate::UserId;

/// User information persisted in the authenticated session.
///
/// Sessions are written by the login collaborator; this core only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: UserId,
    username: String,
    is_global_admin: bool,
}

impl UserIdentity {
    /// Creates a user identity from session data.
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>, is_global_admin: bool) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_global_admin,
        }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the login name for the current user.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Returns whether the session was issued to a global administrator.
    #[must_use]
    pub fn is_global_admin(&self) -> bool {
        self.is_global_admin
    }
}
