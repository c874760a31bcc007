use warden_auth::{Principal, RoleName};
use warden_core::UserId;
use warden_store::User;

/// Authenticated caller context, threaded explicitly through the request
/// pipeline (inserted by the auth middleware, read by handlers).
///
/// Carries two things on purpose:
/// - the user record re-fetched at validation time (existence check, and
///   freshness for `/auth/me`), and
/// - the role claim from the token, which is what authorization uses — the
///   issuance-time snapshot, not the user's current role.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    user: User,
    token_role: RoleName,
}

impl CurrentUser {
    pub fn new(user: User, token_role: RoleName) -> Self {
        Self { user, token_role }
    }

    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn token_role(&self) -> &RoleName {
        &self.token_role
    }

    /// Principal for the authorization gate (token-role snapshot).
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user.id,
            role: self.token_role.clone(),
        }
    }
}
