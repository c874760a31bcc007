//! Authorization gate — pure decision primitives.
//!
//! The authentication gate (a valid session whose user still exists) is
//! enforced by the HTTP layer before either of these run; the functions here
//! only decide role/permission questions and run no side effects.

use thiserror::Error;

use warden_core::UserId;

use crate::permissions::{Permission, PermissionGrants};
use crate::roles::RoleName;

/// An authenticated caller: identity plus the role claimed by the session
/// token. The role is the issuance-time snapshot, not a live lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: RoleName,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: insufficient role")]
    RoleNotAllowed { role: String },

    #[error("forbidden: missing permission '{0}'")]
    MissingPermission(Permission),
}

/// Role gate: deny unless the caller's role name is in the allow-list.
///
/// Role names are compared as opaque strings — no hierarchy, no wildcard.
pub fn require_role(principal: &Principal, allowed: &[&str]) -> Result<(), AuthzError> {
    if allowed.contains(&principal.role.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::RoleNotAllowed {
            role: principal.role.as_str().to_string(),
        })
    }
}

/// Permission gate: deny unless the grant mapping carries the permission.
pub fn require_permission(
    grants: &PermissionGrants,
    required: Permission,
) -> Result<(), AuthzError> {
    if grants.grants(required) {
        Ok(())
    } else {
        Err(AuthzError::MissingPermission(required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: &str) -> Principal {
        Principal {
            user_id: UserId::new(),
            role: RoleName::new(role),
        }
    }

    #[test]
    fn role_in_allow_list_passes() {
        assert!(require_role(&principal("manager"), &["admin", "manager"]).is_ok());
    }

    #[test]
    fn role_outside_allow_list_is_denied() {
        let err = require_role(&principal("viewer"), &["admin"]).unwrap_err();
        assert_eq!(
            err,
            AuthzError::RoleNotAllowed {
                role: "viewer".into()
            }
        );
    }

    #[test]
    fn comparison_is_case_sensitive_and_exact() {
        assert!(require_role(&principal("Admin"), &["admin"]).is_err());
        assert!(require_role(&principal("admin"), &[]).is_err());
    }

    #[test]
    fn permission_gate_follows_the_grant_flag() {
        let grants = PermissionGrants::from_partial([("user:read", true)]);
        assert!(require_permission(&grants, Permission::UserRead).is_ok());
        assert_eq!(
            require_permission(&grants, Permission::UserDelete),
            Err(AuthzError::MissingPermission(Permission::UserDelete))
        );
    }
}
