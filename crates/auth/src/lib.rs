//! `warden-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the
//! permission catalog, the complete role permission mapping, password
//! hashing, session tokens, and the authorization gate all live here as
//! plain functions and types.

pub mod config;
pub mod gate;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod token;

pub use config::TokenConfig;
pub use gate::{AuthzError, Principal, require_permission, require_role};
pub use password::{PasswordError, hash_password, verify_password};
pub use permissions::{Permission, PermissionGrants};
pub use roles::RoleName;
pub use token::{Hs256TokenCodec, SessionClaims, TokenError, TokenValidator};
