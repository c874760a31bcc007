//! `warden-store` — persistence layer: domain records, store contracts,
//! and their implementations.
//!
//! Uniqueness invariants (role name, user email) are enforced *here*, with
//! atomic check-and-insert semantics: the in-memory stores check and write
//! under a single lock acquisition, the Postgres stores lean on unique
//! indexes. Callers treat any prior existence probe as best-effort only.

pub mod audit;
pub mod memory;
pub mod model;
pub mod repository;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use audit::AuditSink;
pub use memory::{InMemoryAuditStore, InMemoryRoleStore, InMemoryUserStore};
pub use model::{
    AuditEntry, NewAuditEntry, NewRole, NewUser, Role, RolePatch, User, UserPatch, UserStats,
    UserStatus,
};
pub use repository::{AuditStore, RoleStore, UserStore};
