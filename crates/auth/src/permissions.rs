//! Permission catalog and the complete per-role grant mapping.

use std::collections::BTreeMap;

use serde::de::{Deserializer, Error as _};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// The catalog is closed and fixed at build time. Every component that needs
/// a "complete" permission mapping iterates [`Permission::ALL`]; growing the
/// catalog therefore never requires a data migration — read paths default
/// absent keys to `false`.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Permission {
    #[serde(rename = "user:create")]
    UserCreate,
    #[serde(rename = "user:read")]
    UserRead,
    #[serde(rename = "user:update")]
    UserUpdate,
    #[serde(rename = "user:delete")]
    UserDelete,
    #[serde(rename = "role:create")]
    RoleCreate,
    #[serde(rename = "role:read")]
    RoleRead,
    #[serde(rename = "role:update")]
    RoleUpdate,
    #[serde(rename = "role:delete")]
    RoleDelete,
}

impl Permission {
    /// The full catalog, in canonical order.
    pub const ALL: [Permission; 8] = [
        Permission::UserCreate,
        Permission::UserRead,
        Permission::UserUpdate,
        Permission::UserDelete,
        Permission::RoleCreate,
        Permission::RoleRead,
        Permission::RoleUpdate,
        Permission::RoleDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UserCreate => "user:create",
            Permission::UserRead => "user:read",
            Permission::UserUpdate => "user:update",
            Permission::UserDelete => "user:delete",
            Permission::RoleCreate => "role:create",
            Permission::RoleRead => "role:read",
            Permission::RoleUpdate => "role:update",
            Permission::RoleDelete => "role:delete",
        }
    }

    /// Parse a catalog permission by name. Returns `None` for anything
    /// outside the catalog.
    pub fn parse(name: &str) -> Option<Permission> {
        Permission::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total mapping from every catalog permission to a boolean grant flag.
///
/// # Invariants
/// - The mapping is always *complete*: one explicit entry per catalog
///   permission. Constructors fill unlisted permissions with `false`.
/// - Input keys outside the catalog are ignored (tolerates forward/backward
///   catalog skew between client and server).
/// - Merging only touches provided keys and never removes entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrants(BTreeMap<Permission, bool>);

impl PermissionGrants {
    /// Complete mapping with every permission denied.
    pub fn none() -> Self {
        Self(Permission::ALL.into_iter().map(|p| (p, false)).collect())
    }

    /// Complete mapping with every permission granted.
    pub fn all() -> Self {
        Self(Permission::ALL.into_iter().map(|p| (p, true)).collect())
    }

    /// Normalize a partial key/flag listing into a complete mapping.
    ///
    /// Unlisted catalog permissions become `false`; keys outside the catalog
    /// are dropped.
    pub fn from_partial<'a, I>(partial: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut grants = Self::none();
        grants.merge_partial(partial);
        grants
    }

    /// Merge only the provided keys into the existing complete mapping.
    ///
    /// Keys outside the catalog are dropped; absent keys keep their current
    /// value. The mapping stays complete.
    pub fn merge_partial<'a, I>(&mut self, partial: I)
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        for (name, granted) in partial {
            if let Some(p) = Permission::parse(name) {
                self.0.insert(p, granted);
            }
        }
        debug_assert!(self.is_complete());
    }

    /// Whether the given permission is granted.
    pub fn grants(&self, permission: Permission) -> bool {
        self.0.get(&permission).copied().unwrap_or(false)
    }

    pub fn set(&mut self, permission: Permission, granted: bool) {
        self.0.insert(permission, granted);
    }

    /// Exactly one entry per catalog permission.
    pub fn is_complete(&self) -> bool {
        self.0.len() == Permission::ALL.len()
            && Permission::ALL.iter().all(|p| self.0.contains_key(p))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Permission, bool)> + '_ {
        self.0.iter().map(|(p, g)| (*p, *g))
    }
}

impl Default for PermissionGrants {
    fn default() -> Self {
        Self::none()
    }
}

impl Serialize for PermissionGrants {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for PermissionGrants {
    /// Reads any string→bool map, keeping catalog keys and defaulting the
    /// rest of the catalog to `false`. Non-catalog keys are ignored so stored
    /// mappings written under an older catalog still load.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut grants = PermissionGrants::none();
        for (name, value) in &raw {
            if let Some(p) = Permission::parse(name) {
                let flag = value
                    .as_bool()
                    .ok_or_else(|| D::Error::custom(format!("permission '{name}' must be a boolean")))?;
                grants.set(p, flag);
            }
        }
        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_partial_fills_unlisted_with_false() {
        let grants = PermissionGrants::from_partial([("user:read", true)]);
        assert!(grants.grants(Permission::UserRead));
        for p in Permission::ALL {
            if p != Permission::UserRead {
                assert!(!grants.grants(p), "{p} should default to false");
            }
        }
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let grants = PermissionGrants::from_partial([("tenant:admin", true), ("role:read", true)]);
        assert!(grants.is_complete());
        assert!(grants.grants(Permission::RoleRead));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut grants = PermissionGrants::from_partial([("user:delete", true)]);
        let once = {
            let mut g = grants.clone();
            g.merge_partial([("user:read", true)]);
            g
        };
        grants.merge_partial([("user:read", true)]);
        grants.merge_partial([("user:read", true)]);
        assert_eq!(grants, once);
    }

    #[test]
    fn merge_never_removes_entries() {
        let mut grants = PermissionGrants::all();
        grants.merge_partial([("user:read", false)]);
        assert!(grants.is_complete());
        assert!(!grants.grants(Permission::UserRead));
        assert!(grants.grants(Permission::UserDelete));
    }

    #[test]
    fn json_shape_is_one_entry_per_catalog_permission() {
        let json = serde_json::to_value(PermissionGrants::from_partial([("role:create", true)]))
            .unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), Permission::ALL.len());
        assert_eq!(obj["role:create"], true);
        assert_eq!(obj["user:create"], false);
    }

    #[test]
    fn deserialize_tolerates_skew() {
        let grants: PermissionGrants =
            serde_json::from_str(r#"{"user:read": true, "report:export": true}"#).unwrap();
        assert!(grants.is_complete());
        assert!(grants.grants(Permission::UserRead));
    }

    #[test]
    fn deserialize_rejects_non_boolean_flags() {
        let res = serde_json::from_str::<PermissionGrants>(r#"{"user:read": "yes"}"#);
        assert!(res.is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: normalization always yields a complete mapping, no
            /// matter what keys the input carries.
            #[test]
            fn normalization_is_always_complete(
                keys in proptest::collection::vec("[a-z:]{1,16}", 0..16),
                flags in proptest::collection::vec(any::<bool>(), 16),
            ) {
                let partial: Vec<(&str, bool)> = keys
                    .iter()
                    .zip(flags.iter())
                    .map(|(k, f)| (k.as_str(), *f))
                    .collect();
                let grants = PermissionGrants::from_partial(partial);
                prop_assert!(grants.is_complete());
            }

            /// Property: merging a partial twice equals merging it once.
            #[test]
            fn merge_twice_equals_merge_once(
                granted in any::<bool>(),
                idx in 0usize..Permission::ALL.len(),
            ) {
                let name = Permission::ALL[idx].as_str();
                let mut once = PermissionGrants::none();
                once.merge_partial([(name, granted)]);
                let mut twice = PermissionGrants::none();
                twice.merge_partial([(name, granted)]);
                twice.merge_partial([(name, granted)]);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
