use serde::{Deserialize, Serialize};

/// Role name used for RBAC.
///
/// Role names are opaque, case-sensitive strings at this layer; the gate
/// compares them verbatim against allow-lists — no hierarchy, no wildcard.
/// Users reference roles by name, not by foreign key, so a `RoleName` may
/// point at a role that no longer exists (a tolerated, orphaned state).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RoleName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
