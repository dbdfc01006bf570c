//! Permission flags and checks.

use std::ops::BitOr;

use crate::finalizer::UserIdentity;

/// A set of permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permission(u64);

impl Permission {
    pub const NONE: Permission = Permission(0);
    /// See other users' display names in structured output.
    pub const VIEW_DISPLAYNAME: Permission = Permission(1 << 0);
    pub const ALL: Permission = Permission(u64::MAX);

    pub const fn from_bits(bits: u64) -> Self {
        Permission(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn contains(self, other: Permission) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Permission {
    type Output = Permission;

    fn bitor(self, rhs: Permission) -> Permission {
        Permission(self.0 | rhs.0)
    }
}

/// Decides whether a user holds a permission. Absent users hold none.
pub trait PermissionCheck: Send + Sync {
    fn has_permission(&self, user: Option<&UserIdentity>, permission: Permission) -> bool;
}

/// Checks the permission bits carried by the identity itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPermissions;

impl PermissionCheck for IdentityPermissions {
    fn has_permission(&self, user: Option<&UserIdentity>, permission: Permission) -> bool {
        user.is_some_and(|u| u.permissions().contains(permission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let set = Permission::VIEW_DISPLAYNAME | Permission::from_bits(1 << 4);
        assert!(set.contains(Permission::VIEW_DISPLAYNAME));
        assert!(!Permission::NONE.contains(Permission::VIEW_DISPLAYNAME));
        assert!(Permission::ALL.contains(set));
    }

    #[test]
    fn test_identity_permissions() {
        let check = IdentityPermissions;
        let admin = UserIdentity::new(1, "root").with_permissions(Permission::ALL);
        let guest = UserIdentity::new(0, "guest");

        assert!(check.has_permission(Some(&admin), Permission::VIEW_DISPLAYNAME));
        assert!(!check.has_permission(Some(&guest), Permission::VIEW_DISPLAYNAME));
        assert!(!check.has_permission(None, Permission::VIEW_DISPLAYNAME));
    }
}
