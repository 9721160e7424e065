// security/src/roles.rs

use serde::{Deserialize, Serialize};

use models::errors::{ClinicError, ClinicResult};
use models::medical::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Create, update and delete doctors, patients, appointments and checkups.
    ManageRecords,
    /// Read patient and appointment records.
    ReadRecords,
    /// Take part in a support chat.
    Chat,
    /// See every chat addressed to the account.
    ManageChats,
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ManageRecords,
    Permission::ReadRecords,
    Permission::Chat,
    Permission::ManageChats,
];

const PATIENT_PERMISSIONS: &[Permission] = &[Permission::Chat];

/// Permission lookup for the account roles.
pub trait RolePermissions {
    fn permissions(self) -> &'static [Permission];

    fn has_permission(self, permission: Permission) -> bool;
}

impl RolePermissions for Role {
    fn permissions(self) -> &'static [Permission] {
        match self {
            Role::Admin => ADMIN_PERMISSIONS,
            Role::Patient => PATIENT_PERMISSIONS,
        }
    }

    fn has_permission(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

pub fn require_permission(role: Role, permission: Permission) -> ClinicResult<()> {
    if role.has_permission(permission) {
        Ok(())
    } else {
        Err(ClinicError::Forbidden(format!("{:?} role lacks {:?}", role, permission)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_can_do_everything() {
        for permission in ADMIN_PERMISSIONS {
            assert!(Role::Admin.has_permission(*permission));
        }
    }

    #[test]
    fn patients_only_chat() {
        assert!(Role::Patient.has_permission(Permission::Chat));
        assert!(!Role::Patient.has_permission(Permission::ReadRecords));
        assert!(matches!(
            require_permission(Role::Patient, Permission::ManageRecords),
            Err(ClinicError::Forbidden(_))
        ));
        assert!(require_permission(Role::Admin, Permission::ManageRecords).is_ok());
    }
}
