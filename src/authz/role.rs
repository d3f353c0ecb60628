use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The closed set of user roles.
///
/// Adding a role means adding a variant here; every `match` over `Role` in the
/// crate is exhaustive, so the compiler points at each place that needs a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Admin,
    Head,
    SubHead,
    Manager,
    DataCollector,
    Converter,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Head,
        Role::SubHead,
        Role::Manager,
        Role::DataCollector,
        Role::Converter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Head => "Head",
            Role::SubHead => "SubHead",
            Role::Manager => "Manager",
            Role::DataCollector => "DataCollector",
            Role::Converter => "Converter",
        }
    }

    /// Lenient parse used at trust boundaries: anything unrecognized is `None`,
    /// which the catalog resolves to an all-false vector.
    pub fn parse(value: &str) -> Option<Role> {
        value.parse().ok()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// A single named boolean permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    CanRead,
    CanReadFinalized,
    CanCreate,
    CanEdit,
    CanDelete,
    CanAssignTasks,
    CanUpdateOwnTasks,
    CanUpdateAllTasks,
    CanFinalize,
    CanEditFinalized,
    CanManageUsers,
    CanComment,
    CanManageCustomFields,
}

impl Capability {
    pub const ALL: [Capability; 13] = [
        Capability::CanRead,
        Capability::CanReadFinalized,
        Capability::CanCreate,
        Capability::CanEdit,
        Capability::CanDelete,
        Capability::CanAssignTasks,
        Capability::CanUpdateOwnTasks,
        Capability::CanUpdateAllTasks,
        Capability::CanFinalize,
        Capability::CanEditFinalized,
        Capability::CanManageUsers,
        Capability::CanComment,
        Capability::CanManageCustomFields,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::CanRead => "canRead",
            Capability::CanReadFinalized => "canReadFinalized",
            Capability::CanCreate => "canCreate",
            Capability::CanEdit => "canEdit",
            Capability::CanDelete => "canDelete",
            Capability::CanAssignTasks => "canAssignTasks",
            Capability::CanUpdateOwnTasks => "canUpdateOwnTasks",
            Capability::CanUpdateAllTasks => "canUpdateAllTasks",
            Capability::CanFinalize => "canFinalize",
            Capability::CanEditFinalized => "canEditFinalized",
            Capability::CanManageUsers => "canManageUsers",
            Capability::CanComment => "canComment",
            Capability::CanManageCustomFields => "canManageCustomFields",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability: {0}")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|cap| cap.as_str() == s)
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// The full set of capabilities attached to one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionVector {
    pub can_read: bool,
    pub can_read_finalized: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_assign_tasks: bool,
    pub can_update_own_tasks: bool,
    pub can_update_all_tasks: bool,
    pub can_finalize: bool,
    pub can_edit_finalized: bool,
    pub can_manage_users: bool,
    pub can_comment: bool,
    pub can_manage_custom_fields: bool,
}

impl PermissionVector {
    pub const NONE: PermissionVector = PermissionVector {
        can_read: false,
        can_read_finalized: false,
        can_create: false,
        can_edit: false,
        can_delete: false,
        can_assign_tasks: false,
        can_update_own_tasks: false,
        can_update_all_tasks: false,
        can_finalize: false,
        can_edit_finalized: false,
        can_manage_users: false,
        can_comment: false,
        can_manage_custom_fields: false,
    };

    pub const FULL: PermissionVector = PermissionVector {
        can_read: true,
        can_read_finalized: true,
        can_create: true,
        can_edit: true,
        can_delete: true,
        can_assign_tasks: true,
        can_update_own_tasks: true,
        can_update_all_tasks: true,
        can_finalize: true,
        can_edit_finalized: true,
        can_manage_users: true,
        can_comment: true,
        can_manage_custom_fields: true,
    };

    pub fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::CanRead => self.can_read,
            Capability::CanReadFinalized => self.can_read_finalized,
            Capability::CanCreate => self.can_create,
            Capability::CanEdit => self.can_edit,
            Capability::CanDelete => self.can_delete,
            Capability::CanAssignTasks => self.can_assign_tasks,
            Capability::CanUpdateOwnTasks => self.can_update_own_tasks,
            Capability::CanUpdateAllTasks => self.can_update_all_tasks,
            Capability::CanFinalize => self.can_finalize,
            Capability::CanEditFinalized => self.can_edit_finalized,
            Capability::CanManageUsers => self.can_manage_users,
            Capability::CanComment => self.can_comment,
            Capability::CanManageCustomFields => self.can_manage_custom_fields,
        }
    }

    pub fn set(&mut self, capability: Capability, value: bool) {
        let slot = match capability {
            Capability::CanRead => &mut self.can_read,
            Capability::CanReadFinalized => &mut self.can_read_finalized,
            Capability::CanCreate => &mut self.can_create,
            Capability::CanEdit => &mut self.can_edit,
            Capability::CanDelete => &mut self.can_delete,
            Capability::CanAssignTasks => &mut self.can_assign_tasks,
            Capability::CanUpdateOwnTasks => &mut self.can_update_own_tasks,
            Capability::CanUpdateAllTasks => &mut self.can_update_all_tasks,
            Capability::CanFinalize => &mut self.can_finalize,
            Capability::CanEditFinalized => &mut self.can_edit_finalized,
            Capability::CanManageUsers => &mut self.can_manage_users,
            Capability::CanComment => &mut self.can_comment,
            Capability::CanManageCustomFields => &mut self.can_manage_custom_fields,
        };
        *slot = value;
    }

    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    /// True when none of the data-mutation capabilities is held.
    pub fn is_read_only(&self) -> bool {
        !self.can_edit && !self.can_create && !self.can_delete
    }

    pub fn granted(&self) -> Vec<Capability> {
        Capability::ALL.into_iter().filter(|cap| self.get(*cap)).collect()
    }
}

impl Default for PermissionVector {
    fn default() -> Self {
        Self::NONE
    }
}

/// Named role sets used for coarse route gating.
///
/// Membership is computed from a catalog's vectors (see `RoleGroup::admits`),
/// so the groups can never drift from the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleGroup {
    Managers,
    DataManagers,
    ReadOnlyWithComments,
    TaskWorkers,
    TaskAssigners,
    Finalizers,
    UserManagers,
    CustomFieldManagers,
    Administrators,
}

impl RoleGroup {
    pub const ALL: [RoleGroup; 9] = [
        RoleGroup::Managers,
        RoleGroup::DataManagers,
        RoleGroup::ReadOnlyWithComments,
        RoleGroup::TaskWorkers,
        RoleGroup::TaskAssigners,
        RoleGroup::Finalizers,
        RoleGroup::UserManagers,
        RoleGroup::CustomFieldManagers,
        RoleGroup::Administrators,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleGroup::Managers => "MANAGERS",
            RoleGroup::DataManagers => "DATA_MANAGERS",
            RoleGroup::ReadOnlyWithComments => "READ_ONLY_WITH_COMMENTS",
            RoleGroup::TaskWorkers => "TASK_WORKERS",
            RoleGroup::TaskAssigners => "TASK_ASSIGNERS",
            RoleGroup::Finalizers => "FINALIZERS",
            RoleGroup::UserManagers => "USER_MANAGERS",
            RoleGroup::CustomFieldManagers => "CUSTOM_FIELD_MANAGERS",
            RoleGroup::Administrators => "ADMINISTRATORS",
        }
    }

    /// Whether a role holding `vector` belongs to this group.
    pub fn admits(&self, vector: &PermissionVector) -> bool {
        match self {
            RoleGroup::Managers => vector.can_assign_tasks && vector.can_manage_users,
            RoleGroup::DataManagers => vector.can_create && vector.can_edit && vector.can_delete,
            RoleGroup::ReadOnlyWithComments => vector.can_comment && vector.is_read_only(),
            RoleGroup::TaskWorkers => vector.can_update_own_tasks && !vector.can_update_all_tasks,
            RoleGroup::TaskAssigners => vector.can_assign_tasks,
            RoleGroup::Finalizers => vector.can_finalize,
            RoleGroup::UserManagers => vector.can_manage_users,
            RoleGroup::CustomFieldManagers => vector.can_manage_custom_fields,
            RoleGroup::Administrators => vector.is_full(),
        }
    }
}

impl fmt::Display for RoleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip_and_unknown_is_rejected() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!(Role::parse("SuperAdmin"), None);
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn capability_serde_uses_camel_case_names() {
        for cap in Capability::ALL {
            let json = serde_json::to_value(cap).unwrap();
            assert_eq!(json, serde_json::Value::String(cap.as_str().to_string()));
        }
        assert!("canDoAnything".parse::<Capability>().is_err());
    }

    #[test]
    fn set_and_get_touch_the_same_field() {
        for cap in Capability::ALL {
            let mut vector = PermissionVector::NONE;
            vector.set(cap, true);
            assert!(vector.get(cap));
            assert_eq!(vector.granted(), vec![cap]);
        }
    }

    #[test]
    fn vector_json_field_names_match_capability_names() {
        let json = serde_json::to_value(PermissionVector::FULL).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), Capability::ALL.len());
        for cap in Capability::ALL {
            assert_eq!(obj.get(cap.as_str()), Some(&serde_json::Value::Bool(true)));
        }
    }
}
