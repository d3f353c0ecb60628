use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::{CapabilityPatch, PermissionVector, Role, RoleCatalog, RoleGroup};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupMembership {
    pub group: RoleGroup,
    pub members: Vec<Role>,
}

/// The live permission matrix as served to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatrixResponse {
    pub version: u64,
    pub digest: String,
    #[schema(value_type = Object)]
    pub vectors: BTreeMap<Role, PermissionVector>,
    pub groups: Vec<GroupMembership>,
}

impl From<&RoleCatalog> for MatrixResponse {
    fn from(catalog: &RoleCatalog) -> Self {
        let groups = RoleGroup::ALL
            .into_iter()
            .map(|group| GroupMembership {
                group,
                members: catalog.members(group),
            })
            .collect();

        MatrixResponse {
            version: catalog.version(),
            digest: catalog.digest(),
            vectors: catalog.vectors().clone(),
            groups,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MatrixUpdateRequest {
    pub expected_version: u64,
    /// Capability name to new value, e.g. `{"canComment": true}`.
    #[schema(value_type = Object)]
    pub capabilities: CapabilityPatch,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MatrixResetRequest {
    pub expected_version: u64,
}
