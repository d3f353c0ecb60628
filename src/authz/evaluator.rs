use super::catalog::RoleCatalog;
use super::role::{Capability, Role, RoleGroup};

/// Direct lookup of one capability on the role's vector. No inheritance and
/// no implicit composition; an absent role holds nothing.
pub fn has_permission(catalog: &RoleCatalog, role: Option<Role>, capability: Capability) -> bool {
    let allowed = catalog.permissions(role).get(capability);
    tracing::debug!(
        role = ?role,
        capability = %capability,
        catalog_version = catalog.version(),
        allowed,
        "capability check"
    );
    allowed
}

/// Name-based variant for callers holding a capability as text. Unknown
/// capability names are simply not held.
pub fn has_permission_named(catalog: &RoleCatalog, role: Option<Role>, capability: &str) -> bool {
    match capability.parse::<Capability>() {
        Ok(cap) => has_permission(catalog, role, cap),
        Err(_) => {
            tracing::debug!(role = ?role, capability, "unknown capability name");
            false
        }
    }
}

pub fn is_in_group(catalog: &RoleCatalog, role: Option<Role>, group: RoleGroup) -> bool {
    let member = catalog.is_in_group(role, group);
    tracing::debug!(role = ?role, group = %group, member, "group check");
    member
}
