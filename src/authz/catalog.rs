use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::role::{Capability, PermissionVector, Role, RoleGroup};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("the Admin permission vector is immutable")]
    AdminImmutable,
    #[error("catalog has no permission vector for role {0}")]
    MissingRole(Role),
    #[error("Admin vector must grant every capability")]
    AdminNotFull,
    #[error("stale catalog version: expected {expected}, current is {current}")]
    StaleVersion { expected: u64, current: u64 },
    #[error("malformed catalog: {0}")]
    Malformed(String),
}

/// A versioned, immutable snapshot of the permission matrix.
///
/// Edits never mutate a catalog in place: `with_override` and `reset` return a
/// new catalog with `version + 1` that has already passed `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCatalog {
    version: u64,
    vectors: BTreeMap<Role, PermissionVector>,
}

/// Partial capability edit for one role.
pub type CapabilityPatch = BTreeMap<Capability, bool>;

impl RoleCatalog {
    /// The matrix the system ships with, at version 1.
    pub fn canonical() -> Self {
        let vectors = Role::ALL
            .into_iter()
            .map(|role| (role, canonical_vector(role)))
            .collect();
        Self { version: 1, vectors }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn vectors(&self) -> &BTreeMap<Role, PermissionVector> {
        &self.vectors
    }

    /// Vector for `role`. Absent roles and roles missing from the table get
    /// the all-false vector.
    pub fn permissions(&self, role: Option<Role>) -> PermissionVector {
        role.and_then(|r| self.vectors.get(&r).copied())
            .unwrap_or(PermissionVector::NONE)
    }

    pub fn is_in_group(&self, role: Option<Role>, group: RoleGroup) -> bool {
        match role {
            Some(r) => self.vectors.get(&r).map(|v| group.admits(v)).unwrap_or(false),
            None => false,
        }
    }

    pub fn members(&self, group: RoleGroup) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.is_in_group(Some(*role), group))
            .collect()
    }

    pub fn groups_of(&self, role: Option<Role>) -> Vec<RoleGroup> {
        RoleGroup::ALL
            .into_iter()
            .filter(|group| self.is_in_group(role, *group))
            .collect()
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for role in Role::ALL {
            if !self.vectors.contains_key(&role) {
                return Err(CatalogError::MissingRole(role));
            }
        }
        if self.vectors.get(&Role::Admin) != Some(&PermissionVector::FULL) {
            return Err(CatalogError::AdminNotFull);
        }
        Ok(())
    }

    /// Copy-on-write edit of one role's vector.
    pub fn with_override(
        &self,
        role: Role,
        patch: &CapabilityPatch,
        expected_version: u64,
    ) -> Result<RoleCatalog, CatalogError> {
        self.check_version(expected_version)?;
        if role == Role::Admin {
            return Err(CatalogError::AdminImmutable);
        }

        let mut next = self.clone();
        let vector = next.vectors.entry(role).or_insert(PermissionVector::NONE);
        for (capability, value) in patch {
            vector.set(*capability, *value);
        }
        next.version = self.version + 1;
        next.validate()?;
        Ok(next)
    }

    /// The canonical matrix, committed as the next version.
    pub fn reset(&self, expected_version: u64) -> Result<RoleCatalog, CatalogError> {
        self.check_version(expected_version)?;
        let mut next = RoleCatalog::canonical();
        next.version = self.version + 1;
        Ok(next)
    }

    fn check_version(&self, expected: u64) -> Result<(), CatalogError> {
        if expected != self.version {
            return Err(CatalogError::StaleVersion {
                expected,
                current: self.version,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        serde_json::to_string(self).map_err(|e| CatalogError::Malformed(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<RoleCatalog, CatalogError> {
        let catalog: RoleCatalog =
            serde_json::from_str(raw).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Hex SHA-256 of the canonical JSON encoding. `BTreeMap` ordering and the
    /// fixed struct field order make the encoding deterministic.
    pub fn digest(&self) -> String {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&encoded))
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::canonical()
    }
}

fn canonical_vector(role: Role) -> PermissionVector {
    match role {
        Role::Admin => PermissionVector::FULL,
        Role::Head | Role::SubHead => PermissionVector {
            can_read: true,
            can_read_finalized: true,
            can_comment: true,
            ..PermissionVector::NONE
        },
        Role::Manager => PermissionVector {
            can_edit_finalized: false,
            ..PermissionVector::FULL
        },
        Role::DataCollector => PermissionVector {
            can_read: true,
            can_create: true,
            can_edit: true,
            can_delete: true,
            can_update_own_tasks: true,
            ..PermissionVector::NONE
        },
        Role::Converter => PermissionVector {
            can_read: true,
            can_update_own_tasks: true,
            ..PermissionVector::NONE
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(entries: &[(Capability, bool)]) -> CapabilityPatch {
        entries.iter().copied().collect()
    }

    #[test]
    fn canonical_catalog_is_valid_and_complete() {
        let catalog = RoleCatalog::canonical();
        assert_eq!(catalog.version(), 1);
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.vectors().len(), Role::ALL.len());
    }

    #[test]
    fn absent_role_gets_nothing() {
        let catalog = RoleCatalog::canonical();
        assert_eq!(catalog.permissions(None), PermissionVector::NONE);
        assert!(!catalog.is_in_group(None, RoleGroup::TaskWorkers));
        assert!(catalog.groups_of(None).is_empty());
    }

    #[test]
    fn derived_groups_match_the_published_tables() {
        let catalog = RoleCatalog::canonical();
        let expected: [(RoleGroup, &[Role]); 9] = [
            (RoleGroup::Managers, &[Role::Admin, Role::Manager]),
            (RoleGroup::DataManagers, &[Role::Admin, Role::Manager, Role::DataCollector]),
            (RoleGroup::ReadOnlyWithComments, &[Role::Head, Role::SubHead]),
            (RoleGroup::TaskWorkers, &[Role::DataCollector, Role::Converter]),
            (RoleGroup::TaskAssigners, &[Role::Admin, Role::Manager]),
            (RoleGroup::Finalizers, &[Role::Admin, Role::Manager]),
            (RoleGroup::UserManagers, &[Role::Admin, Role::Manager]),
            (RoleGroup::CustomFieldManagers, &[Role::Admin, Role::Manager]),
            (RoleGroup::Administrators, &[Role::Admin]),
        ];
        for (group, members) in expected {
            assert_eq!(catalog.members(group), members.to_vec(), "group {group}");
        }
    }

    #[test]
    fn override_is_copy_on_write_and_bumps_version() {
        let catalog = RoleCatalog::canonical();
        let next = catalog
            .with_override(Role::Converter, &patch(&[(Capability::CanComment, true)]), 1)
            .unwrap();

        assert_eq!(next.version(), 2);
        assert!(next.permissions(Some(Role::Converter)).can_comment);
        assert!(!catalog.permissions(Some(Role::Converter)).can_comment);
        assert_ne!(catalog.digest(), next.digest());
    }

    #[test]
    fn override_moves_group_membership_with_the_vector() {
        let catalog = RoleCatalog::canonical();
        let next = catalog
            .with_override(Role::Manager, &patch(&[(Capability::CanFinalize, false)]), 1)
            .unwrap();
        assert_eq!(next.members(RoleGroup::Finalizers), vec![Role::Admin]);
    }

    #[test]
    fn admin_vector_survives_any_sequence_of_override_attempts() {
        let mut catalog = RoleCatalog::canonical();
        for round in 0..50u64 {
            let cap = Capability::ALL[(round as usize) % Capability::ALL.len()];
            let attempt = catalog.with_override(Role::Admin, &patch(&[(cap, round % 2 == 0)]), catalog.version());
            assert_eq!(attempt, Err(CatalogError::AdminImmutable));

            // Interleave legitimate edits so the catalog keeps moving.
            let other = Role::ALL[1 + (round as usize) % (Role::ALL.len() - 1)];
            catalog = catalog
                .with_override(other, &patch(&[(cap, round % 3 == 0)]), catalog.version())
                .unwrap();
            assert_eq!(catalog.permissions(Some(Role::Admin)), PermissionVector::FULL);
        }
        assert_eq!(catalog.version(), 51);
    }

    #[test]
    fn stale_version_is_refused() {
        let catalog = RoleCatalog::canonical();
        let err = catalog
            .with_override(Role::Head, &patch(&[(Capability::CanEdit, true)]), 7)
            .unwrap_err();
        assert_eq!(err, CatalogError::StaleVersion { expected: 7, current: 1 });
    }

    #[test]
    fn reset_restores_canonical_vectors_as_a_new_version() {
        let edited = RoleCatalog::canonical()
            .with_override(Role::Head, &patch(&[(Capability::CanEdit, true)]), 1)
            .unwrap();
        let reset = edited.reset(2).unwrap();
        assert_eq!(reset.version(), 3);
        assert_eq!(reset.vectors(), RoleCatalog::canonical().vectors());
    }

    #[test]
    fn json_round_trip_validates() {
        let catalog = RoleCatalog::canonical();
        let raw = catalog.to_json().unwrap();
        assert_eq!(RoleCatalog::from_json(&raw).unwrap(), catalog);

        let tampered = raw.replace("\"canEditFinalized\":true", "\"canEditFinalized\":false");
        assert_eq!(RoleCatalog::from_json(&tampered), Err(CatalogError::AdminNotFull));
    }

    #[test]
    fn incomplete_catalog_is_rejected() {
        let mut catalog = RoleCatalog::canonical();
        catalog.vectors.remove(&Role::Converter);
        assert_eq!(catalog.validate(), Err(CatalogError::MissingRole(Role::Converter)));
        assert_eq!(catalog.permissions(Some(Role::Converter)), PermissionVector::NONE);
    }
}
