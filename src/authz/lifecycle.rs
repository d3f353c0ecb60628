use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::actor::AuthenticatedActor;
use super::catalog::RoleCatalog;
use super::denial::{Authorized, Decision, Denial};
use super::evaluator::has_permission;
use super::guard::has_data_collection_duty;
use super::role::{Capability, PermissionVector, Role, RoleGroup};

/// Wire name of the one field a conversion-only writer may send.
pub const CONVERSION_STATUS_FIELD: &str = "conversionStatus";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ConversionStatus {
    Waiting,
    NoReach,
    Confirmed,
    Finalized,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Waiting => "Waiting",
            ConversionStatus::NoReach => "NoReach",
            ConversionStatus::Confirmed => "Confirmed",
            ConversionStatus::Finalized => "Finalized",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Waiting" => Ok(ConversionStatus::Waiting),
            "NoReach" => Ok(ConversionStatus::NoReach),
            "Confirmed" => Ok(ConversionStatus::Confirmed),
            "Finalized" => Ok(ConversionStatus::Finalized),
            other => Err(format!("unknown conversion status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum FinalizationStatus {
    Pending,
    Finalized,
}

impl FinalizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalizationStatus::Pending => "Pending",
            FinalizationStatus::Finalized => "Finalized",
        }
    }
}

impl FromStr for FinalizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(FinalizationStatus::Pending),
            "Finalized" => Ok(FinalizationStatus::Finalized),
            other => Err(format!("unknown finalization status: {other}")),
        }
    }
}

/// The parts of a stored company the lifecycle rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyState {
    pub conversion_status: ConversionStatus,
    pub finalization_status: FinalizationStatus,
    pub assigned_data_collector: Option<Uuid>,
    pub assigned_converter: Option<Uuid>,
}

impl CompanyState {
    pub fn is_finalized(&self) -> bool {
        self.finalization_status == FinalizationStatus::Finalized
    }
}

/// A requested company edit, described by the wire fields the caller sent.
pub trait CompanyChange {
    fn provided_fields(&self) -> Vec<String>;
    fn requested_conversion_status(&self) -> Option<ConversionStatus>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteScope {
    Full,
    /// Only `conversionStatus`, and only on companies assigned to the actor.
    ConversionStatusOnAssigned,
    None,
}

pub fn company_write_scope(catalog: &RoleCatalog, role: Option<Role>) -> WriteScope {
    let vector = catalog.permissions(role);
    if vector.can_edit || role.map(has_data_collection_duty).unwrap_or(false) {
        WriteScope::Full
    } else if catalog.is_in_group(role, RoleGroup::TaskWorkers) {
        WriteScope::ConversionStatusOnAssigned
    } else {
        WriteScope::None
    }
}

fn check_lock(vector: &PermissionVector, state: &CompanyState) -> Decision<()> {
    if state.is_finalized() && !vector.can_edit_finalized {
        return Err(Denial::forbidden("cannot modify finalized company data"));
    }
    Ok(())
}

/// Record-level checks for a company update, run after the operation gate.
/// Nothing is written unless this returns the authorized patch.
pub fn authorize_company_update<P: CompanyChange>(
    catalog: &RoleCatalog,
    actor: &AuthenticatedActor,
    state: &CompanyState,
    patch: P,
) -> Decision<Authorized<P>> {
    let vector = catalog.permissions(actor.role);
    check_lock(&vector, state)?;

    match company_write_scope(catalog, actor.role) {
        WriteScope::Full => {}
        WriteScope::ConversionStatusOnAssigned => {
            if !actor.is_opt(state.assigned_converter) {
                tracing::debug!(actor_id = %actor.id, "denied: company not assigned to converter");
                return Err(Denial::ownership("you can only update companies assigned to you"));
            }
            let disallowed: Vec<String> = patch
                .provided_fields()
                .into_iter()
                .filter(|field| field != CONVERSION_STATUS_FIELD)
                .collect();
            if !disallowed.is_empty() {
                tracing::debug!(actor_id = %actor.id, fields = ?disallowed, "denied: restricted company fields");
                return Err(Denial::restricted_fields(disallowed));
            }
        }
        WriteScope::None => {
            return Err(Denial::forbidden("you do not have permission to edit companies"));
        }
    }

    if patch.requested_conversion_status() == Some(ConversionStatus::Finalized) {
        return Err(Denial::invalid_transition(
            "conversion status cannot be set to Finalized; use the finalize operation",
        ));
    }
    Ok(Authorized::grant(patch))
}

pub fn authorize_company_delete(
    catalog: &RoleCatalog,
    actor: &AuthenticatedActor,
    state: &CompanyState,
) -> Decision<()> {
    check_lock(&catalog.permissions(actor.role), state)
}

/// Who locked the record and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizationStamp {
    pub finalized_by: Uuid,
    pub finalized_at: DateTime<Utc>,
}

/// The one-way `Pending -> Finalized` transition.
pub fn finalize(
    catalog: &RoleCatalog,
    actor: &AuthenticatedActor,
    state: &CompanyState,
    now: DateTime<Utc>,
) -> Decision<Authorized<FinalizationStamp>> {
    if !has_permission(catalog, actor.role, Capability::CanFinalize) {
        return Err(Denial::forbidden("you do not have permission to finalize companies"));
    }
    if state.is_finalized() {
        return Err(Denial::invalid_transition("already finalized"));
    }
    if state.conversion_status != ConversionStatus::Confirmed {
        return Err(Denial::invalid_transition("not confirmed yet"));
    }
    Ok(Authorized::grant(FinalizationStamp {
        finalized_by: actor.id,
        finalized_at: now,
    }))
}

/// Read visibility of one company. List, detail and the finalized list all
/// filter through this predicate.
pub fn is_visible(catalog: &RoleCatalog, actor: &AuthenticatedActor, state: &CompanyState) -> bool {
    let vector = catalog.permissions(actor.role);
    if !vector.can_read {
        return false;
    }
    if state.is_finalized() && !vector.can_read_finalized {
        return false;
    }
    match actor.role {
        Some(Role::Converter) => actor.is_opt(state.assigned_converter),
        Some(Role::Head) | Some(Role::SubHead) => state.is_finalized(),
        Some(Role::Admin) | Some(Role::Manager) | Some(Role::DataCollector) => true,
        None => false,
    }
}
