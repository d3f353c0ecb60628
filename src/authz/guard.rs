use uuid::Uuid;

use super::actor::AuthenticatedActor;
use super::catalog::RoleCatalog;
use super::denial::{Authorized, Decision, Denial};
use super::evaluator::{has_permission, is_in_group};
use super::role::{Capability, Role, RoleGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Read,
    Create,
    Update,
    Delete,
}

impl Verb {
    pub fn is_write(&self) -> bool {
        !matches!(self, Verb::Read)
    }
}

/// Coarse, role-level precondition of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Authenticated,
    Group(RoleGroup),
    Capability(Capability),
}

/// Narrow exceptions to read-only enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarveOut {
    /// Data collection is the DataCollector's primary duty; it keeps company
    /// and contact CRUD whatever its vector says.
    DataCollectorDuty,
    /// Task workers keep write access to work assigned to them: task and
    /// ticket updates, and the conversion status of an assigned company.
    AssignedWork,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOnly {
    Enforce(&'static [CarveOut]),
    /// Writes that are not business-data mutations (comments, tickets raised,
    /// own notifications).
    Exempt,
}

/// Declarative access rule attached to one API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRule {
    pub name: &'static str,
    pub verb: Verb,
    pub gate: Gate,
    pub read_only: ReadOnly,
}

impl OperationRule {
    pub const fn new(name: &'static str, verb: Verb, gate: Gate, read_only: ReadOnly) -> Self {
        Self { name, verb, gate, read_only }
    }

    pub fn carves_out(&self, carve_out: CarveOut) -> bool {
        match self.read_only {
            ReadOnly::Enforce(carve_outs) => carve_outs.contains(&carve_out),
            ReadOnly::Exempt => false,
        }
    }
}

pub(crate) fn has_data_collection_duty(role: Role) -> bool {
    match role {
        Role::DataCollector => true,
        Role::Admin | Role::Head | Role::SubHead | Role::Manager | Role::Converter => false,
    }
}

/// Steps 1-3 of the request pipeline: authentication, the coarse gate and
/// read-only enforcement. Returns the actor so callers can continue with
/// record-level checks.
pub fn authorize_operation(
    catalog: &RoleCatalog,
    actor: Option<&AuthenticatedActor>,
    rule: &OperationRule,
) -> Decision<AuthenticatedActor> {
    let actor = match actor {
        Some(actor) => *actor,
        None => {
            tracing::debug!(operation = rule.name, "denied: no verified actor");
            return Err(Denial::Unauthenticated);
        }
    };
    let vector = catalog.permissions(actor.role);

    let gate_ok = match rule.gate {
        Gate::Authenticated => true,
        Gate::Group(group) => is_in_group(catalog, actor.role, group),
        Gate::Capability(capability) => has_permission(catalog, actor.role, capability),
    };
    // The data collection duty outlives matrix edits, so it also opens the gate.
    let duty = rule.carves_out(CarveOut::DataCollectorDuty)
        && actor.role.map(has_data_collection_duty).unwrap_or(false);
    // A role this build cannot name holds nothing, even on open gates.
    if (!gate_ok && !duty) || actor.role.is_none() {
        tracing::debug!(
            actor_id = %actor.id,
            role = ?actor.role,
            operation = rule.name,
            gate = ?rule.gate,
            "denied: gate"
        );
        return Err(Denial::forbidden(format!("insufficient permissions for {}", rule.name)));
    }

    if rule.verb.is_write() && vector.is_read_only() {
        let carved_out = match rule.read_only {
            ReadOnly::Exempt => true,
            ReadOnly::Enforce(carve_outs) => carve_outs.iter().any(|carve_out| match carve_out {
                CarveOut::DataCollectorDuty => duty,
                CarveOut::AssignedWork => is_in_group(catalog, actor.role, RoleGroup::TaskWorkers),
            }),
        };
        if !carved_out {
            tracing::debug!(
                actor_id = %actor.id,
                role = ?actor.role,
                operation = rule.name,
                "denied: read-only role"
            );
            return Err(Denial::forbidden("read-only access: your role cannot modify data"));
        }
    }

    tracing::debug!(actor_id = %actor.id, role = ?actor.role, operation = rule.name, "operation allowed");
    Ok(actor)
}

/// Step 4 for tasks and tickets. A role that may only update its own work
/// must be the assignee and may not hand the record to someone else.
pub fn authorize_assigned_update<P>(
    catalog: &RoleCatalog,
    actor: &AuthenticatedActor,
    current_assignee: Option<Uuid>,
    requested_assignee: Option<Option<Uuid>>,
    patch: P,
) -> Decision<Authorized<P>> {
    if has_permission(catalog, actor.role, Capability::CanUpdateAllTasks) {
        return Ok(Authorized::grant(patch));
    }
    if !has_permission(catalog, actor.role, Capability::CanUpdateOwnTasks) {
        return Err(Denial::forbidden("you do not have permission to update this record"));
    }
    if !actor.is_opt(current_assignee) {
        tracing::debug!(actor_id = %actor.id, "denied: record assigned to someone else");
        return Err(Denial::ownership("you can only update records assigned to you"));
    }
    if let Some(requested) = requested_assignee {
        if requested != current_assignee {
            tracing::debug!(actor_id = %actor.id, "denied: reassignment by own-work role");
            return Err(Denial::restricted_fields(["assignedToId"]));
        }
    }
    Ok(Authorized::grant(patch))
}

/// Comments are changed only by their author or an administrator.
pub fn authorize_comment_change(
    catalog: &RoleCatalog,
    actor: &AuthenticatedActor,
    author_id: Uuid,
) -> Decision<()> {
    if actor.is(author_id) || is_in_group(catalog, actor.role, RoleGroup::Administrators) {
        return Ok(());
    }
    Err(Denial::ownership("you can only change your own comments"))
}

/// Access rules for every operation the service exposes.
pub mod ops {
    use super::{CarveOut, Gate, OperationRule, ReadOnly, Verb};
    use crate::authz::role::{Capability, RoleGroup};

    const DATA_ENTRY: ReadOnly = ReadOnly::Enforce(&[CarveOut::DataCollectorDuty]);
    const ASSIGNED_WORK: ReadOnly = ReadOnly::Enforce(&[CarveOut::AssignedWork]);
    const STRICT: ReadOnly = ReadOnly::Enforce(&[]);

    pub const READ: OperationRule =
        OperationRule::new("read", Verb::Read, Gate::Capability(Capability::CanRead), STRICT);

    pub const COMPANY_CREATE: OperationRule =
        OperationRule::new("company.create", Verb::Create, Gate::Group(RoleGroup::DataManagers), DATA_ENTRY);
    pub const COMPANY_UPDATE: OperationRule = OperationRule::new(
        "company.update",
        Verb::Update,
        Gate::Authenticated,
        ReadOnly::Enforce(&[CarveOut::DataCollectorDuty, CarveOut::AssignedWork]),
    );
    pub const COMPANY_DELETE: OperationRule =
        OperationRule::new("company.delete", Verb::Delete, Gate::Group(RoleGroup::DataManagers), DATA_ENTRY);
    pub const COMPANY_FINALIZE: OperationRule =
        OperationRule::new("company.finalize", Verb::Update, Gate::Group(RoleGroup::Finalizers), STRICT);

    pub const CONTACT_CREATE: OperationRule =
        OperationRule::new("contact.create", Verb::Create, Gate::Authenticated, DATA_ENTRY);
    pub const CONTACT_UPDATE: OperationRule =
        OperationRule::new("contact.update", Verb::Update, Gate::Authenticated, DATA_ENTRY);
    pub const CONTACT_DELETE: OperationRule =
        OperationRule::new("contact.delete", Verb::Delete, Gate::Authenticated, DATA_ENTRY);

    pub const TASK_CREATE: OperationRule =
        OperationRule::new("task.create", Verb::Create, Gate::Group(RoleGroup::TaskAssigners), STRICT);
    pub const TASK_UPDATE: OperationRule = OperationRule::new(
        "task.update",
        Verb::Update,
        Gate::Capability(Capability::CanUpdateOwnTasks),
        ASSIGNED_WORK,
    );
    pub const TASK_DELETE: OperationRule =
        OperationRule::new("task.delete", Verb::Delete, Gate::Group(RoleGroup::TaskAssigners), STRICT);

    pub const TICKET_CREATE: OperationRule =
        OperationRule::new("ticket.create", Verb::Create, Gate::Authenticated, ReadOnly::Exempt);
    pub const TICKET_UPDATE: OperationRule = OperationRule::new(
        "ticket.update",
        Verb::Update,
        Gate::Capability(Capability::CanUpdateOwnTasks),
        ASSIGNED_WORK,
    );
    pub const TICKET_DELETE: OperationRule =
        OperationRule::new("ticket.delete", Verb::Delete, Gate::Group(RoleGroup::TaskAssigners), STRICT);

    pub const COMMENT_CREATE: OperationRule =
        OperationRule::new("comment.create", Verb::Create, Gate::Capability(Capability::CanComment), ReadOnly::Exempt);
    pub const COMMENT_UPDATE: OperationRule =
        OperationRule::new("comment.update", Verb::Update, Gate::Authenticated, ReadOnly::Exempt);
    pub const COMMENT_DELETE: OperationRule =
        OperationRule::new("comment.delete", Verb::Delete, Gate::Authenticated, ReadOnly::Exempt);

    pub const NOTIFICATION_UPDATE: OperationRule =
        OperationRule::new("notification.update", Verb::Update, Gate::Authenticated, ReadOnly::Exempt);
    pub const NOTIFICATION_DELETE: OperationRule =
        OperationRule::new("notification.delete", Verb::Delete, Gate::Authenticated, ReadOnly::Exempt);

    pub const CUSTOM_FIELD_CREATE: OperationRule = OperationRule::new(
        "custom_field.create",
        Verb::Create,
        Gate::Group(RoleGroup::CustomFieldManagers),
        STRICT,
    );
    pub const CUSTOM_FIELD_DELETE: OperationRule = OperationRule::new(
        "custom_field.delete",
        Verb::Delete,
        Gate::Group(RoleGroup::CustomFieldManagers),
        STRICT,
    );

    pub const USER_LIST: OperationRule =
        OperationRule::new("user.list", Verb::Read, Gate::Group(RoleGroup::UserManagers), STRICT);
    pub const USER_UPDATE: OperationRule =
        OperationRule::new("user.update", Verb::Update, Gate::Group(RoleGroup::UserManagers), STRICT);
    pub const USER_DELETE: OperationRule =
        OperationRule::new("user.delete", Verb::Delete, Gate::Group(RoleGroup::Administrators), STRICT);

    pub const CATALOG_READ: OperationRule =
        OperationRule::new("rbac.read", Verb::Read, Gate::Group(RoleGroup::UserManagers), STRICT);
    pub const CATALOG_UPDATE: OperationRule =
        OperationRule::new("rbac.update", Verb::Update, Gate::Group(RoleGroup::Administrators), STRICT);
}
