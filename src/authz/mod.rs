//! Authorization engine
//!
//! Everything a request must pass before it may touch business data:
//! - the versioned role/capability matrix and its derived role groups
//! - per-operation gates with read-only enforcement and its carve-outs
//! - record ownership for tasks and tickets
//! - the company finalization lifecycle and read visibility
//!
//! The engine is pure. Handlers snapshot the live catalog from
//! [`PolicyStore`], ask the engine for a verdict, and only then write.

mod actor;
mod catalog;
mod denial;
mod evaluator;
pub mod guard;
pub mod lifecycle;
mod role;
mod store;

pub use actor::AuthenticatedActor;
pub use catalog::{CapabilityPatch, CatalogError, RoleCatalog};
pub use denial::{Authorized, Decision, Denial};
pub use evaluator::{has_permission, has_permission_named, is_in_group};
pub use guard::{authorize_operation, ops, OperationRule};
pub use lifecycle::{CompanyState, ConversionStatus, FinalizationStatus};
pub use role::{Capability, PermissionVector, Role, RoleGroup, UnknownCapability, UnknownRole};
pub use store::{load_or_seed, CatalogStore, PolicyStore, SqliteCatalogStore};
