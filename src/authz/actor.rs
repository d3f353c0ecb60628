use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// A verified caller. `role` is `None` when the token carried a role string
/// this build does not recognize; such an actor holds no capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedActor {
    pub id: Uuid,
    pub role: Option<Role>,
}

impl AuthenticatedActor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role: Some(role) }
    }

    pub fn unrecognized(id: Uuid) -> Self {
        Self { id, role: None }
    }

    pub fn is(&self, user_id: Uuid) -> bool {
        self.id == user_id
    }

    pub fn is_opt(&self, user_id: Option<Uuid>) -> bool {
        user_id == Some(self.id)
    }
}
