use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

pub mod comment;
pub mod company;
pub mod contact;
pub mod custom_field;
pub mod notification;
pub mod rbac;
pub mod task;
pub mod ticket;
pub mod user;

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Deserializer for optional columns in partial updates: an absent key stays
/// `None`, an explicit `null` becomes `Some(None)`. Pair with `#[serde(default)]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
