use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::nullable;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "companyId")]
    pub company_id: Option<Uuid>,
    #[serde(rename = "raisedById")]
    pub raised_by_id: Option<Uuid>,
    #[serde(rename = "assignedToId")]
    pub assigned_to_id: Option<Uuid>,
    #[serde(rename = "isResolved")]
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const TICKET_COLUMNS: &str = "id, title, description, company_id, raised_by_id, assigned_to_id, is_resolved, \
     resolved_at, version, created_at, updated_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketCreateRequest {
    #[schema(example = "Phone number bounces")]
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "companyId")]
    pub company_id: Option<Uuid>,
    #[serde(rename = "assignedToId")]
    pub assigned_to_id: Option<Uuid>,
}

/// Fields left out keep their stored value. `null` clears `description` and
/// `assignedToId`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TicketUpdateRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(rename = "isResolved")]
    pub is_resolved: Option<bool>,
    #[serde(rename = "assignedToId", default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Uuid>)]
    pub assigned_to_id: Option<Option<Uuid>>,
}
