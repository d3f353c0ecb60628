use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub message: String,
    #[serde(rename = "isRead")]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
