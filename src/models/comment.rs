use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub user_role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const COMMENT_SELECT: &str = "SELECT c.id, c.company_id, c.user_id, c.content, c.parent_comment_id, \
     u.full_name AS user_name, u.role AS user_role, c.created_at, c.updated_at \
     FROM comments c LEFT JOIN users u ON c.user_id = u.id";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    #[schema(example = "Numbers confirmed with the client.")]
    pub content: String,
    pub company_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentUpdateRequest {
    pub content: String,
}
