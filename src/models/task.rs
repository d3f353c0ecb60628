use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::nullable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    NotYet,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotYet => "NotYet",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotYet" => Ok(TaskStatus::NotYet),
            "InProgress" => Ok(TaskStatus::InProgress),
            "Completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    #[schema(format = DateTime, example = "2025-10-10T10:00:00Z")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(rename = "companyId")]
    pub company_id: Option<Uuid>,
    #[serde(rename = "assignedToId")]
    pub assigned_to_id: Option<Uuid>,
    #[serde(rename = "assignedById")]
    pub assigned_by_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub deadline: Option<DateTime<Utc>>,
    pub company_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub assigned_by_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const TASK_COLUMNS: &str = "id, title, description, status, deadline, company_id, assigned_to_id, assigned_by_id, \
     version, created_at, updated_at";

impl TryFrom<DbTask> for Task {
    type Error = AppError;

    fn try_from(value: DbTask) -> Result<Self, Self::Error> {
        let status: TaskStatus = value.status.parse().map_err(AppError::internal)?;

        Ok(Task {
            id: value.id,
            title: value.title,
            description: value.description,
            status,
            deadline: value.deadline,
            company_id: value.company_id,
            assigned_to_id: value.assigned_to_id,
            assigned_by_id: value.assigned_by_id,
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    #[schema(example = "Call ACME about the renewal")]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    #[schema(format = DateTime, example = "2025-10-10T10:00:00Z")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(rename = "companyId")]
    pub company_id: Option<Uuid>,
    #[serde(rename = "assignedToId")]
    pub assigned_to_id: Option<Uuid>,
}

/// Fields left out keep their stored value. `null` clears `description`,
/// `deadline`, `companyId` and `assignedToId`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TaskUpdateRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = DateTime, example = "2025-11-01T10:00:00Z")]
    pub deadline: Option<Option<DateTime<Utc>>>,
    #[serde(rename = "companyId", default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Uuid>)]
    pub company_id: Option<Option<Uuid>>,
    #[serde(rename = "assignedToId", default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Uuid>)]
    pub assigned_to_id: Option<Option<Uuid>>,
}
