use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    Text,
    Number,
    Date,
}

impl CustomFieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomFieldType::Text => "text",
            CustomFieldType::Number => "number",
            CustomFieldType::Date => "date",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(CustomFieldType::Text),
            "number" => Some(CustomFieldType::Number),
            "date" => Some(CustomFieldType::Date),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomFieldDefinition {
    pub id: Uuid,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: CustomFieldType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbCustomFieldDefinition {
    pub id: Uuid,
    pub label: String,
    pub field_type: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbCustomFieldDefinition> for CustomFieldDefinition {
    type Error = AppError;

    fn try_from(value: DbCustomFieldDefinition) -> Result<Self, Self::Error> {
        let field_type = CustomFieldType::parse(&value.field_type)
            .ok_or_else(|| AppError::internal(format!("unknown custom field type: {}", value.field_type)))?;

        Ok(CustomFieldDefinition {
            id: value.id,
            label: value.label,
            field_type,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomFieldCreateRequest {
    #[schema(example = "Industry")]
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: CustomFieldType,
}
