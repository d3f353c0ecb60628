use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::lifecycle::CompanyChange;
use crate::authz::{CompanyState, ConversionStatus, FinalizationStatus};
use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "conversionStatus")]
    pub conversion_status: ConversionStatus,
    pub finalization_status: FinalizationStatus,
    pub finalized_by_id: Option<Uuid>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub assigned_data_collector_id: Option<Uuid>,
    pub assigned_converter_id: Option<Uuid>,
    #[serde(rename = "customFields")]
    #[schema(value_type = Option<Object>)]
    pub custom_fields: Option<Value>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn state(&self) -> CompanyState {
        CompanyState {
            conversion_status: self.conversion_status,
            finalization_status: self.finalization_status,
            assigned_data_collector: self.assigned_data_collector_id,
            assigned_converter: self.assigned_converter_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbCompany {
    pub id: Uuid,
    pub name: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub conversion_status: String,
    pub finalization_status: String,
    pub finalized_by_id: Option<Uuid>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub assigned_data_collector_id: Option<Uuid>,
    pub assigned_converter_id: Option<Uuid>,
    pub custom_fields: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const COMPANY_COLUMNS: &str = "id, name, website, phone, email, address, conversion_status, finalization_status, \
     finalized_by_id, finalized_at, assigned_data_collector_id, assigned_converter_id, custom_fields, version, \
     created_at, updated_at";

impl TryFrom<DbCompany> for Company {
    type Error = AppError;

    fn try_from(value: DbCompany) -> Result<Self, Self::Error> {
        let conversion_status: ConversionStatus = value.conversion_status.parse().map_err(AppError::internal)?;
        let finalization_status: FinalizationStatus = value.finalization_status.parse().map_err(AppError::internal)?;
        let custom_fields = value
            .custom_fields
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|err| AppError::internal(format!("company {}: bad custom fields: {err}", value.id)))?;

        Ok(Company {
            id: value.id,
            name: value.name,
            website: value.website,
            phone: value.phone,
            email: value.email,
            address: value.address,
            conversion_status,
            finalization_status,
            finalized_by_id: value.finalized_by_id,
            finalized_at: value.finalized_at,
            assigned_data_collector_id: value.assigned_data_collector_id,
            assigned_converter_id: value.assigned_converter_id,
            custom_fields,
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompanyCreateRequest {
    #[schema(example = "ACME Trading")]
    pub name: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "conversionStatus")]
    pub conversion_status: Option<ConversionStatus>,
    #[serde(rename = "customFields")]
    #[schema(value_type = Option<Object>)]
    pub custom_fields: Option<Value>,
    pub assigned_data_collector_id: Option<Uuid>,
    pub assigned_converter_id: Option<Uuid>,
}

/// A partial company update. Only the keys present in the request body are
/// applied; a key sent as `null` clears an optional column.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CompanyPatch {
    #[serde(skip)]
    provided: BTreeSet<String>,
    pub name: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "conversionStatus")]
    pub conversion_status: Option<ConversionStatus>,
    #[serde(rename = "customFields")]
    #[schema(value_type = Option<Object>)]
    pub custom_fields: Option<Value>,
    pub assigned_data_collector_id: Option<Uuid>,
    pub assigned_converter_id: Option<Uuid>,
}

impl CompanyPatch {
    pub fn from_json(body: Value) -> Result<Self, AppError> {
        let provided = match &body {
            Value::Object(map) => map.keys().cloned().collect::<BTreeSet<String>>(),
            _ => return Err(AppError::bad_request("company update must be a JSON object")),
        };

        let mut patch: CompanyPatch = serde_path_to_error::deserialize(body)
            .map_err(|err| AppError::bad_request(format!("invalid field `{}`: {}", err.path(), err.inner())))?;
        patch.provided = provided;
        Ok(patch)
    }

    pub fn has(&self, field: &str) -> bool {
        self.provided.contains(field)
    }

    /// The row that results from applying this patch to `current`.
    pub fn apply(&self, current: &Company) -> Result<CompanyValues, AppError> {
        fn pick<T: Clone>(patch: &CompanyPatch, key: &str, new: &Option<T>, old: &Option<T>) -> Option<T> {
            if patch.has(key) {
                new.clone()
            } else {
                old.clone()
            }
        }

        let name = match (&self.name, self.has("name")) {
            (Some(name), true) if !name.trim().is_empty() => name.trim().to_string(),
            (_, true) => return Err(AppError::bad_request("name must not be empty")),
            (_, false) => current.name.clone(),
        };
        let conversion_status = match (self.conversion_status, self.has("conversionStatus")) {
            (Some(status), true) => status,
            (None, true) => return Err(AppError::bad_request("conversionStatus must not be null")),
            (_, false) => current.conversion_status,
        };

        Ok(CompanyValues {
            name,
            website: pick(self, "website", &self.website, &current.website),
            phone: pick(self, "phone", &self.phone, &current.phone),
            email: pick(self, "email", &self.email, &current.email),
            address: pick(self, "address", &self.address, &current.address),
            conversion_status,
            custom_fields: pick(self, "customFields", &self.custom_fields, &current.custom_fields),
            assigned_data_collector_id: pick(
                self,
                "assigned_data_collector_id",
                &self.assigned_data_collector_id,
                &current.assigned_data_collector_id,
            ),
            assigned_converter_id: pick(
                self,
                "assigned_converter_id",
                &self.assigned_converter_id,
                &current.assigned_converter_id,
            ),
        })
    }
}

impl CompanyChange for CompanyPatch {
    fn provided_fields(&self) -> Vec<String> {
        self.provided.iter().cloned().collect()
    }

    fn requested_conversion_status(&self) -> Option<ConversionStatus> {
        self.conversion_status
    }
}

/// Column values written by an update.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyValues {
    pub name: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub conversion_status: ConversionStatus,
    pub custom_fields: Option<Value>,
    pub assigned_data_collector_id: Option<Uuid>,
    pub assigned_converter_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FinalizeResponse {
    pub message: String,
    pub company: Company,
}
