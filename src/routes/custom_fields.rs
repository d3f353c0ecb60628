use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::ops;
use crate::errors::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::jwt::AuthUser;
use crate::models::custom_field::{CustomFieldCreateRequest, CustomFieldDefinition, DbCustomFieldDefinition};
use crate::models::MessageResponse;
use crate::routes::authorize;
use crate::utils::utc_now;

const FIELD_COLUMNS: &str = "id, label, field_type, created_at";

#[utoipa::path(
    get,
    path = "/custom-fields",
    tag = "Custom Fields",
    responses((status = 200, description = "Custom field definitions", body = [CustomFieldDefinition]))
)]
pub async fn list_custom_fields(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<CustomFieldDefinition>>> {
    authorize(&state, &auth, &ops::READ)?;
    let rows = sqlx::query_as::<_, DbCustomFieldDefinition>(&format!(
        "SELECT {FIELD_COLUMNS} FROM custom_field_definitions ORDER BY created_at ASC"
    ))
    .fetch_all(&state.pool)
    .await?;
    let fields = rows
        .into_iter()
        .map(CustomFieldDefinition::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(fields))
}

#[utoipa::path(
    post,
    path = "/custom-fields",
    tag = "Custom Fields",
    request_body = CustomFieldCreateRequest,
    responses(
        (status = 201, description = "Field defined", body = CustomFieldDefinition),
        (status = 403, description = "Role may not manage custom fields"),
        (status = 409, description = "Label already defined")
    )
)]
pub async fn create_custom_field(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<CustomFieldCreateRequest>,
) -> AppResult<(StatusCode, Json<CustomFieldDefinition>)> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::CUSTOM_FIELD_CREATE)?;

    let label = payload.label.trim();
    if label.is_empty() {
        return Err(AppError::bad_request("label is required"));
    }

    let id = Uuid::new_v4();
    let inserted = sqlx::query(
        "INSERT INTO custom_field_definitions (id, label, field_type, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(label)
    .bind(payload.field_type.as_str())
    .bind(utc_now())
    .execute(&state.pool)
    .await;
    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::conflict(format!("custom field \"{label}\" already exists")));
        }
        Err(err) => return Err(err.into()),
    }
    tracing::info!(field_id = %id, actor_id = %actor.id, label, "custom field defined");

    let field: CustomFieldDefinition = sqlx::query_as::<_, DbCustomFieldDefinition>(&format!(
        "SELECT {FIELD_COLUMNS} FROM custom_field_definitions WHERE id = ?"
    ))
    .bind(id)
    .fetch_one(&state.pool)
    .await?
    .try_into()?;
    Ok((StatusCode::CREATED, Json(field)))
}

/// Values already stored under the label stay in each company's
/// customFields.
#[utoipa::path(
    delete,
    path = "/custom-fields/{id}",
    tag = "Custom Fields",
    params(("id" = Uuid, Path, description = "Field id")),
    responses(
        (status = 200, description = "Field removed", body = MessageResponse),
        (status = 403, description = "Role may not manage custom fields"),
        (status = 404, description = "Field not found")
    )
)]
pub async fn delete_custom_field(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    authorize(&state, &auth, &ops::CUSTOM_FIELD_DELETE)?;
    let result = sqlx::query("DELETE FROM custom_field_definitions WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("custom field not found"));
    }
    Ok(Json(MessageResponse::new("Custom field deleted successfully")))
}
