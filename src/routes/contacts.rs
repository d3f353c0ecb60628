use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::ops;
use crate::errors::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::jwt::AuthUser;
use crate::models::contact::{Contact, ContactRequest};
use crate::models::MessageResponse;
use crate::routes::{authorize, ensure_company_exists};
use crate::utils::utc_now;

const CONTACT_COLUMNS: &str = "id, name, email, phone, company_id, created_at, updated_at";

#[utoipa::path(
    get,
    path = "/contacts",
    tag = "Contacts",
    responses((status = 200, description = "All contacts", body = [Contact]))
)]
pub async fn list_contacts(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Contact>>> {
    authorize(&state, &auth, &ops::READ)?;
    let contacts = sqlx::query_as::<_, Contact>(&format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at DESC"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(contacts))
}

#[utoipa::path(
    get,
    path = "/contacts/{id}",
    tag = "Contacts",
    params(("id" = Uuid, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Contact", body = Contact),
        (status = 404, description = "Contact not found")
    )
)]
pub async fn get_contact(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Contact>> {
    authorize(&state, &auth, &ops::READ)?;
    let mut conn = state.pool.acquire().await?;
    Ok(Json(fetch_contact(&mut conn, id).await?))
}

#[utoipa::path(
    post,
    path = "/contacts",
    tag = "Contacts",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Contact created", body = Contact),
        (status = 403, description = "Read-only role")
    )
)]
pub async fn create_contact(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<ContactRequest>,
) -> AppResult<(StatusCode, Json<Contact>)> {
    authorize(&state, &auth, &ops::CONTACT_CREATE)?;
    let name = validated_name(&payload)?;

    let mut conn = state.pool.acquire().await?;
    ensure_company_exists(&mut conn, payload.company_id).await?;

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO contacts (id, name, email, phone, company_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(payload.company_id)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok((StatusCode::CREATED, Json(fetch_contact(&mut conn, id).await?)))
}

#[utoipa::path(
    put,
    path = "/contacts/{id}",
    tag = "Contacts",
    params(("id" = Uuid, Path, description = "Contact id")),
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Contact updated", body = Contact),
        (status = 403, description = "Read-only role"),
        (status = 404, description = "Contact not found")
    )
)]
pub async fn update_contact(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<ContactRequest>,
) -> AppResult<Json<Contact>> {
    authorize(&state, &auth, &ops::CONTACT_UPDATE)?;
    let name = validated_name(&payload)?;

    let mut conn = state.pool.acquire().await?;
    ensure_company_exists(&mut conn, payload.company_id).await?;

    let result = sqlx::query(
        "UPDATE contacts SET name = ?, email = ?, phone = ?, company_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(payload.company_id)
    .bind(utc_now())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("contact not found"));
    }

    Ok(Json(fetch_contact(&mut conn, id).await?))
}

#[utoipa::path(
    delete,
    path = "/contacts/{id}",
    tag = "Contacts",
    params(("id" = Uuid, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Contact deleted", body = MessageResponse),
        (status = 403, description = "Read-only role"),
        (status = 404, description = "Contact not found")
    )
)]
pub async fn delete_contact(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    authorize(&state, &auth, &ops::CONTACT_DELETE)?;

    let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("contact not found"));
    }

    Ok(Json(MessageResponse::new("Contact deleted successfully")))
}

fn validated_name(payload: &ContactRequest) -> AppResult<&str> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    Ok(name)
}

async fn fetch_contact(conn: &mut SqliteConnection, id: Uuid) -> AppResult<Contact> {
    sqlx::query_as::<_, Contact>(&format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("contact not found"))
}
