use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::lifecycle::{self, authorize_company_delete, authorize_company_update, is_visible};
use crate::authz::{ops, Authorized, ConversionStatus, Denial};
use crate::errors::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::jwt::AuthUser;
use crate::models::company::{
    Company, CompanyCreateRequest, CompanyPatch, DbCompany, FinalizeResponse, COMPANY_COLUMNS,
};
use crate::models::MessageResponse;
use crate::notify::Outbox;
use crate::routes::{authorize, display_name, ensure_users_exist};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/companies",
    tag = "Companies",
    responses((status = 200, description = "Companies visible to the caller", body = [Company]))
)]
pub async fn list_companies(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Company>>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::READ)?;

    let rows = sqlx::query_as::<_, DbCompany>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies ORDER BY created_at DESC"
    ))
    .fetch_all(&state.pool)
    .await?;

    let mut companies = Vec::with_capacity(rows.len());
    for row in rows {
        let company: Company = row.try_into()?;
        if is_visible(&catalog, &actor, &company.state()) {
            companies.push(company);
        }
    }
    Ok(Json(companies))
}

#[utoipa::path(
    get,
    path = "/companies/finalized/list",
    tag = "Companies",
    responses((status = 200, description = "Finalized companies visible to the caller", body = [Company]))
)]
pub async fn list_finalized(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Company>>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::READ)?;

    let rows = sqlx::query_as::<_, DbCompany>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies WHERE finalization_status = 'Finalized' ORDER BY finalized_at DESC"
    ))
    .fetch_all(&state.pool)
    .await?;

    let mut companies = Vec::with_capacity(rows.len());
    for row in rows {
        let company: Company = row.try_into()?;
        if is_visible(&catalog, &actor, &company.state()) {
            companies.push(company);
        }
    }
    Ok(Json(companies))
}

/// Companies the caller may not see answer 404, same as missing ones.
#[utoipa::path(
    get,
    path = "/companies/{id}",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company", body = Company),
        (status = 404, description = "Company not found")
    )
)]
pub async fn get_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Company>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::READ)?;
    let mut conn = state.pool.acquire().await?;
    let company = fetch_company(&mut conn, id).await?;

    if !is_visible(&catalog, &actor, &company.state()) {
        return Err(AppError::not_found("company not found"));
    }
    Ok(Json(company))
}

#[utoipa::path(
    post,
    path = "/companies",
    tag = "Companies",
    request_body = CompanyCreateRequest,
    responses(
        (status = 201, description = "Company created", body = Company),
        (status = 403, description = "Role may not create companies"),
        (status = 409, description = "Finalized cannot be set directly")
    )
)]
pub async fn create_company(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<CompanyCreateRequest>,
) -> AppResult<(StatusCode, Json<Company>)> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::COMPANY_CREATE)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    let conversion_status = payload.conversion_status.unwrap_or(ConversionStatus::Waiting);
    if conversion_status == ConversionStatus::Finalized {
        return Err(Denial::invalid_transition("new companies cannot start finalized").into());
    }
    let custom_fields = payload
        .custom_fields
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|err| AppError::bad_request(format!("invalid customFields: {err}")))?;

    let mut tx = state.pool.begin().await?;
    ensure_users_exist(
        &mut tx,
        &[payload.assigned_data_collector_id, payload.assigned_converter_id],
    )
    .await?;

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO companies (id, name, website, phone, email, address, conversion_status, finalization_status, \
         assigned_data_collector_id, assigned_converter_id, custom_fields, version, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 'Pending', ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(&payload.website)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(&payload.address)
    .bind(conversion_status.as_str())
    .bind(payload.assigned_data_collector_id)
    .bind(payload.assigned_converter_id)
    .bind(custom_fields)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let company = fetch_company(&mut tx, id).await?;
    tx.commit().await?;
    tracing::info!(company_id = %id, actor_id = %actor.id, "company created");

    Ok((StatusCode::CREATED, Json(company)))
}

#[utoipa::path(
    put,
    path = "/companies/{id}",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    request_body = CompanyPatch,
    responses(
        (status = 200, description = "Company updated", body = Company),
        (status = 403, description = "Forbidden, not assigned, or restricted fields"),
        (status = 404, description = "Company not found"),
        (status = 409, description = "Invalid transition or concurrent update")
    )
)]
pub async fn update_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<Value>,
) -> AppResult<Json<Company>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::COMPANY_UPDATE)?;
    let patch = CompanyPatch::from_json(body)?;

    let mut tx = state.pool.begin().await?;
    let current = fetch_company(&mut tx, id).await?;
    let approved = authorize_company_update(&catalog, &actor, &current.state(), patch)?;
    store_update(&mut tx, &current, approved).await?;

    let company = fetch_company(&mut tx, id).await?;
    tx.commit().await?;
    tracing::debug!(company_id = %id, actor_id = %actor.id, version = company.version, "company updated");

    Ok(Json(company))
}

#[utoipa::path(
    delete,
    path = "/companies/{id}",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company deleted", body = MessageResponse),
        (status = 403, description = "Company is finalized or role may not delete"),
        (status = 404, description = "Company not found")
    )
)]
pub async fn delete_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::COMPANY_DELETE)?;

    let mut tx = state.pool.begin().await?;
    let current = fetch_company(&mut tx, id).await?;
    authorize_company_delete(&catalog, &actor, &current.state())?;

    let result = sqlx::query("DELETE FROM companies WHERE id = ? AND version = ?")
        .bind(id)
        .bind(current.version)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::conflict("company was modified concurrently"));
    }
    tx.commit().await?;
    tracing::info!(company_id = %id, actor_id = %actor.id, "company deleted");

    Ok(Json(MessageResponse::new("Company deleted successfully")))
}

#[utoipa::path(
    put,
    path = "/companies/{id}/finalize",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company finalized", body = FinalizeResponse),
        (status = 403, description = "Role may not finalize"),
        (status = 404, description = "Company not found"),
        (status = 409, description = "Not confirmed yet, or already finalized")
    )
)]
pub async fn finalize_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<FinalizeResponse>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::COMPANY_FINALIZE)?;

    let mut tx = state.pool.begin().await?;
    let current = fetch_company(&mut tx, id).await?;
    let stamp = lifecycle::finalize(&catalog, &actor, &current.state(), utc_now())?.into_inner();

    // The guard saw Pending/Confirmed; the row must still say so.
    let result = sqlx::query(
        "UPDATE companies SET finalization_status = 'Finalized', finalized_by_id = ?, finalized_at = ?, \
         version = version + 1, updated_at = ? \
         WHERE id = ? AND finalization_status = 'Pending' AND conversion_status = 'Confirmed'",
    )
    .bind(stamp.finalized_by)
    .bind(stamp.finalized_at)
    .bind(stamp.finalized_at)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::conflict("company was modified concurrently"));
    }

    let actor_name = display_name(&mut tx, actor.id).await?;
    let mut outbox = Outbox::from_actor(actor.id, actor_name);
    outbox.company_finalized(
        &current.name,
        current.assigned_data_collector_id,
        current.assigned_converter_id,
    );
    outbox.flush(&mut tx).await?;

    let company = fetch_company(&mut tx, id).await?;
    tx.commit().await?;
    tracing::info!(company_id = %id, actor_id = %actor.id, "company finalized");

    Ok(Json(FinalizeResponse {
        message: "Company data finalized successfully".to_string(),
        company,
    }))
}

pub(crate) async fn fetch_company(conn: &mut SqliteConnection, id: Uuid) -> AppResult<Company> {
    sqlx::query_as::<_, DbCompany>(&format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("company not found"))?
        .try_into()
}

/// Write an approved patch, guarded by the version the decision was made on.
async fn store_update(
    conn: &mut SqliteConnection,
    current: &Company,
    approved: Authorized<CompanyPatch>,
) -> AppResult<()> {
    let patch = approved.into_inner();
    let values = patch.apply(current)?;
    if patch.has("assigned_data_collector_id") || patch.has("assigned_converter_id") {
        ensure_users_exist(
            conn,
            &[values.assigned_data_collector_id, values.assigned_converter_id],
        )
        .await?;
    }
    let custom_fields = values
        .custom_fields
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|err| AppError::bad_request(format!("invalid customFields: {err}")))?;

    let result = sqlx::query(
        "UPDATE companies SET name = ?, website = ?, phone = ?, email = ?, address = ?, conversion_status = ?, \
         custom_fields = ?, assigned_data_collector_id = ?, assigned_converter_id = ?, \
         version = version + 1, updated_at = ? \
         WHERE id = ? AND version = ?",
    )
    .bind(&values.name)
    .bind(&values.website)
    .bind(&values.phone)
    .bind(&values.email)
    .bind(&values.address)
    .bind(values.conversion_status.as_str())
    .bind(custom_fields)
    .bind(values.assigned_data_collector_id)
    .bind(values.assigned_converter_id)
    .bind(utc_now())
    .bind(current.id)
    .bind(current.version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::conflict("company was modified concurrently"));
    }
    Ok(())
}
