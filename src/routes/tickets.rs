use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::guard::authorize_assigned_update;
use crate::authz::ops;
use crate::errors::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::jwt::AuthUser;
use crate::models::ticket::{Ticket, TicketCreateRequest, TicketUpdateRequest, TICKET_COLUMNS};
use crate::models::MessageResponse;
use crate::notify::Outbox;
use crate::routes::{authorize, company_name, display_name, ensure_company_exists, ensure_users_exist};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/tickets",
    tag = "Tickets",
    responses((status = 200, description = "All tickets", body = [Ticket]))
)]
pub async fn list_tickets(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Ticket>>> {
    authorize(&state, &auth, &ops::READ)?;
    let tickets = sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at DESC"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(tickets))
}

#[utoipa::path(
    get,
    path = "/tickets/{id}",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket", body = Ticket),
        (status = 404, description = "Ticket not found")
    )
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Ticket>> {
    authorize(&state, &auth, &ops::READ)?;
    let mut conn = state.pool.acquire().await?;
    Ok(Json(fetch_ticket(&mut conn, id).await?))
}

/// Any recognized role may raise a ticket, read-only roles included.
#[utoipa::path(
    post,
    path = "/tickets",
    tag = "Tickets",
    request_body = TicketCreateRequest,
    responses((status = 201, description = "Ticket raised", body = Ticket))
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<TicketCreateRequest>,
) -> AppResult<(StatusCode, Json<Ticket>)> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::TICKET_CREATE)?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title is required"));
    }

    let mut tx = state.pool.begin().await?;
    ensure_users_exist(&mut tx, &[payload.assigned_to_id]).await?;
    ensure_company_exists(&mut tx, payload.company_id).await?;

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO tickets (id, title, description, company_id, raised_by_id, assigned_to_id, is_resolved, \
         version, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, 0, 1, ?, ?)",
    )
    .bind(id)
    .bind(title)
    .bind(&payload.description)
    .bind(payload.company_id)
    .bind(actor.id)
    .bind(payload.assigned_to_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let actor_name = display_name(&mut tx, actor.id).await?;
    let company = company_name(&mut tx, payload.company_id).await?;
    let mut outbox = Outbox::from_actor(actor.id, actor_name);
    outbox.ticket_raised(payload.assigned_to_id, title, company.as_deref());
    outbox.flush(&mut tx).await?;

    let ticket = fetch_ticket(&mut tx, id).await?;
    tx.commit().await?;
    tracing::info!(ticket_id = %id, actor_id = %actor.id, "ticket raised");

    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    put,
    path = "/tickets/{id}",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = TicketUpdateRequest,
    responses(
        (status = 200, description = "Ticket updated", body = Ticket),
        (status = 403, description = "Forbidden, not assigned, or reassignment not allowed"),
        (status = 404, description = "Ticket not found"),
        (status = 409, description = "Concurrent update")
    )
)]
pub async fn update_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<TicketUpdateRequest>,
) -> AppResult<Json<Ticket>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::TICKET_UPDATE)?;

    let mut tx = state.pool.begin().await?;
    let current = fetch_ticket(&mut tx, id).await?;
    let requested_assignee = payload.assigned_to_id;
    let patch = authorize_assigned_update(&catalog, &actor, current.assigned_to_id, requested_assignee, payload)?
        .into_inner();

    let title = match patch.title.as_deref().map(str::trim) {
        Some("") => return Err(AppError::bad_request("title cannot be empty")),
        Some(title) => title.to_string(),
        None => current.title.clone(),
    };
    let assigned_to_id = patch.assigned_to_id.unwrap_or(current.assigned_to_id);
    let description = patch.description.clone().unwrap_or_else(|| current.description.clone());
    if patch.assigned_to_id.is_some() {
        ensure_users_exist(&mut tx, &[assigned_to_id]).await?;
    }
    let is_resolved = patch.is_resolved.unwrap_or(current.is_resolved);
    let resolved_at = match (current.is_resolved, is_resolved) {
        (false, true) => Some(utc_now()),
        (_, false) => None,
        (true, true) => current.resolved_at,
    };

    let result = sqlx::query(
        "UPDATE tickets SET title = ?, description = ?, assigned_to_id = ?, is_resolved = ?, resolved_at = ?, \
         version = version + 1, updated_at = ? WHERE id = ? AND version = ?",
    )
    .bind(&title)
    .bind(description)
    .bind(assigned_to_id)
    .bind(is_resolved)
    .bind(resolved_at)
    .bind(utc_now())
    .bind(id)
    .bind(current.version)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::conflict("ticket was modified concurrently"));
    }

    let actor_name = display_name(&mut tx, actor.id).await?;
    let mut outbox = Outbox::from_actor(actor.id, actor_name);
    outbox.ticket_reassigned(current.assigned_to_id, assigned_to_id, &title);
    if is_resolved && !current.is_resolved {
        outbox.ticket_resolved(current.raised_by_id, &title);
    }
    outbox.flush(&mut tx).await?;

    let ticket = fetch_ticket(&mut tx, id).await?;
    tx.commit().await?;
    tracing::debug!(ticket_id = %id, actor_id = %actor.id, resolved = is_resolved, "ticket updated");

    Ok(Json(ticket))
}

#[utoipa::path(
    delete,
    path = "/tickets/{id}",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket deleted", body = MessageResponse),
        (status = 403, description = "Role may not delete tickets"),
        (status = 404, description = "Ticket not found")
    )
)]
pub async fn delete_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::TICKET_DELETE)?;

    let result = sqlx::query("DELETE FROM tickets WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("ticket not found"));
    }
    tracing::info!(ticket_id = %id, actor_id = %actor.id, "ticket deleted");

    Ok(Json(MessageResponse::new("Ticket deleted successfully")))
}

async fn fetch_ticket(conn: &mut SqliteConnection, id: Uuid) -> AppResult<Ticket> {
    sqlx::query_as::<_, Ticket>(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("ticket not found"))
}
