use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::ops;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::notification::Notification;
use crate::models::MessageResponse;
use crate::routes::authorize;

const NOTIFICATION_LIMIT: i64 = 50;

/// The caller's latest notifications. Nobody reads anyone else's inbox.
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    responses((status = 200, description = "Caller's notifications, newest first", body = [Notification]))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Notification>>> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::READ)?;
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT id, user_id, message, is_read, created_at FROM notifications \
         WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(actor.id)
    .bind(NOTIFICATION_LIMIT)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read", body = MessageResponse),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::NOTIFICATION_UPDATE)?;
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(actor.id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("notification not found"));
    }
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

#[utoipa::path(
    put,
    path = "/notifications/mark-all-read",
    tag = "Notifications",
    responses((status = 200, description = "All marked as read", body = MessageResponse))
)]
pub async fn mark_all_read(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<MessageResponse>> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::NOTIFICATION_UPDATE)?;
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
        .bind(actor.id)
        .execute(&state.pool)
        .await?;
    tracing::debug!(user_id = %actor.id, count = result.rows_affected(), "notifications marked read");
    Ok(Json(MessageResponse::new("All notifications marked as read")))
}

#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification deleted", body = MessageResponse),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::NOTIFICATION_DELETE)?;
    let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(actor.id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("notification not found"));
    }
    Ok(Json(MessageResponse::new("Notification deleted")))
}
