use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::guard::authorize_comment_change;
use crate::authz::lifecycle::is_visible;
use crate::authz::ops;
use crate::errors::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::jwt::AuthUser;
use crate::models::comment::{Comment, CommentCreateRequest, CommentUpdateRequest, COMMENT_SELECT};
use crate::models::MessageResponse;
use crate::routes::authorize;
use crate::routes::companies::fetch_company;
use crate::utils::utc_now;

/// Discussion on a company, oldest first. Follows the company's visibility.
#[utoipa::path(
    get,
    path = "/comments/company/{company_id}",
    tag = "Comments",
    params(("company_id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Comments on the company", body = [Comment]),
        (status = 404, description = "Company not found")
    )
)]
pub async fn list_company_comments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<Vec<Comment>>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::READ)?;
    let mut conn = state.pool.acquire().await?;

    let company = fetch_company(&mut conn, company_id).await?;
    if !is_visible(&catalog, &actor, &company.state()) {
        return Err(AppError::not_found("company not found"));
    }

    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_SELECT} WHERE c.company_id = ? ORDER BY c.created_at ASC"
    ))
    .bind(company_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(Json(comments))
}

#[utoipa::path(
    post,
    path = "/comments",
    tag = "Comments",
    request_body = CommentCreateRequest,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 403, description = "Role may not comment"),
        (status = 404, description = "Company not found")
    )
)]
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let (catalog, actor) = authorize(&state, &auth, &ops::COMMENT_CREATE)?;
    let content = validated_content(&payload.content)?;

    let mut conn = state.pool.acquire().await?;
    let company = fetch_company(&mut conn, payload.company_id).await?;
    if !is_visible(&catalog, &actor, &company.state()) {
        return Err(AppError::not_found("company not found"));
    }
    if let Some(parent_id) = payload.parent_comment_id {
        let parent = fetch_comment(&mut conn, parent_id).await?;
        if parent.company_id != payload.company_id {
            return Err(AppError::bad_request("parent comment belongs to another company"));
        }
    }

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO comments (id, company_id, user_id, content, parent_comment_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(payload.company_id)
    .bind(actor.id)
    .bind(content)
    .bind(payload.parent_comment_id)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok((StatusCode::CREATED, Json(fetch_comment(&mut conn, id).await?)))
}

#[utoipa::path(
    put,
    path = "/comments/{id}",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Comment id")),
    request_body = CommentUpdateRequest,
    responses(
        (status = 200, description = "Comment edited", body = Comment),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<CommentUpdateRequest>,
) -> AppResult<Json<Comment>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::COMMENT_UPDATE)?;
    let content = validated_content(&payload.content)?;

    let mut conn = state.pool.acquire().await?;
    let current = fetch_comment(&mut conn, id).await?;
    authorize_comment_change(&catalog, &actor, current.user_id)?;

    sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
        .bind(content)
        .bind(utc_now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(Json(fetch_comment(&mut conn, id).await?))
}

/// Replies go with their parent.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted", body = MessageResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::COMMENT_DELETE)?;

    let mut conn = state.pool.acquire().await?;
    let current = fetch_comment(&mut conn, id).await?;
    authorize_comment_change(&catalog, &actor, current.user_id)?;

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}

fn validated_content(content: &str) -> AppResult<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("content is required"));
    }
    Ok(content)
}

async fn fetch_comment(conn: &mut SqliteConnection, id: Uuid) -> AppResult<Comment> {
    sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("comment not found"))
}
