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
use crate::models::task::{DbTask, Task, TaskCreateRequest, TaskStatus, TaskUpdateRequest, TASK_COLUMNS};
use crate::models::MessageResponse;
use crate::notify::Outbox;
use crate::routes::{authorize, display_name, ensure_company_exists, ensure_users_exist};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "Tasks",
    responses((status = 200, description = "All tasks", body = [Task]))
)]
pub async fn list_tasks(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Task>>> {
    authorize(&state, &auth, &ops::READ)?;

    let rows = sqlx::query_as::<_, DbTask>(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC"))
        .fetch_all(&state.pool)
        .await?;
    let tasks = rows.into_iter().map(Task::try_from).collect::<AppResult<Vec<_>>>()?;
    Ok(Json(tasks))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task", body = Task),
        (status = 404, description = "Task not found")
    )
)]
pub async fn get_task(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> AppResult<Json<Task>> {
    authorize(&state, &auth, &ops::READ)?;
    let mut conn = state.pool.acquire().await?;
    Ok(Json(fetch_task(&mut conn, id).await?))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "Tasks",
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 403, description = "Role may not assign tasks")
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::TASK_CREATE)?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title is required"));
    }

    let mut tx = state.pool.begin().await?;
    ensure_users_exist(&mut tx, &[payload.assigned_to_id]).await?;
    ensure_company_exists(&mut tx, payload.company_id).await?;

    let id = Uuid::new_v4();
    let now = utc_now();
    let status = payload.status.unwrap_or(TaskStatus::NotYet);
    sqlx::query(
        "INSERT INTO tasks (id, title, description, status, deadline, company_id, assigned_to_id, assigned_by_id, \
         version, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(title)
    .bind(&payload.description)
    .bind(status.as_str())
    .bind(payload.deadline)
    .bind(payload.company_id)
    .bind(payload.assigned_to_id)
    .bind(actor.id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let actor_name = display_name(&mut tx, actor.id).await?;
    let mut outbox = Outbox::from_actor(actor.id, actor_name);
    outbox.task_assigned(payload.assigned_to_id, title);
    outbox.flush(&mut tx).await?;

    let task = fetch_task(&mut tx, id).await?;
    tx.commit().await?;
    tracing::info!(task_id = %id, actor_id = %actor.id, "task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Own-work roles may only touch tasks assigned to them and may not hand
/// them to someone else.
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 403, description = "Forbidden, not assigned, or reassignment not allowed"),
        (status = 404, description = "Task not found"),
        (status = 409, description = "Concurrent update")
    )
)]
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::TASK_UPDATE)?;

    let mut tx = state.pool.begin().await?;
    let current = fetch_task(&mut tx, id).await?;
    let requested_assignee = payload.assigned_to_id;
    let patch = authorize_assigned_update(&catalog, &actor, current.assigned_to_id, requested_assignee, payload)?
        .into_inner();

    let title = match patch.title.as_deref().map(str::trim) {
        Some("") => return Err(AppError::bad_request("title cannot be empty")),
        Some(title) => title.to_string(),
        None => current.title.clone(),
    };
    let assigned_to_id = patch.assigned_to_id.unwrap_or(current.assigned_to_id);
    let company_id = patch.company_id.unwrap_or(current.company_id);
    let description = patch.description.clone().unwrap_or_else(|| current.description.clone());
    let deadline = patch.deadline.unwrap_or(current.deadline);
    if patch.assigned_to_id.is_some() {
        ensure_users_exist(&mut tx, &[assigned_to_id]).await?;
    }
    if patch.company_id.is_some() {
        ensure_company_exists(&mut tx, company_id).await?;
    }

    let result = sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, status = ?, deadline = ?, company_id = ?, assigned_to_id = ?, \
         version = version + 1, updated_at = ? WHERE id = ? AND version = ?",
    )
    .bind(&title)
    .bind(description)
    .bind(patch.status.unwrap_or(current.status).as_str())
    .bind(deadline)
    .bind(company_id)
    .bind(assigned_to_id)
    .bind(utc_now())
    .bind(id)
    .bind(current.version)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::conflict("task was modified concurrently"));
    }

    let actor_name = display_name(&mut tx, actor.id).await?;
    let mut outbox = Outbox::from_actor(actor.id, actor_name);
    outbox.task_updated(current.assigned_to_id, assigned_to_id, &title);
    outbox.flush(&mut tx).await?;

    let task = fetch_task(&mut tx, id).await?;
    tx.commit().await?;
    tracing::debug!(task_id = %id, actor_id = %actor.id, version = task.version, "task updated");

    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 403, description = "Role may not delete tasks"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::TASK_DELETE)?;

    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("task not found"));
    }
    tracing::info!(task_id = %id, actor_id = %actor.id, "task deleted");

    Ok(Json(MessageResponse::new("Task deleted successfully")))
}

async fn fetch_task(conn: &mut SqliteConnection, id: Uuid) -> AppResult<Task> {
    sqlx::query_as::<_, DbTask>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("task not found"))?
        .try_into()
}
