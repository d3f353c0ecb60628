use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{ops, Role, RoleGroup};
use crate::errors::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::jwt::AuthUser;
use crate::models::user::{DbUser, User, UserSummary, UserUpdateRequest};
use crate::models::MessageResponse;
use crate::routes::auth::{ensure_email_available, fetch_user_by_id, USER_COLUMNS};
use crate::routes::authorize;
use crate::utils::{hash_password, utc_now};

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Role may not manage users")
    )
)]
pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<User>>> {
    authorize(&state, &auth, &ops::USER_LIST)?;
    let rows = sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"))
        .fetch_all(&state.pool)
        .await?;
    let users = rows.into_iter().map(User::try_from).collect::<AppResult<Vec<_>>>()?;
    Ok(Json(users))
}

/// Names and emails only, for assignee pickers.
#[utoipa::path(
    get,
    path = "/users/list",
    tag = "Users",
    responses((status = 200, description = "User directory", body = [UserSummary]))
)]
pub async fn directory(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<UserSummary>>> {
    authorize(&state, &auth, &ops::READ)?;
    let users = sqlx::query_as::<_, UserSummary>("SELECT id, full_name, email FROM users ORDER BY full_name ASC")
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> AppResult<Json<User>> {
    authorize(&state, &auth, &ops::READ)?;
    let user: User = fetch_user_by_id(&state.pool, id).await?.try_into()?;
    Ok(Json(user))
}

/// Only administrators may touch an Admin account or grant the Admin role.
/// A role change takes effect at the user's next login.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Role may not manage this user"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    let (catalog, actor) = authorize(&state, &auth, &ops::USER_UPDATE)?;
    let current: User = fetch_user_by_id(&state.pool, id).await?.try_into()?;

    let touches_admin = current.role == Role::Admin || payload.role == Some(Role::Admin);
    if touches_admin && !catalog.is_in_group(actor.role, RoleGroup::Administrators) {
        return Err(AppError::forbidden("only administrators may manage Admin accounts"));
    }

    let full_name = match payload.full_name.as_deref().map(str::trim) {
        Some("") => return Err(AppError::bad_request("full_name cannot be empty")),
        Some(name) => name.to_string(),
        None => current.full_name.clone(),
    };
    let email = match payload.email.as_deref().map(|e| e.trim().to_lowercase()) {
        Some(email) if email.is_empty() => return Err(AppError::bad_request("email cannot be empty")),
        Some(email) if email != current.email => {
            ensure_email_available(&state.pool, &email).await?;
            email
        }
        _ => current.email.clone(),
    };
    let role = payload.role.unwrap_or(current.role);
    let password_hash = payload.password.as_deref().map(hash_password).transpose()?;

    sqlx::query(
        "UPDATE users SET full_name = ?, email = ?, role = ?, \
         password_hash = COALESCE(?, password_hash), updated_at = ? WHERE id = ?",
    )
    .bind(&full_name)
    .bind(&email)
    .bind(role.as_str())
    .bind(password_hash)
    .bind(utc_now())
    .bind(id)
    .execute(&state.pool)
    .await?;

    if role != current.role {
        tracing::info!(user_id = %id, actor_id = %actor.id, from = %current.role, to = %role, "user role changed");
    }

    let user: User = fetch_user_by_id(&state.pool, id).await?.try_into()?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Cannot delete yourself"),
        (status = 403, description = "Only administrators delete users"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User has finalized companies")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let (_catalog, actor) = authorize(&state, &auth, &ops::USER_DELETE)?;
    if actor.is(id) {
        return Err(AppError::bad_request("you cannot delete your own account"));
    }

    let result = match sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await
    {
        Ok(result) => result,
        // Finalization stamps keep their author.
        Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => {
            return Err(AppError::conflict("user has finalized companies and cannot be deleted"));
        }
        Err(err) => return Err(err.into()),
    };
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("user not found"));
    }
    tracing::info!(user_id = %id, actor_id = %actor.id, "user deleted");

    Ok(Json(MessageResponse::new("User deleted successfully")))
}
